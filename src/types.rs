/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

mod host;
mod server_version;
mod time_zones;
pub(crate) mod xml_duration;

pub use host::*;
pub use server_version::*;
pub use time_zones::*;
