/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

mod definition;
mod period;
mod transition;
mod transition_group;

pub use definition::*;
pub use period::*;
pub use transition::*;
pub use transition_group::*;
