/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use thiserror::Error;

pub mod diagnostics;
mod types;

pub use diagnostics::{DiagnosticEvent, DiagnosticSink, DiscardDiagnostics};
pub use types::*;

#[cfg(test)]
pub(crate) mod test_utils;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to deserialize structure from XML")]
    Deserialize(#[from] serde_path_to_error::Error<quick_xml::DeError>),

    #[error("failed to write XML data")]
    Io(#[from] std::io::Error),

    #[error("failed to format date/time value for XML")]
    TimeFormat(#[from] time::error::Format),

    #[error("invalid XML duration `{0}`")]
    InvalidXmlDuration(String),

    #[error("invalid or unsupported time zone definition: {0}")]
    InvalidTimeZoneDefinition(String),

    #[error("unknown server version `{0}`")]
    UnknownServerVersion(String),
}
