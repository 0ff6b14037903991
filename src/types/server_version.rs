/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use serde::Deserialize;

use crate::Error;

/// The Exchange Server version identifiers allowed in `RequestServerVersion`
/// headers.
///
/// Variants are declared in chronological order, so comparisons can be used
/// to gate elements which only newer servers understand.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/requestserverversion#version-attribute-values>
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
pub enum ExchangeServerVersion {
    Exchange2007,
    Exchange2007_SP1,
    Exchange2010,
    Exchange2010_SP1,
    Exchange2010_SP2,
    Exchange2013,
    Exchange2013_SP1,
}

/// Parses the provided string into a known version identifier.
impl TryFrom<&str> for ExchangeServerVersion {
    /// If the provided string could not be turned into a known version
    /// identifier, [`Error::UnknownServerVersion`] is returned.
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "Exchange2007" => Ok(ExchangeServerVersion::Exchange2007),
            "Exchange2007_SP1" => Ok(ExchangeServerVersion::Exchange2007_SP1),
            "Exchange2010" => Ok(ExchangeServerVersion::Exchange2010),
            "Exchange2010_SP1" => Ok(ExchangeServerVersion::Exchange2010_SP1),
            "Exchange2010_SP2" => Ok(ExchangeServerVersion::Exchange2010_SP2),
            "Exchange2013" => Ok(ExchangeServerVersion::Exchange2013),
            "Exchange2013_SP1" => Ok(ExchangeServerVersion::Exchange2013_SP1),

            _ => Err(Error::UnknownServerVersion(value.to_owned())),
        }
    }
}

// Consumers can require this to persist the version associated with a given
// server.
impl From<ExchangeServerVersion> for String {
    fn from(value: ExchangeServerVersion) -> Self {
        match value {
            ExchangeServerVersion::Exchange2007 => "Exchange2007",
            ExchangeServerVersion::Exchange2007_SP1 => "Exchange2007_SP1",
            ExchangeServerVersion::Exchange2010 => "Exchange2010",
            ExchangeServerVersion::Exchange2010_SP1 => "Exchange2010_SP1",
            ExchangeServerVersion::Exchange2010_SP2 => "Exchange2010_SP2",
            ExchangeServerVersion::Exchange2013 => "Exchange2013",
            ExchangeServerVersion::Exchange2013_SP1 => "Exchange2013_SP1",
        }
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::ExchangeServerVersion;

    #[test]
    fn versions_are_ordered_chronologically() {
        assert!(
            ExchangeServerVersion::Exchange2007 < ExchangeServerVersion::Exchange2007_SP1,
            "SP1 should be newer than the base 2007 release"
        );
        assert!(
            ExchangeServerVersion::Exchange2010_SP2 < ExchangeServerVersion::Exchange2013,
            "2013 should be newer than any 2010 service pack"
        );
    }

    #[test]
    fn version_string_round_trip() {
        let version = ExchangeServerVersion::try_from("Exchange2010_SP1")
            .expect("known version string should parse");
        assert_eq!(version, ExchangeServerVersion::Exchange2010_SP1);
        assert_eq!(String::from(version), "Exchange2010_SP1");

        ExchangeServerVersion::try_from("Exchange2003")
            .expect_err("unknown version string should be rejected");
    }
}
