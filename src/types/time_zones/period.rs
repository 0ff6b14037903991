/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use serde::Deserialize;
use time::Duration;

/// The id and name given to the single standard period of a zone without
/// daylight saving history. Per-year periods derive their ids from these,
/// e.g. `Standard/2008`.
pub(crate) const STANDARD_PERIOD_ID: &str = "Standard";
pub(crate) const STANDARD_PERIOD_NAME: &str = "Standard";
pub(crate) const DAYLIGHT_PERIOD_ID: &str = "Daylight";
pub(crate) const DAYLIGHT_PERIOD_NAME: &str = "Daylight";

/// A named UTC offset which applies during part of a zone's history.
///
/// The bias follows the EWS sign convention: it is the offset subtracted
/// from local time to obtain UTC, so a zone behind UTC has a positive bias.
/// This is the opposite sign of [`HostTimeZone::base_utc_offset`].
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/period>
///
/// [`HostTimeZone::base_utc_offset`]: crate::HostTimeZone::base_utc_offset
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct TimeZonePeriod {
    #[serde(rename = "@Id")]
    pub id: String,

    #[serde(rename = "@Name")]
    pub name: String,

    #[serde(
        rename = "@Bias",
        deserialize_with = "crate::types::xml_duration::deserialize"
    )]
    pub bias: Duration,
}

impl TimeZonePeriod {
    /// Creates the period carrying a zone's standard (non-daylight) offset.
    pub(crate) fn standard(bias: Duration) -> Self {
        TimeZonePeriod {
            id: STANDARD_PERIOD_ID.to_owned(),
            name: STANDARD_PERIOD_NAME.to_owned(),
            bias,
        }
    }

    /// Whether this period represents standard (non-daylight) time.
    pub fn is_standard_period(&self) -> bool {
        self.name.eq_ignore_ascii_case(STANDARD_PERIOD_NAME) || self.id == STANDARD_PERIOD_ID
    }

    pub(crate) fn write_xml<W: std::io::Write>(
        &self,
        writer: &mut quick_xml::Writer<W>,
    ) -> Result<(), crate::Error> {
        use quick_xml::events::{BytesStart, Event};

        let mut start = BytesStart::new("Period");
        start.push_attribute(("Bias", crate::types::xml_duration::format(self.bias).as_str()));
        start.push_attribute(("Name", self.name.as_str()));
        start.push_attribute(("Id", self.id.as_str()));
        writer.write_event(Event::Empty(start))?;
        Ok(())
    }
}

/// The list of periods belonging to a time zone definition.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/periods>
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct Periods {
    #[serde(default, rename = "Period")]
    pub inner: Vec<TimeZonePeriod>,
}

impl Periods {
    pub(crate) fn get(&self, id: &str) -> Option<&TimeZonePeriod> {
        self.inner.iter().find(|period| period.id == id)
    }

    /// Adds a period, replacing any existing period with the same id.
    pub(crate) fn register(&mut self, period: TimeZonePeriod) {
        match self.inner.iter_mut().find(|existing| existing.id == period.id) {
            Some(existing) => *existing = period,
            None => self.inner.push(period),
        }
    }
}
