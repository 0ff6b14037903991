/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! The host platform's representation of a time zone.
//!
//! EWS time zone definitions are converted to and from this model, which
//! mirrors the daylight saving time model common to host platforms: a base
//! UTC offset plus a set of date-bounded adjustment rules, each with
//! recurring (or fixed-date) rules for entering and leaving daylight time.
//!
//! Offsets here follow the host convention (`UTC = local - offset`), which
//! is the opposite sign of the EWS bias convention. The conversions in
//! [`TimeZoneDefinition`] negate when crossing that boundary.
//!
//! [`TimeZoneDefinition`]: crate::TimeZoneDefinition

use time::{Date, Duration, Month, Time, Weekday};

/// A time zone in the host platform's representation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostTimeZone {
    /// A stable identifier for the zone, e.g. `Eastern Standard Time`.
    pub id: String,

    /// The zone's general display name.
    pub display_name: String,

    /// The display name of the zone's standard time, e.g.
    /// `Eastern Standard Time`.
    pub standard_display_name: String,

    /// The display name of the zone's daylight time, if the zone has ever
    /// observed daylight saving time.
    pub daylight_display_name: Option<String>,

    /// The offset added to UTC to obtain standard local time.
    pub base_utc_offset: Duration,

    /// The zone's daylight saving history, ordered chronologically by
    /// effective date range.
    pub adjustment_rules: Vec<AdjustmentRule>,
}

/// One interval of a zone's daylight saving history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdjustmentRule {
    /// The first date on which this rule applies.
    pub date_start: Date,

    /// The last date on which this rule applies.
    pub date_end: Date,

    /// The offset added to the base UTC offset while daylight time is in
    /// effect. Zero when the rule describes an interval without daylight
    /// saving time.
    pub daylight_delta: Duration,

    /// When daylight time begins each year within this rule's date range.
    pub daylight_transition_start: TransitionTime,

    /// When daylight time ends each year within this rule's date range.
    pub daylight_transition_end: TransitionTime,
}

/// An annually recurring moment at which a zone changes between standard
/// and daylight time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionTime {
    /// A fixed calendar date, e.g. April 1.
    Fixed {
        time_of_day: Time,
        month: Month,
        day: u8,
    },

    /// The Nth occurrence of a weekday within a month, e.g. the second
    /// Sunday of March. A week of `5` means the last occurrence.
    Floating {
        time_of_day: Time,
        month: Month,
        /// 1 through 5, where 5 designates the last occurrence of
        /// `day_of_week` in the month.
        week: u8,
        day_of_week: Weekday,
    },
}
