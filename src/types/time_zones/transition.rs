/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::fmt;
use std::io::Write;

use quick_xml::{
    events::{BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use serde::{
    de::{EnumAccess, VariantAccess, Visitor},
    Deserialize, Deserializer,
};
use time::{Duration, Month, PrimitiveDateTime, Time, Weekday};

use crate::{types::xml_duration, Error, TransitionTime};

pub(crate) const TRANSITION_TAG: &str = "Transition";
pub(crate) const ABSOLUTE_DATE_TRANSITION_TAG: &str = "AbsoluteDateTransition";
pub(crate) const RECURRING_DAY_TRANSITION_TAG: &str = "RecurringDayTransition";
pub(crate) const RECURRING_DATE_TRANSITION_TAG: &str = "RecurringDateTransition";

/// An edge in a time zone definition's transition timeline, determining when
/// a new period or transition group takes effect.
///
/// Each variant corresponds to one EWS transition element.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/transitions>
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimeZoneTransition {
    /// `<Transition>`: fires unconditionally. Only valid as the first
    /// top-level transition of a definition or as the sole member of a
    /// transition group without daylight saving time.
    ///
    /// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/transition>
    Simple(SimpleTransition),

    /// `<AbsoluteDateTransition>`: fires on a specific date, bridging
    /// between transition groups across policy-change years.
    ///
    /// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/absolutedatetransition>
    AbsoluteDate(AbsoluteDateTransition),

    /// `<RecurringDateTransition>`: fires annually on a fixed calendar
    /// date.
    ///
    /// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/recurringdatetransition>
    AbsoluteDayOfMonth(AbsoluteDayOfMonthTransition),

    /// `<RecurringDayTransition>`: fires annually on the Nth occurrence of
    /// a weekday within a month.
    ///
    /// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/recurringdaytransition>
    RelativeDayOfMonth(RelativeDayOfMonthTransition),
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct SimpleTransition {
    pub to: TransitionTarget,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct AbsoluteDateTransition {
    pub to: TransitionTarget,

    #[serde(deserialize_with = "date_time::deserialize")]
    pub date_time: PrimitiveDateTime,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct AbsoluteDayOfMonthTransition {
    pub to: TransitionTarget,

    /// The time of day at which the transition fires, as an offset from
    /// midnight.
    #[serde(deserialize_with = "crate::types::xml_duration::deserialize")]
    pub time_offset: Duration,

    pub month: u8,

    pub day: u8,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct RelativeDayOfMonthTransition {
    pub to: TransitionTarget,

    /// The time of day at which the transition fires, as an offset from
    /// midnight.
    #[serde(deserialize_with = "crate::types::xml_duration::deserialize")]
    pub time_offset: Duration,

    pub month: u8,

    #[serde(deserialize_with = "day_of_week::deserialize")]
    pub day_of_week: Weekday,

    /// The occurrence of `day_of_week` within the month, 1 through 4, or
    /// `-1` for the last occurrence.
    pub occurrence: i8,
}

// The transition element names carry the type information, so
// deserialization dispatches on the tag by hand rather than deriving, and
// unrecognized tags fail with a descriptive message.
impl<'de> Deserialize<'de> for TimeZoneTransition {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TransitionVisitor;

        impl<'de> Visitor<'de> for TransitionVisitor {
            type Value = TimeZoneTransition;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an EWS time zone transition element")
            }

            fn visit_enum<A>(self, data: A) -> Result<Self::Value, A::Error>
            where
                A: EnumAccess<'de>,
            {
                let (tag, variant) = data.variant::<String>()?;
                match tag.as_str() {
                    TRANSITION_TAG => Ok(TimeZoneTransition::Simple(variant.newtype_variant()?)),
                    ABSOLUTE_DATE_TRANSITION_TAG => {
                        Ok(TimeZoneTransition::AbsoluteDate(variant.newtype_variant()?))
                    }
                    RECURRING_DATE_TRANSITION_TAG => Ok(TimeZoneTransition::AbsoluteDayOfMonth(
                        variant.newtype_variant()?,
                    )),
                    RECURRING_DAY_TRANSITION_TAG => Ok(TimeZoneTransition::RelativeDayOfMonth(
                        variant.newtype_variant()?,
                    )),
                    other => Err(serde::de::Error::custom(format_args!(
                        "unknown time zone transition type `{other}`"
                    ))),
                }
            }
        }

        deserializer.deserialize_enum(
            "TimeZoneTransition",
            &[
                TRANSITION_TAG,
                ABSOLUTE_DATE_TRANSITION_TAG,
                RECURRING_DATE_TRANSITION_TAG,
                RECURRING_DAY_TRANSITION_TAG,
            ],
            TransitionVisitor,
        )
    }
}

impl TimeZoneTransition {
    /// Builds the transition matching a host recurrence rule, targeting the
    /// given period: a fixed-date rule becomes a `RecurringDateTransition`,
    /// a floating-weekday rule a `RecurringDayTransition`.
    pub(crate) fn from_transition_time(
        target_period_id: &str,
        transition_time: &TransitionTime,
    ) -> Self {
        let to = TransitionTarget::period(target_period_id);

        match *transition_time {
            TransitionTime::Fixed {
                time_of_day,
                month,
                day,
            } => TimeZoneTransition::AbsoluteDayOfMonth(AbsoluteDayOfMonthTransition {
                to,
                time_offset: offset_from_time_of_day(time_of_day),
                month: u8::from(month),
                day,
            }),

            TransitionTime::Floating {
                time_of_day,
                month,
                week,
                day_of_week,
            } => TimeZoneTransition::RelativeDayOfMonth(RelativeDayOfMonthTransition {
                to,
                time_offset: offset_from_time_of_day(time_of_day),
                month: u8::from(month),
                day_of_week,
                occurrence: occurrence_from_week(week),
            }),
        }
    }

    /// Produces the host recurrence rule for this transition.
    ///
    /// Simple and absolute date transitions carry no annual recurrence, so
    /// requesting one is an [`Error::InvalidTimeZoneDefinition`].
    pub(crate) fn to_transition_time(&self) -> Result<TransitionTime, Error> {
        match self {
            TimeZoneTransition::AbsoluteDayOfMonth(transition) => Ok(TransitionTime::Fixed {
                time_of_day: time_of_day_from_offset(transition.time_offset)?,
                month: month_from_wire(transition.month)?,
                day: transition.day,
            }),

            TimeZoneTransition::RelativeDayOfMonth(transition) => Ok(TransitionTime::Floating {
                time_of_day: time_of_day_from_offset(transition.time_offset)?,
                month: month_from_wire(transition.month)?,
                week: week_from_occurrence(transition.occurrence)?,
                day_of_week: transition.day_of_week,
            }),

            TimeZoneTransition::Simple(_) | TimeZoneTransition::AbsoluteDate(_) => {
                Err(Error::InvalidTimeZoneDefinition(
                    "only recurring transitions describe an annual recurrence".to_owned(),
                ))
            }
        }
    }

    pub(crate) fn target(&self) -> &TransitionTarget {
        match self {
            TimeZoneTransition::Simple(transition) => &transition.to,
            TimeZoneTransition::AbsoluteDate(transition) => &transition.to,
            TimeZoneTransition::AbsoluteDayOfMonth(transition) => &transition.to,
            TimeZoneTransition::RelativeDayOfMonth(transition) => &transition.to,
        }
    }

    /// The date at which this transition fires, if it fires on a specific
    /// date.
    pub(crate) fn date_time(&self) -> Option<PrimitiveDateTime> {
        match self {
            TimeZoneTransition::AbsoluteDate(transition) => Some(transition.date_time),
            _ => None,
        }
    }

    pub(crate) fn is_simple(&self) -> bool {
        matches!(self, TimeZoneTransition::Simple(_))
    }

    pub(crate) fn simple_to_period(period_id: &str) -> Self {
        TimeZoneTransition::Simple(SimpleTransition {
            to: TransitionTarget::period(period_id),
        })
    }

    pub(crate) fn simple_to_group(group_id: &str) -> Self {
        TimeZoneTransition::Simple(SimpleTransition {
            to: TransitionTarget::group(group_id),
        })
    }

    pub(crate) fn absolute_date_to_group(group_id: &str, date_time: PrimitiveDateTime) -> Self {
        TimeZoneTransition::AbsoluteDate(AbsoluteDateTransition {
            to: TransitionTarget::group(group_id),
            date_time,
        })
    }

    pub(crate) fn write_xml<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), Error> {
        match self {
            TimeZoneTransition::Simple(transition) => {
                writer.write_event(Event::Start(BytesStart::new(TRANSITION_TAG)))?;
                transition.to.write_xml(writer)?;
                writer.write_event(Event::End(BytesEnd::new(TRANSITION_TAG)))?;
            }

            TimeZoneTransition::AbsoluteDate(transition) => {
                writer.write_event(Event::Start(BytesStart::new(ABSOLUTE_DATE_TRANSITION_TAG)))?;
                transition.to.write_xml(writer)?;
                write_text_element(writer, "DateTime", &date_time::format(transition.date_time)?)?;
                writer.write_event(Event::End(BytesEnd::new(ABSOLUTE_DATE_TRANSITION_TAG)))?;
            }

            TimeZoneTransition::AbsoluteDayOfMonth(transition) => {
                writer.write_event(Event::Start(BytesStart::new(RECURRING_DATE_TRANSITION_TAG)))?;
                transition.to.write_xml(writer)?;
                write_text_element(
                    writer,
                    "TimeOffset",
                    &xml_duration::format(transition.time_offset),
                )?;
                write_text_element(writer, "Month", &transition.month.to_string())?;
                write_text_element(writer, "Day", &transition.day.to_string())?;
                writer.write_event(Event::End(BytesEnd::new(RECURRING_DATE_TRANSITION_TAG)))?;
            }

            TimeZoneTransition::RelativeDayOfMonth(transition) => {
                writer.write_event(Event::Start(BytesStart::new(RECURRING_DAY_TRANSITION_TAG)))?;
                transition.to.write_xml(writer)?;
                write_text_element(
                    writer,
                    "TimeOffset",
                    &xml_duration::format(transition.time_offset),
                )?;
                write_text_element(writer, "Month", &transition.month.to_string())?;
                // `Weekday` displays as the full English name EWS expects.
                write_text_element(writer, "DayOfWeek", &transition.day_of_week.to_string())?;
                write_text_element(writer, "Occurrence", &transition.occurrence.to_string())?;
                writer.write_event(Event::End(BytesEnd::new(RECURRING_DAY_TRANSITION_TAG)))?;
            }
        }

        Ok(())
    }
}

/// The period or transition group a transition switches to.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/to>
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct TransitionTarget {
    #[serde(rename = "@Kind")]
    pub kind: TransitionTargetKind,

    /// The id of the targeted period or group, resolved against the owning
    /// definition's collections during validation and conversion.
    #[serde(rename = "$text")]
    pub id: String,
}

impl TransitionTarget {
    pub fn period(id: impl Into<String>) -> Self {
        TransitionTarget {
            kind: TransitionTargetKind::Period,
            id: id.into(),
        }
    }

    pub fn group(id: impl Into<String>) -> Self {
        TransitionTarget {
            kind: TransitionTargetKind::Group,
            id: id.into(),
        }
    }

    fn write_xml<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), Error> {
        let mut start = BytesStart::new("To");
        start.push_attribute(("Kind", self.kind.as_str()));
        writer.write_event(Event::Start(start))?;
        writer.write_event(Event::Text(BytesText::new(&self.id)))?;
        writer.write_event(Event::End(BytesEnd::new("To")))?;
        Ok(())
    }
}

/// The kind of element a [`TransitionTarget`] references.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionTargetKind {
    Period,
    Group,
}

impl TransitionTargetKind {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            TransitionTargetKind::Period => "Period",
            TransitionTargetKind::Group => "Group",
        }
    }
}

impl<'de> Deserialize<'de> for TransitionTargetKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        match value.as_str() {
            "Period" => Ok(TransitionTargetKind::Period),
            "Group" => Ok(TransitionTargetKind::Group),
            _ => Err(serde::de::Error::custom(format_args!(
                "unsupported time zone transition target `{value}`"
            ))),
        }
    }
}

/// The chronological list of a definition's top-level transitions.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/transitions>
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct Transitions {
    #[serde(default, rename = "$value")]
    pub inner: Vec<TimeZoneTransition>,
}

pub(crate) fn write_text_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<(), Error> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn month_from_wire(month: u8) -> Result<Month, Error> {
    Month::try_from(month).map_err(|_| {
        Error::InvalidTimeZoneDefinition(format!("invalid month `{month}` in transition"))
    })
}

fn week_from_occurrence(occurrence: i8) -> Result<u8, Error> {
    match occurrence {
        -1 => Ok(5),
        1..=4 => Ok(occurrence as u8),
        _ => Err(Error::InvalidTimeZoneDefinition(format!(
            "invalid occurrence `{occurrence}` in transition"
        ))),
    }
}

fn occurrence_from_week(week: u8) -> i8 {
    if week == 5 {
        -1
    } else {
        week as i8
    }
}

fn time_of_day_from_offset(offset: Duration) -> Result<Time, Error> {
    let seconds = offset.whole_seconds();
    if !(0..86_400).contains(&seconds) {
        return Err(Error::InvalidTimeZoneDefinition(format!(
            "transition time offset `{offset}` is not a time of day"
        )));
    }

    Time::from_hms(
        (seconds / 3_600) as u8,
        ((seconds % 3_600) / 60) as u8,
        (seconds % 60) as u8,
    )
    .map_err(|_| {
        Error::InvalidTimeZoneDefinition(format!(
            "transition time offset `{offset}` is not a time of day"
        ))
    })
}

fn offset_from_time_of_day(time_of_day: Time) -> Duration {
    Duration::hours(i64::from(time_of_day.hour()))
        + Duration::minutes(i64::from(time_of_day.minute()))
        + Duration::seconds(i64::from(time_of_day.second()))
}

pub(crate) mod date_time {
    use serde::{Deserialize, Deserializer};
    use time::{macros::format_description, PrimitiveDateTime};

    pub(crate) fn parse(value: &str) -> Result<PrimitiveDateTime, time::error::Parse> {
        let format = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
        // Transition dates are local date/times, but Exchange has been seen
        // suffixing them with `Z`.
        PrimitiveDateTime::parse(value.trim_end_matches('Z'), format)
    }

    pub(crate) fn format(value: PrimitiveDateTime) -> Result<String, time::error::Format> {
        let format = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
        value.format(format)
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<PrimitiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        parse(&value).map_err(serde::de::Error::custom)
    }
}

pub(crate) mod day_of_week {
    use serde::{Deserialize, Deserializer};
    use time::Weekday;

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Weekday, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        match value.as_str() {
            "Monday" => Ok(Weekday::Monday),
            "Tuesday" => Ok(Weekday::Tuesday),
            "Wednesday" => Ok(Weekday::Wednesday),
            "Thursday" => Ok(Weekday::Thursday),
            "Friday" => Ok(Weekday::Friday),
            "Saturday" => Ok(Weekday::Saturday),
            "Sunday" => Ok(Weekday::Sunday),
            _ => Err(serde::de::Error::custom(format_args!(
                "unknown day of week `{value}`"
            ))),
        }
    }
}
