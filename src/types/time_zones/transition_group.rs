/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::io::Write;

use quick_xml::{
    events::{BytesEnd, BytesStart, Event},
    Writer,
};
use serde::Deserialize;
use time::{Date, Duration};

use crate::{
    types::time_zones::period::{
        DAYLIGHT_PERIOD_ID, DAYLIGHT_PERIOD_NAME, STANDARD_PERIOD_ID,
    },
    AdjustmentRule, Error, Periods, TimeZonePeriod, TimeZoneTransition, TransitionTargetKind,
};

/// A bundle of one or two transitions describing the daylight saving policy
/// in effect during one interval of a zone's history: either a single
/// unconditional transition to a standard period (no daylight saving time),
/// or a recurring enter-daylight/enter-standard pair.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/transitionsgroup>
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct TimeZoneTransitionGroup {
    #[serde(rename = "@Id")]
    pub id: String,

    #[serde(default, rename = "$value")]
    pub transitions: Vec<TimeZoneTransition>,
}

/// The values needed to build a host time zone from a definition: the base
/// offset and display names of whichever policy currently applies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct CustomTimeZoneCreateParams {
    /// The offset added to UTC to obtain standard local time. This is the
    /// negated standard period bias, converting from the EWS sign
    /// convention to the host's.
    pub(crate) base_offset_to_utc: Duration,

    pub(crate) standard_display_name: String,

    /// Absent when the group has no transition to a daylight period.
    pub(crate) daylight_display_name: Option<String>,
}

/// A group's transitions, classified by the flavor of their target periods.
pub(crate) struct ResolvedTransitions<'a> {
    pub(crate) standard: (&'a TimeZoneTransition, &'a TimeZonePeriod),
    pub(crate) daylight: Option<(&'a TimeZoneTransition, &'a TimeZonePeriod)>,
}

impl TimeZoneTransitionGroup {
    pub(crate) fn with_id(id: String) -> Self {
        TimeZoneTransitionGroup {
            id,
            transitions: Vec::new(),
        }
    }

    /// Whether the interval covered by this group observes daylight saving
    /// time.
    pub fn supports_daylight(&self) -> bool {
        self.transitions.len() == 2
    }

    /// Populates this group from one interval of a host zone's daylight
    /// saving history, registering the per-year periods it references.
    ///
    /// A rule without a daylight delta produces a single unconditional
    /// transition to a per-year standard period. Otherwise the group gets
    /// an enter-daylight transition followed by an enter-standard one, with
    /// the daylight period's bias derived from the standard bias and the
    /// rule's delta.
    pub(crate) fn initialize_from_adjustment_rule(
        &mut self,
        rule: &AdjustmentRule,
        standard_period: &TimeZonePeriod,
        periods: &mut Periods,
    ) {
        let year = rule.date_start.year();

        if rule.daylight_delta.is_zero() {
            let standard_for_year = TimeZonePeriod {
                id: format!("{STANDARD_PERIOD_ID}/{year}"),
                name: standard_period.name.clone(),
                bias: standard_period.bias,
            };
            self.transitions
                .push(TimeZoneTransition::simple_to_period(&standard_for_year.id));
            periods.register(standard_for_year);
        } else {
            let daylight_for_year = TimeZonePeriod {
                id: format!("{DAYLIGHT_PERIOD_ID}/{year}"),
                name: DAYLIGHT_PERIOD_NAME.to_owned(),
                bias: standard_period.bias - rule.daylight_delta,
            };
            let to_daylight = TimeZoneTransition::from_transition_time(
                &daylight_for_year.id,
                &rule.daylight_transition_start,
            );
            periods.register(daylight_for_year);

            let standard_for_year = TimeZonePeriod {
                id: format!("{STANDARD_PERIOD_ID}/{year}"),
                name: standard_period.name.clone(),
                bias: standard_period.bias,
            };
            let to_standard = TimeZoneTransition::from_transition_time(
                &standard_for_year.id,
                &rule.daylight_transition_end,
            );
            periods.register(standard_for_year);

            self.transitions.push(to_daylight);
            self.transitions.push(to_standard);
        }
    }

    /// Checks this group's structural invariants: one unconditional
    /// transition to a period, or two recurring transitions.
    pub fn validate(&self) -> Result<(), Error> {
        match self.transitions.as_slice() {
            [transition] => {
                if !transition.is_simple()
                    || transition.target().kind != TransitionTargetKind::Period
                {
                    return Err(Error::InvalidTimeZoneDefinition(
                        "a group with a single transition must transition unconditionally to a period"
                            .to_owned(),
                    ));
                }
            }

            [first, second] => {
                for transition in [first, second] {
                    if transition.is_simple() {
                        return Err(Error::InvalidTimeZoneDefinition(
                            "a group with two transitions may not contain an unconditional transition"
                                .to_owned(),
                        ));
                    }
                    if transition.target().kind != TransitionTargetKind::Period {
                        return Err(Error::InvalidTimeZoneDefinition(
                            "transitions within a group must target periods".to_owned(),
                        ));
                    }
                }
            }

            _ => {
                return Err(Error::InvalidTimeZoneDefinition(format!(
                    "a transition group must contain one or two transitions, found {}",
                    self.transitions.len()
                )))
            }
        }

        Ok(())
    }

    /// Resolves the group's transitions against the definition's periods
    /// and splits them into to-standard and to-daylight. The sole
    /// transition of a single-transition group is always to-standard.
    pub(crate) fn resolve_transitions<'a>(
        &'a self,
        periods: &'a Periods,
    ) -> Result<ResolvedTransitions<'a>, Error> {
        let mut standard = None;
        let mut daylight = None;

        for transition in &self.transitions {
            let target = transition.target();
            if target.kind != TransitionTargetKind::Period {
                return Err(Error::InvalidTimeZoneDefinition(
                    "transitions within a group must target periods".to_owned(),
                ));
            }

            let period = periods.get(&target.id).ok_or_else(|| {
                Error::InvalidTimeZoneDefinition(format!("period `{}` was not found", target.id))
            })?;

            if period.is_standard_period() || self.transitions.len() == 1 {
                standard = Some((transition, period));
            } else {
                daylight = Some((transition, period));
            }
        }

        let standard = standard.ok_or_else(|| {
            Error::InvalidTimeZoneDefinition(
                "no transition to a standard period was found".to_owned(),
            )
        })?;

        Ok(ResolvedTransitions { standard, daylight })
    }

    /// The offset added to standard time while this group's daylight period
    /// applies. Zero for groups without daylight saving time.
    pub(crate) fn daylight_delta(&self, periods: &Periods) -> Result<Duration, Error> {
        if !self.supports_daylight() {
            return Ok(Duration::ZERO);
        }

        let resolved = self.resolve_transitions(periods)?;
        let (_, daylight_period) = resolved.daylight.ok_or_else(|| {
            Error::InvalidTimeZoneDefinition(
                "no transition to a daylight period was found".to_owned(),
            )
        })?;

        Ok(resolved.standard.1.bias - daylight_period.bias)
    }

    /// The base offset and display names a host time zone should be created
    /// with when this group describes the currently applicable policy.
    pub(crate) fn custom_time_zone_creation_params(
        &self,
        periods: &Periods,
    ) -> Result<CustomTimeZoneCreateParams, Error> {
        let resolved = self.resolve_transitions(periods)?;

        Ok(CustomTimeZoneCreateParams {
            base_offset_to_utc: -resolved.standard.1.bias,
            standard_display_name: resolved.standard.1.name.clone(),
            daylight_display_name: resolved
                .daylight
                .map(|(_, period)| period.name.clone()),
        })
    }

    /// Builds the host adjustment rule covering `[start_date, end_date]`,
    /// or `None` when this group has no daylight saving time to express.
    pub(crate) fn create_adjustment_rule(
        &self,
        start_date: Date,
        end_date: Date,
        periods: &Periods,
    ) -> Result<Option<AdjustmentRule>, Error> {
        if !self.supports_daylight() {
            return Ok(None);
        }

        let resolved = self.resolve_transitions(periods)?;
        let (to_daylight, daylight_period) = resolved.daylight.ok_or_else(|| {
            Error::InvalidTimeZoneDefinition(
                "no transition to a daylight period was found".to_owned(),
            )
        })?;

        Ok(Some(AdjustmentRule {
            date_start: start_date,
            date_end: end_date,
            daylight_delta: resolved.standard.1.bias - daylight_period.bias,
            daylight_transition_start: to_daylight.to_transition_time()?,
            daylight_transition_end: resolved.standard.0.to_transition_time()?,
        }))
    }

    pub(crate) fn write_xml<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), Error> {
        let mut start = BytesStart::new("TransitionsGroup");
        start.push_attribute(("Id", self.id.as_str()));
        writer.write_event(Event::Start(start))?;

        for transition in &self.transitions {
            transition.write_xml(writer)?;
        }

        writer.write_event(Event::End(BytesEnd::new("TransitionsGroup")))?;
        Ok(())
    }
}

/// The list of transition groups belonging to a time zone definition.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/transitionsgroups>
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct TransitionsGroups {
    #[serde(default, rename = "TransitionsGroup")]
    pub inner: Vec<TimeZoneTransitionGroup>,
}

impl TransitionsGroups {
    pub(crate) fn get(&self, id: &str) -> Option<&TimeZoneTransitionGroup> {
        self.inner.iter().find(|group| group.id == id)
    }
}
