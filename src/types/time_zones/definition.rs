/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::io::Write;

use quick_xml::{
    events::{BytesEnd, BytesStart, Event},
    Writer,
};
use serde::Deserialize;
use time::{Date, PrimitiveDateTime};

use crate::{
    diagnostics::{DiagnosticEvent, DiagnosticSink},
    Error, ExchangeServerVersion, HostTimeZone, Periods, TimeZonePeriod, TimeZoneTransition,
    TimeZoneTransitionGroup, TransitionTargetKind, Transitions, TransitionsGroups,
};

/// A complete EWS time zone definition: the periods, transition groups, and
/// chronologically ordered top-level transitions describing a zone's entire
/// daylight saving history.
///
/// A definition is built either from a host time zone
/// ([`from_host_time_zone`]) or from server XML ([`from_xml_document`]) and
/// converted back with [`to_host_time_zone`].
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/timezonedefinition>
///
/// [`from_host_time_zone`]: Self::from_host_time_zone
/// [`from_xml_document`]: Self::from_xml_document
/// [`to_host_time_zone`]: Self::to_host_time_zone
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct TimeZoneDefinition {
    #[serde(default, rename = "@Id")]
    pub id: Option<String>,

    #[serde(default, rename = "@Name")]
    pub name: Option<String>,

    #[serde(default)]
    pub periods: Periods,

    #[serde(default)]
    pub transitions_groups: TransitionsGroups,

    #[serde(default)]
    pub transitions: Transitions,
}

impl TimeZoneDefinition {
    /// Builds a definition equivalent to the given host time zone by
    /// walking its adjustment rules chronologically.
    pub fn from_host_time_zone(host_time_zone: &HostTimeZone) -> Self {
        let mut definition = TimeZoneDefinition {
            id: Some(host_time_zone.id.clone()),
            name: Some(host_time_zone.display_name.clone()),
            ..Default::default()
        };

        // Host platforms support a single standard offset, which maps to
        // one standard period with the negated (EWS sign convention) base
        // offset.
        let standard_period = TimeZonePeriod::standard(-host_time_zone.base_utc_offset);

        if host_time_zone.adjustment_rules.is_empty() {
            // The zone has no daylight saving history: one unconditional
            // transition to one group with one transition to the standard
            // period.
            let group_id = definition.push_group_to_period(&standard_period);
            definition
                .transitions
                .inner
                .push(TimeZoneTransition::simple_to_group(&group_id));
            return definition;
        }

        for (index, rule) in host_time_zone.adjustment_rules.iter().enumerate() {
            let mut group = TimeZoneTransitionGroup::with_id(
                definition.transitions_groups.inner.len().to_string(),
            );
            group.initialize_from_adjustment_rule(rule, &standard_period, &mut definition.periods);
            let group_id = group.id.clone();
            definition.transitions_groups.inner.push(group);

            let transition = if index == 0 {
                if rule.date_start > Date::MIN {
                    // The first rule starts partway through the timeline. A
                    // dummy standard-only group covers everything before
                    // it, and the rule's own group is entered by date.
                    let dummy_id = definition.push_group_to_period(&standard_period);
                    definition
                        .transitions
                        .inner
                        .push(TimeZoneTransition::simple_to_group(&dummy_id));
                    TimeZoneTransition::absolute_date_to_group(
                        &group_id,
                        rule.date_start.midnight(),
                    )
                } else {
                    TimeZoneTransition::simple_to_group(&group_id)
                }
            } else {
                TimeZoneTransition::absolute_date_to_group(&group_id, rule.date_start.midnight())
            };
            definition.transitions.inner.push(transition);
        }

        if let Some(last_rule) = host_time_zone.adjustment_rules.last() {
            if last_rule.date_end < Date::MAX {
                // Close the timeline: once the daylight saving history
                // ends, the zone reverts to standard-only time the day
                // after the last rule's end.
                let dummy_id = definition.push_group_to_period(&standard_period);
                let day_after_end = match last_rule.date_end.next_day() {
                    Some(date) => date,
                    None => Date::MAX,
                };
                definition
                    .transitions
                    .inner
                    .push(TimeZoneTransition::absolute_date_to_group(
                        &dummy_id,
                        day_after_end.midnight(),
                    ));
            }
        }

        definition
    }

    /// Appends a group containing a single unconditional transition to the
    /// given period, registering the period, and returns the group's id.
    fn push_group_to_period(&mut self, period: &TimeZonePeriod) -> String {
        let mut group =
            TimeZoneTransitionGroup::with_id(self.transitions_groups.inner.len().to_string());
        group
            .transitions
            .push(TimeZoneTransition::simple_to_period(&period.id));
        let id = group.id.clone();
        self.transitions_groups.inner.push(group);
        self.periods.register(period.clone());
        id
    }

    /// Deserializes a definition from an XML document whose root element is
    /// `TimeZoneDefinition`.
    ///
    /// Duplicate period ids are tolerated (first occurrence wins) and
    /// reported through `sink`, a missing id attribute is replaced with a
    /// synthesized one, and the top-level transitions are sorted
    /// chronologically.
    pub fn from_xml_document(
        document: &[u8],
        sink: &mut dyn DiagnosticSink,
    ) -> Result<Self, Error> {
        let mut deserializer = quick_xml::de::Deserializer::from_reader(document);
        let mut definition: TimeZoneDefinition =
            serde_path_to_error::deserialize(&mut deserializer)?;
        definition.normalize(sink);
        Ok(definition)
    }

    fn normalize(&mut self, sink: &mut dyn DiagnosticSink) {
        // Exchange has been observed sending duplicate period ids; keep the
        // first occurrence of each.
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(self.periods.inner.len());
        for period in self.periods.inner.drain(..) {
            if seen.insert(period.id.clone()) {
                kept.push(period);
            } else {
                sink.emit(DiagnosticEvent::DuplicatePeriod { id: period.id });
            }
        }
        self.periods.inner = kept;

        // EWS does not require an id; synthesize one from the name so the
        // definition remains addressable.
        if self.id.as_deref().map_or(true, str::is_empty) {
            let mut hasher = DefaultHasher::new();
            self.name.as_deref().unwrap_or_default().hash(&mut hasher);
            self.id = Some(format!("NoId_{}", hasher.finish()));
        }

        self.sort_transitions();
    }

    /// Sorts the top-level transitions chronologically: unconditional
    /// transitions first, then dated transitions in date order.
    fn sort_transitions(&mut self) {
        self.transitions
            .inner
            .sort_by(|a, b| match (a.is_simple(), b.is_simple()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                (false, false) => {
                    let a_date = a.date_time().unwrap_or(PrimitiveDateTime::MIN);
                    let b_date = b.date_time().unwrap_or(PrimitiveDateTime::MIN);
                    a_date.cmp(&b_date)
                }
            });
    }

    /// Serializes this definition as a `TimeZoneDefinition` element.
    ///
    /// Servers older than the oldest supported version only understand the
    /// id and name attributes, so the periods, transition groups, and
    /// transitions are gated on `version`.
    pub fn write_to_xml<W: Write>(
        &self,
        writer: &mut Writer<W>,
        version: ExchangeServerVersion,
    ) -> Result<(), Error> {
        let mut start = BytesStart::new("TimeZoneDefinition");
        if let Some(id) = &self.id {
            start.push_attribute(("Id", id.as_str()));
        }
        if let Some(name) = &self.name {
            start.push_attribute(("Name", name.as_str()));
        }
        writer.write_event(Event::Start(start))?;

        if version > ExchangeServerVersion::Exchange2007 {
            if !self.periods.inner.is_empty() {
                writer.write_event(Event::Start(BytesStart::new("Periods")))?;
                for period in &self.periods.inner {
                    period.write_xml(writer)?;
                }
                writer.write_event(Event::End(BytesEnd::new("Periods")))?;
            }

            if !self.transitions_groups.inner.is_empty() {
                writer.write_event(Event::Start(BytesStart::new("TransitionsGroups")))?;
                for group in &self.transitions_groups.inner {
                    group.write_xml(writer)?;
                }
                writer.write_event(Event::End(BytesEnd::new("TransitionsGroups")))?;
            }

            if !self.transitions.inner.is_empty() {
                writer.write_event(Event::Start(BytesStart::new("Transitions")))?;
                for transition in &self.transitions.inner {
                    transition.write_xml(writer)?;
                }
                writer.write_event(Event::End(BytesEnd::new("Transitions")))?;
            }
        }

        writer.write_event(Event::End(BytesEnd::new("TimeZoneDefinition")))?;
        Ok(())
    }

    /// Checks the definition's structural invariants: non-empty
    /// collections, as many transitions as transition groups, an
    /// unconditional first transition, all top-level transitions
    /// unconditional or dated and targeting resolvable groups, and every
    /// group internally valid.
    pub fn validate(&self) -> Result<(), Error> {
        let transitions = &self.transitions.inner;
        let groups = &self.transitions_groups.inner;

        if self.periods.inner.is_empty()
            || transitions.is_empty()
            || groups.is_empty()
            || transitions.len() != groups.len()
        {
            return Err(Error::InvalidTimeZoneDefinition(
                "a definition must contain at least one period and as many transitions as transition groups"
                    .to_owned(),
            ));
        }

        match transitions.first() {
            Some(first) if first.is_simple() => {}
            _ => {
                return Err(Error::InvalidTimeZoneDefinition(
                    "the first transition must be unconditional".to_owned(),
                ))
            }
        }

        for transition in transitions {
            if !matches!(
                transition,
                TimeZoneTransition::Simple(_) | TimeZoneTransition::AbsoluteDate(_)
            ) {
                return Err(Error::InvalidTimeZoneDefinition(
                    "top-level transitions must be unconditional or fire on a specific date"
                        .to_owned(),
                ));
            }
            self.target_group(transition)?;
        }

        for group in groups {
            group.validate()?;
        }

        Ok(())
    }

    /// Converts this definition into the host platform's representation.
    ///
    /// Each `[start, next start)` interval of the sorted transition list
    /// becomes at most one adjustment rule. Intervals which do not start
    /// before they effectively end (bad server data) are skipped and
    /// reported through `sink` rather than rejected.
    pub fn to_host_time_zone(&self, sink: &mut dyn DiagnosticSink) -> Result<HostTimeZone, Error> {
        self.validate()?;

        let transitions = &self.transitions.inner;

        // The base offset and display names come from the last transition's
        // group: the list is ordered chronologically, so that's the policy
        // applying from now on.
        let last = transitions.last().ok_or_else(|| {
            Error::InvalidTimeZoneDefinition(
                "a definition must contain at least one transition".to_owned(),
            )
        })?;
        let creation_params = self
            .target_group(last)?
            .custom_time_zone_creation_params(&self.periods)?;

        let mut adjustment_rules = Vec::new();
        let mut start_date = Date::MIN;

        for (index, transition) in transitions.iter().enumerate() {
            let (end_date, effective_end_date) = match transitions.get(index + 1) {
                Some(next) => {
                    let next_date = next
                        .date_time()
                        .ok_or_else(|| {
                            Error::InvalidTimeZoneDefinition(
                                "all transitions after the first must fire on a specific date"
                                    .to_owned(),
                            )
                        })?
                        .date();
                    // End the interval the day before the next policy
                    // starts; the final interval runs through the maximum
                    // date inclusive.
                    let effective = match next_date.previous_day() {
                        Some(date) => date,
                        None => Date::MIN,
                    };
                    (next_date, effective)
                }
                None => (Date::MAX, Date::MAX),
            };

            if start_date < effective_end_date {
                let group = self.target_group(transition)?;
                if let Some(rule) =
                    group.create_adjustment_rule(start_date, effective_end_date, &self.periods)?
                {
                    adjustment_rules.push(rule);
                }
                start_date = end_date;
            } else {
                sink.emit(DiagnosticEvent::OutOfOrderInterval {
                    start_date,
                    effective_end_date,
                });
            }
        }

        let daylight_display_name = if adjustment_rules.is_empty() {
            None
        } else {
            creation_params.daylight_display_name
        };

        Ok(HostTimeZone {
            id: self.id.clone().unwrap_or_default(),
            display_name: self.name.clone().unwrap_or_default(),
            standard_display_name: creation_params.standard_display_name,
            daylight_display_name,
            base_utc_offset: creation_params.base_offset_to_utc,
            adjustment_rules,
        })
    }

    /// Resolves a top-level transition's target against the definition's
    /// transition groups.
    fn target_group(&self, transition: &TimeZoneTransition) -> Result<&TimeZoneTransitionGroup, Error> {
        let target = transition.target();
        if target.kind != TransitionTargetKind::Group {
            return Err(Error::InvalidTimeZoneDefinition(
                "top-level transitions must target transition groups".to_owned(),
            ));
        }

        self.transitions_groups.get(&target.id).ok_or_else(|| {
            Error::InvalidTimeZoneDefinition(format!(
                "transition group `{}` was not found",
                target.id
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use quick_xml::Writer;
    use time::{
        macros::{date, time},
        Date, Duration, Month, Weekday,
    };

    use crate::{
        diagnostics::{DiagnosticEvent, DiscardDiagnostics},
        AdjustmentRule, Error, ExchangeServerVersion, HostTimeZone, TimeZoneTransition,
        TransitionTime,
    };

    use super::TimeZoneDefinition;

    /// A host zone resembling US Eastern time with the post-2007 daylight
    /// saving rules.
    fn eastern_host(rules: Vec<AdjustmentRule>) -> HostTimeZone {
        HostTimeZone {
            id: "Eastern Standard Time".to_owned(),
            display_name: "(UTC-05:00) Eastern Time (US & Canada)".to_owned(),
            standard_display_name: "Eastern Standard Time".to_owned(),
            daylight_display_name: Some("Eastern Daylight Time".to_owned()),
            base_utc_offset: Duration::hours(-5),
            adjustment_rules: rules,
        }
    }

    fn eastern_rule(date_start: Date, date_end: Date) -> AdjustmentRule {
        AdjustmentRule {
            date_start,
            date_end,
            daylight_delta: Duration::hours(1),
            daylight_transition_start: TransitionTime::Floating {
                time_of_day: time!(02:00:00),
                month: Month::March,
                week: 2,
                day_of_week: Weekday::Sunday,
            },
            daylight_transition_end: TransitionTime::Floating {
                time_of_day: time!(02:00:00),
                month: Month::November,
                week: 1,
                day_of_week: Weekday::Sunday,
            },
        }
    }

    #[test]
    fn round_trip_without_daylight_saving() {
        let host = HostTimeZone {
            daylight_display_name: None,
            adjustment_rules: Vec::new(),
            ..eastern_host(Vec::new())
        };

        let definition = TimeZoneDefinition::from_host_time_zone(&host);
        definition.validate().expect("definition should be valid");
        assert_eq!(definition.transitions.inner.len(), 1);
        assert_eq!(definition.transitions_groups.inner.len(), 1);

        let rebuilt = definition
            .to_host_time_zone(&mut DiscardDiagnostics)
            .expect("conversion back to a host zone should succeed");
        assert_eq!(rebuilt.base_utc_offset, Duration::hours(-5));
        assert_eq!(rebuilt.id, host.id);
        assert_eq!(rebuilt.display_name, host.display_name);
        assert!(
            rebuilt.adjustment_rules.is_empty(),
            "a zone without daylight saving history should stay that way"
        );
        assert_eq!(rebuilt.daylight_display_name, None);
    }

    #[test]
    fn round_trip_with_multiple_adjustment_rules() {
        // US Eastern-like history: April/October recurrences through 2006,
        // March/November from 2007 on.
        let old_rule = AdjustmentRule {
            date_start: Date::MIN,
            date_end: date!(2006 - 12 - 31),
            daylight_delta: Duration::hours(1),
            daylight_transition_start: TransitionTime::Floating {
                time_of_day: time!(02:00:00),
                month: Month::April,
                week: 1,
                day_of_week: Weekday::Sunday,
            },
            daylight_transition_end: TransitionTime::Floating {
                time_of_day: time!(02:00:00),
                month: Month::October,
                week: 5,
                day_of_week: Weekday::Sunday,
            },
        };
        let new_rule = eastern_rule(date!(2007 - 01 - 01), Date::MAX);
        let host = eastern_host(vec![old_rule.clone(), new_rule.clone()]);

        let definition = TimeZoneDefinition::from_host_time_zone(&host);
        definition.validate().expect("definition should be valid");

        // One group per rule, bridged by a dated transition at the policy
        // change.
        assert_eq!(definition.transitions_groups.inner.len(), 2);
        assert!(definition.transitions.inner[0].is_simple());
        match &definition.transitions.inner[1] {
            TimeZoneTransition::AbsoluteDate(transition) => {
                assert_eq!(transition.date_time.date(), date!(2007 - 01 - 01));
                assert_eq!(transition.to.id, "1");
            }
            other => panic!("expected an absolute date transition, got {other:?}"),
        }

        let mut events = Vec::new();
        let rebuilt = definition
            .to_host_time_zone(&mut events)
            .expect("conversion back to a host zone should succeed");
        assert_eq!(rebuilt.adjustment_rules, vec![old_rule, new_rule]);
        assert_eq!(events, Vec::new(), "no anomalies should be reported");
    }

    #[test]
    fn round_trip_with_daylight_saving() {
        let rule = eastern_rule(Date::MIN, Date::MAX);
        let host = eastern_host(vec![rule.clone()]);

        let definition = TimeZoneDefinition::from_host_time_zone(&host);
        definition.validate().expect("definition should be valid");

        let mut events = Vec::new();
        let rebuilt = definition
            .to_host_time_zone(&mut events)
            .expect("conversion back to a host zone should succeed");

        assert_eq!(rebuilt.base_utc_offset, Duration::hours(-5));
        assert_eq!(rebuilt.adjustment_rules, vec![rule]);
        assert_eq!(events, Vec::new(), "no anomalies should be reported");
    }

    #[test]
    fn bias_sign_convention() {
        let host = eastern_host(Vec::new());
        let definition = TimeZoneDefinition::from_host_time_zone(&host);

        let standard = definition
            .periods
            .get("Standard")
            .expect("the standard period should be registered");
        assert_eq!(
            standard.bias,
            Duration::hours(5),
            "a -5h UTC offset should become a +5h bias"
        );
    }

    #[test]
    fn first_rule_starting_late_gets_a_bridging_group() {
        let rule = eastern_rule(date!(2007 - 01 - 01), Date::MAX);
        let definition = TimeZoneDefinition::from_host_time_zone(&eastern_host(vec![rule.clone()]));
        definition.validate().expect("definition should be valid");

        // One group for the rule, one dummy group bridging the time before
        // it.
        assert_eq!(definition.transitions_groups.inner.len(), 2);
        assert!(definition.transitions.inner[0].is_simple());
        match &definition.transitions.inner[1] {
            TimeZoneTransition::AbsoluteDate(transition) => {
                assert_eq!(transition.date_time.date(), date!(2007 - 01 - 01));
                assert_eq!(transition.to.id, "0", "the dated transition should enter the rule's group");
            }
            other => panic!("expected an absolute date transition, got {other:?}"),
        }

        let rebuilt = definition
            .to_host_time_zone(&mut DiscardDiagnostics)
            .expect("conversion back to a host zone should succeed");
        assert_eq!(rebuilt.adjustment_rules, vec![rule]);
    }

    #[test]
    fn history_ending_early_gets_a_trailing_transition() {
        let rule = eastern_rule(Date::MIN, date!(2006 - 12 - 31));
        let definition = TimeZoneDefinition::from_host_time_zone(&eastern_host(vec![rule.clone()]));
        definition.validate().expect("definition should be valid");

        assert_eq!(definition.transitions.inner.len(), 2);
        let trailing = definition
            .transitions
            .inner
            .last()
            .expect("the definition should have transitions");
        match trailing {
            TimeZoneTransition::AbsoluteDate(transition) => {
                assert_eq!(
                    transition.date_time.date(),
                    date!(2007 - 01 - 01),
                    "the timeline should close the day after the last rule ends"
                );
                let group = definition
                    .transitions_groups
                    .get(&transition.to.id)
                    .expect("the trailing transition should target a group");
                assert_eq!(
                    group.transitions.len(),
                    1,
                    "the trailing group should be standard-only"
                );
            }
            other => panic!("expected an absolute date transition, got {other:?}"),
        }

        let rebuilt = definition
            .to_host_time_zone(&mut DiscardDiagnostics)
            .expect("conversion back to a host zone should succeed");
        assert_eq!(
            rebuilt.adjustment_rules,
            vec![eastern_rule(Date::MIN, date!(2006 - 12 - 31))]
        );
    }

    /// A realistic server payload for US Eastern time.
    const EASTERN_XML: &str = concat!(
        r#"<TimeZoneDefinition Id="Eastern Standard Time" Name="(UTC-05:00) Eastern Time (US &amp; Canada)">"#,
        r#"<Periods>"#,
        r#"<Period Bias="PT5H" Name="Standard" Id="Std"/>"#,
        r#"<Period Bias="PT4H" Name="Daylight" Id="Dlt"/>"#,
        r#"</Periods>"#,
        r#"<TransitionsGroups>"#,
        r#"<TransitionsGroup Id="0">"#,
        r#"<RecurringDayTransition><To Kind="Period">Dlt</To><TimeOffset>PT2H0M0S</TimeOffset><Month>3</Month><DayOfWeek>Sunday</DayOfWeek><Occurrence>2</Occurrence></RecurringDayTransition>"#,
        r#"<RecurringDayTransition><To Kind="Period">Std</To><TimeOffset>PT2H0M0S</TimeOffset><Month>11</Month><DayOfWeek>Sunday</DayOfWeek><Occurrence>1</Occurrence></RecurringDayTransition>"#,
        r#"</TransitionsGroup>"#,
        r#"</TransitionsGroups>"#,
        r#"<Transitions>"#,
        r#"<Transition><To Kind="Group">0</To></Transition>"#,
        r#"</Transitions>"#,
        r#"</TimeZoneDefinition>"#,
    );

    #[test]
    fn server_payload_converts_to_host_zone() {
        let mut events = Vec::new();
        let definition = TimeZoneDefinition::from_xml_document(EASTERN_XML.as_bytes(), &mut events)
            .expect("deserialization should succeed");
        assert_eq!(events, Vec::new(), "no anomalies should be reported");

        let rebuilt = definition
            .to_host_time_zone(&mut events)
            .expect("conversion to a host zone should succeed");

        assert_eq!(rebuilt.id, "Eastern Standard Time");
        assert_eq!(rebuilt.base_utc_offset, Duration::hours(-5));
        assert_eq!(rebuilt.standard_display_name, "Standard");
        assert_eq!(rebuilt.daylight_display_name.as_deref(), Some("Daylight"));
        assert_eq!(
            rebuilt.adjustment_rules,
            vec![eastern_rule(Date::MIN, Date::MAX)]
        );
    }

    #[test]
    fn transitions_are_sorted_after_loading() {
        let xml = concat!(
            r#"<TimeZoneDefinition Id="Test" Name="Test">"#,
            r#"<Periods><Period Bias="PT5H" Name="Standard" Id="Std"/></Periods>"#,
            r#"<TransitionsGroups>"#,
            r#"<TransitionsGroup Id="0"><Transition><To Kind="Period">Std</To></Transition></TransitionsGroup>"#,
            r#"<TransitionsGroup Id="1"><Transition><To Kind="Period">Std</To></Transition></TransitionsGroup>"#,
            r#"<TransitionsGroup Id="2"><Transition><To Kind="Period">Std</To></Transition></TransitionsGroup>"#,
            r#"</TransitionsGroups>"#,
            r#"<Transitions>"#,
            r#"<AbsoluteDateTransition><To Kind="Group">2</To><DateTime>2010-01-01T00:00:00</DateTime></AbsoluteDateTransition>"#,
            r#"<Transition><To Kind="Group">0</To></Transition>"#,
            r#"<AbsoluteDateTransition><To Kind="Group">1</To><DateTime>2007-01-01T00:00:00</DateTime></AbsoluteDateTransition>"#,
            r#"</Transitions>"#,
            r#"</TimeZoneDefinition>"#,
        );

        let definition =
            TimeZoneDefinition::from_xml_document(xml.as_bytes(), &mut DiscardDiagnostics)
                .expect("deserialization should succeed");

        let order: Vec<_> = definition
            .transitions
            .inner
            .iter()
            .map(|transition| transition.target().id.clone())
            .collect();
        assert_eq!(
            order,
            vec!["0", "1", "2"],
            "unconditional transitions should sort first, then by date"
        );
    }

    #[test]
    fn duplicate_periods_are_tolerated() {
        let xml = concat!(
            r#"<TimeZoneDefinition Id="Test" Name="Test">"#,
            r#"<Periods>"#,
            r#"<Period Bias="PT5H" Name="Standard" Id="Std"/>"#,
            r#"<Period Bias="PT8H" Name="Standard" Id="Std"/>"#,
            r#"</Periods>"#,
            r#"</TimeZoneDefinition>"#,
        );

        let mut events = Vec::new();
        let definition = TimeZoneDefinition::from_xml_document(xml.as_bytes(), &mut events)
            .expect("duplicate periods should not fail deserialization");

        assert_eq!(definition.periods.inner.len(), 1);
        assert_eq!(
            definition.periods.inner[0].bias,
            Duration::hours(5),
            "the first occurrence should win"
        );
        assert_eq!(
            events,
            vec![DiagnosticEvent::DuplicatePeriod {
                id: "Std".to_owned()
            }]
        );
    }

    #[test]
    fn missing_id_is_synthesized() {
        let xml = r#"<TimeZoneDefinition Name="Somewhere"><Periods><Period Bias="PT5H" Name="Standard" Id="Std"/></Periods></TimeZoneDefinition>"#;

        let definition =
            TimeZoneDefinition::from_xml_document(xml.as_bytes(), &mut DiscardDiagnostics)
                .expect("deserialization should succeed");

        let id = definition.id.expect("an id should be synthesized");
        assert!(
            id.starts_with("NoId_"),
            "synthesized ids should be marked, got `{id}`"
        );
    }

    #[test]
    fn validate_rejects_mismatched_counts() {
        let host = eastern_host(vec![eastern_rule(Date::MIN, Date::MAX)]);
        let mut definition = TimeZoneDefinition::from_host_time_zone(&host);
        definition
            .transitions_groups
            .inner
            .push(crate::TimeZoneTransitionGroup::with_id("9".to_owned()));

        assert!(matches!(
            definition.validate(),
            Err(Error::InvalidTimeZoneDefinition(_))
        ));
    }

    #[test]
    fn validate_rejects_dated_first_transition() {
        let host = eastern_host(vec![eastern_rule(Date::MIN, Date::MAX)]);
        let mut definition = TimeZoneDefinition::from_host_time_zone(&host);
        definition.transitions.inner[0] =
            TimeZoneTransition::absolute_date_to_group("0", date!(2007 - 01 - 01).midnight());

        assert!(matches!(
            definition.validate(),
            Err(Error::InvalidTimeZoneDefinition(_))
        ));
    }

    #[test]
    fn validate_rejects_unresolvable_group() {
        let host = eastern_host(Vec::new());
        let mut definition = TimeZoneDefinition::from_host_time_zone(&host);
        definition.transitions.inner[0] = TimeZoneTransition::simple_to_group("missing");

        let error = definition
            .validate()
            .expect_err("an unresolvable group reference should be rejected");
        assert!(matches!(error, Error::InvalidTimeZoneDefinition(_)));
    }

    #[test]
    fn out_of_order_intervals_are_skipped() {
        // Two dated transitions with identical dates produce an interval
        // which ends before it starts.
        let xml = concat!(
            r#"<TimeZoneDefinition Id="Test" Name="Test">"#,
            r#"<Periods><Period Bias="PT5H" Name="Standard" Id="Std"/></Periods>"#,
            r#"<TransitionsGroups>"#,
            r#"<TransitionsGroup Id="0"><Transition><To Kind="Period">Std</To></Transition></TransitionsGroup>"#,
            r#"<TransitionsGroup Id="1"><Transition><To Kind="Period">Std</To></Transition></TransitionsGroup>"#,
            r#"<TransitionsGroup Id="2"><Transition><To Kind="Period">Std</To></Transition></TransitionsGroup>"#,
            r#"</TransitionsGroups>"#,
            r#"<Transitions>"#,
            r#"<Transition><To Kind="Group">0</To></Transition>"#,
            r#"<AbsoluteDateTransition><To Kind="Group">1</To><DateTime>2007-01-01T00:00:00</DateTime></AbsoluteDateTransition>"#,
            r#"<AbsoluteDateTransition><To Kind="Group">2</To><DateTime>2007-01-01T00:00:00</DateTime></AbsoluteDateTransition>"#,
            r#"</Transitions>"#,
            r#"</TimeZoneDefinition>"#,
        );

        let mut events = Vec::new();
        let definition = TimeZoneDefinition::from_xml_document(xml.as_bytes(), &mut events)
            .expect("deserialization should succeed");
        events.clear();

        let rebuilt = definition
            .to_host_time_zone(&mut events)
            .expect("conversion should tolerate the malformed interval");
        assert!(
            rebuilt.adjustment_rules.is_empty(),
            "standard-only groups produce no rules"
        );
        assert_eq!(
            events.len(),
            1,
            "the skipped interval should be reported exactly once"
        );
        assert!(matches!(
            events[0],
            DiagnosticEvent::OutOfOrderInterval { .. }
        ));
    }

    #[test]
    fn write_and_reload_round_trip() {
        let host = eastern_host(vec![eastern_rule(date!(2007 - 01 - 01), Date::MAX)]);
        let definition = TimeZoneDefinition::from_host_time_zone(&host);

        let mut writer = {
            let inner: Vec<u8> = Default::default();
            Writer::new(inner)
        };
        definition
            .write_to_xml(&mut writer, ExchangeServerVersion::Exchange2010)
            .expect("serialization should succeed");
        let document = writer.into_inner();

        let reloaded =
            TimeZoneDefinition::from_xml_document(&document, &mut DiscardDiagnostics)
                .expect("the serialized document should deserialize");
        assert_eq!(
            reloaded, definition,
            "a definition should survive a write/read round trip"
        );
    }

    #[test]
    fn legacy_servers_only_get_attributes() {
        let host = eastern_host(vec![eastern_rule(date!(2007 - 01 - 01), Date::MAX)]);
        let definition = TimeZoneDefinition::from_host_time_zone(&host);

        let mut writer = {
            let inner: Vec<u8> = Default::default();
            Writer::new(inner)
        };
        definition
            .write_to_xml(&mut writer, ExchangeServerVersion::Exchange2007)
            .expect("serialization should succeed");

        let document = String::from_utf8(writer.into_inner()).expect("output should be UTF-8");
        assert!(
            !document.contains("<Periods>"),
            "the full definition should not be sent to legacy servers: {document}"
        );
        assert!(document.contains(r#"Id="Eastern Standard Time""#));
    }

    #[test]
    fn write_errors_surface_as_io_errors() {
        struct FailingWriter;

        impl std::io::Write for FailingWriter {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "broken pipe",
                ))
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let definition = TimeZoneDefinition::from_host_time_zone(&eastern_host(Vec::new()));
        let mut writer = Writer::new(FailingWriter);

        let error = definition
            .write_to_xml(&mut writer, ExchangeServerVersion::Exchange2010)
            .expect_err("writing to a failing sink should fail");
        assert!(matches!(error, Error::Io(_)));
    }
}
