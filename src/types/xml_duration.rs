/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Conversion between [`time::Duration`] and `xs:duration` text, the format
//! EWS uses for period biases and transition time offsets (e.g. `-PT5H`).

use serde::{Deserialize, Deserializer};
use time::Duration;

use crate::Error;

/// Parses an `xs:duration` string.
///
/// Year and month components have no fixed length; Exchange never emits
/// them for time zone data, but they are accepted as 365- and 30-day
/// approximations to match the lenient parsing of existing EWS clients.
pub(crate) fn parse(value: &str) -> Result<Duration, Error> {
    let invalid = || Error::InvalidXmlDuration(value.to_owned());

    let mut rest = value;
    let negative = if let Some(stripped) = rest.strip_prefix('-') {
        rest = stripped;
        true
    } else {
        false
    };
    rest = rest.strip_prefix('P').ok_or_else(invalid)?;

    let mut in_time_part = false;
    let mut seen_component = false;
    let mut total = Duration::ZERO;

    while !rest.is_empty() {
        if !in_time_part {
            if let Some(stripped) = rest.strip_prefix('T') {
                rest = stripped;
                in_time_part = true;
                continue;
            }
        }

        let number_len = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .ok_or_else(invalid)?;
        if number_len == 0 {
            return Err(invalid());
        }
        let number = &rest[..number_len];
        let designator = rest[number_len..].chars().next().ok_or_else(invalid)?;
        rest = &rest[number_len + 1..];
        seen_component = true;

        let component = match (in_time_part, designator) {
            (false, 'Y') => days_component(number, 365).ok_or_else(invalid)?,
            (false, 'M') => days_component(number, 30).ok_or_else(invalid)?,
            (false, 'D') => days_component(number, 1).ok_or_else(invalid)?,
            (true, 'H') => int_component(number).map(Duration::hours).ok_or_else(invalid)?,
            (true, 'M') => int_component(number).map(Duration::minutes).ok_or_else(invalid)?,
            (true, 'S') => seconds_component(number).ok_or_else(invalid)?,
            _ => return Err(invalid()),
        };
        total += component;
    }

    if !seen_component {
        return Err(invalid());
    }

    Ok(if negative { -total } else { total })
}

fn int_component(number: &str) -> Option<i64> {
    // Fractions are only permitted on seconds.
    if number.contains('.') {
        return None;
    }
    number.parse().ok()
}

fn days_component(number: &str, days_per_unit: i64) -> Option<Duration> {
    Some(Duration::days(int_component(number)?.checked_mul(days_per_unit)?))
}

fn seconds_component(number: &str) -> Option<Duration> {
    if number.contains('.') {
        let seconds: f64 = number.parse().ok()?;
        Some(Duration::seconds_f64(seconds))
    } else {
        Some(Duration::seconds(number.parse().ok()?))
    }
}

/// Formats a duration as an `xs:duration` string.
pub(crate) fn format(duration: Duration) -> String {
    let mut formatted = String::new();
    if duration.is_negative() {
        formatted.push('-');
    }
    formatted.push('P');

    let total = duration.abs();
    let days = total.whole_days();
    if days > 0 {
        formatted.push_str(&format!("{days}D"));
    }

    let hours = total.whole_hours() - days * 24;
    let minutes = total.whole_minutes() - total.whole_hours() * 60;
    let seconds = total.whole_seconds() - total.whole_minutes() * 60;
    let nanos = total.subsec_nanoseconds();
    if nanos != 0 {
        let fraction = format!("{nanos:09}");
        let fraction = fraction.trim_end_matches('0');
        formatted.push_str(&format!("T{hours}H{minutes}M{seconds}.{fraction}S"));
    } else {
        formatted.push_str(&format!("T{hours}H{minutes}M{seconds}S"));
    }

    formatted
}

/// Deserializes a duration from `xs:duration` element or attribute text.
pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse(&value).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::{format, parse};

    #[test]
    fn parse_bias_values() {
        assert_eq!(
            parse("-PT5H").expect("negative hour duration should parse"),
            Duration::hours(-5)
        );
        assert_eq!(
            parse("PT5H30M").expect("hour/minute duration should parse"),
            Duration::hours(5) + Duration::minutes(30)
        );
        assert_eq!(
            parse("P1DT2H").expect("duration with day component should parse"),
            Duration::days(1) + Duration::hours(2)
        );
        assert_eq!(
            parse("PT0H0M0S").expect("zero duration should parse"),
            Duration::ZERO
        );
        assert_eq!(
            parse("PT1.5S").expect("fractional seconds should parse"),
            Duration::milliseconds(1500)
        );
    }

    #[test]
    fn parse_rejects_malformed_values() {
        for value in ["", "PT", "5H", "P-5D", "PT5X", "PTH", "P1.5D", "--PT5H"] {
            parse(value).expect_err(value);
        }
    }

    #[test]
    fn format_round_trips_through_parse() {
        for duration in [
            Duration::hours(-5),
            Duration::hours(5) + Duration::minutes(30),
            Duration::days(2) + Duration::seconds(5),
            Duration::milliseconds(1500),
            Duration::ZERO,
        ] {
            let formatted = format(duration);
            assert_eq!(
                parse(&formatted).expect("formatted duration should parse"),
                duration,
                "round trip through `{formatted}` should be lossless"
            );
        }
    }

    #[test]
    fn format_negative_with_days() {
        assert_eq!(format(Duration::hours(-26)), "-P1DT2H0M0S");
    }

    #[test]
    fn format_preserves_fractional_seconds() {
        assert_eq!(format(Duration::milliseconds(1500)), "PT0H0M1.5S");
        assert_eq!(format(Duration::milliseconds(-250)), "-PT0H0M0.25S");
    }
}
