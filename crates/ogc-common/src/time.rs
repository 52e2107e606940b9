//! Time handling: ISO 8601 parsing and layer time extents.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),

    #[error("Invalid ISO 8601 duration: {0}")]
    InvalidDuration(String),

    #[error("Only a single time value is supported, got: {0}")]
    NotSingleValue(String),

    #[error("Time extent must not be empty")]
    EmptyExtent,

    #[error("Time interval start {start} is after end {end}")]
    InvertedInterval { start: String, end: String },
}

/// Parse an ISO 8601 instant.
///
/// Accepts RFC 3339, a zone-less `YYYY-MM-DDTHH:MM:SS[.fff]` (read as UTC)
/// and a bare date.
pub fn parse_iso8601(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(ndt) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    Err(TimeParseError::InvalidFormat(s.to_string()))
}

/// Format an instant as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn format_iso8601(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Parse a day-time ISO 8601 duration: `PnW` or `PnDTnHnMnS`.
///
/// Year and month designators are rejected since they have no fixed length.
pub fn parse_iso_duration(s: &str) -> Result<Duration, TimeParseError> {
    let err = || TimeParseError::InvalidDuration(s.to_string());
    let body = s.trim().strip_prefix('P').ok_or_else(err)?;
    if body.is_empty() {
        return Err(err());
    }

    let (date_part, time_part) = match body.split_once('T') {
        Some((d, t)) if !t.is_empty() => (d, Some(t)),
        Some(_) => return Err(err()),
        None => (body, None),
    };

    let mut seconds: i64 = 0;
    accumulate(date_part, &[('W', 7 * 86_400), ('D', 86_400)], &mut seconds)
        .ok_or_else(err)?;
    if let Some(time_part) = time_part {
        accumulate(time_part, &[('H', 3_600), ('M', 60), ('S', 1)], &mut seconds)
            .ok_or_else(err)?;
    }

    Duration::try_seconds(seconds).ok_or_else(err)
}

/// Adds `n<designator>` components of one duration part to `total`.
/// `None` on an unknown designator, a dangling number or overflow.
fn accumulate(part: &str, units: &[(char, i64)], total: &mut i64) -> Option<()> {
    let mut number = String::new();
    for c in part.chars() {
        if c.is_ascii_digit() {
            number.push(c);
            continue;
        }
        let &(_, unit) = units.iter().find(|(designator, _)| *designator == c)?;
        let n: i64 = number.parse().ok()?;
        *total = n.checked_mul(unit).and_then(|s| total.checked_add(s))?;
        number.clear();
    }
    number.is_empty().then_some(())
}

/// Format a duration as `PnDTnHnMnS`, omitting zero components.
pub fn format_iso_duration(d: &Duration) -> String {
    let mut secs = d.num_seconds();
    if secs == 0 {
        return "PT0S".to_string();
    }

    let days = secs / 86_400;
    secs %= 86_400;
    let hours = secs / 3_600;
    secs %= 3_600;
    let minutes = secs / 60;
    secs %= 60;

    let mut out = String::from("P");
    if days > 0 {
        out.push_str(&format!("{}D", days));
    }
    if hours > 0 || minutes > 0 || secs > 0 {
        out.push('T');
        if hours > 0 {
            out.push_str(&format!("{}H", hours));
        }
        if minutes > 0 {
            out.push_str(&format!("{}M", minutes));
        }
        if secs > 0 {
            out.push_str(&format!("{}S", secs));
        }
    }
    out
}

/// Parsed request TIME value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSpec {
    /// Use the layer's default (latest) time
    Current,
    /// Single specific time
    Instant(DateTime<Utc>),
}

impl TimeSpec {
    /// Parse a TIME parameter. Lists and ranges are rejected.
    pub fn parse(s: &str) -> Result<Self, TimeParseError> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("current") || s.eq_ignore_ascii_case("now") {
            return Ok(TimeSpec::Current);
        }
        if s.contains(',') || s.contains('/') {
            return Err(TimeParseError::NotSingleValue(s.to_string()));
        }
        parse_iso8601(s).map(TimeSpec::Instant)
    }
}

/// Times at which a layer has data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeExtent {
    /// Explicit instants, sorted ascending without duplicates
    Instants(Vec<DateTime<Utc>>),
    /// Closed interval, optionally restricted to a regular period
    Interval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        period: Option<Duration>,
    },
}

impl TimeExtent {
    pub fn instants(mut times: Vec<DateTime<Utc>>) -> Result<Self, TimeParseError> {
        if times.is_empty() {
            return Err(TimeParseError::EmptyExtent);
        }
        times.sort();
        times.dedup();
        Ok(TimeExtent::Instants(times))
    }

    pub fn interval(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        period: Option<Duration>,
    ) -> Result<Self, TimeParseError> {
        if start > end {
            return Err(TimeParseError::InvertedInterval {
                start: format_iso8601(&start),
                end: format_iso8601(&end),
            });
        }
        let period = period.filter(|p| p.num_seconds() > 0);
        Ok(TimeExtent::Interval { start, end, period })
    }

    /// Parse the WMS extent syntax: a comma list, or `start/end[/period]`.
    pub fn parse(s: &str) -> Result<Self, TimeParseError> {
        let parts: Vec<&str> = s.split('/').map(str::trim).collect();
        match parts.as_slice() {
            [start, end] => Self::interval(parse_iso8601(start)?, parse_iso8601(end)?, None),
            [start, end, period] => Self::interval(
                parse_iso8601(start)?,
                parse_iso8601(end)?,
                Some(parse_iso_duration(period)?),
            ),
            [_] => {
                let times = s
                    .split(',')
                    .map(parse_iso8601)
                    .collect::<Result<Vec<_>, _>>()?;
                Self::instants(times)
            }
            _ => Err(TimeParseError::InvalidFormat(s.to_string())),
        }
    }

    /// Whether `t` is one of the extent's valid times.
    pub fn contains(&self, t: &DateTime<Utc>) -> bool {
        match self {
            TimeExtent::Instants(times) => times.binary_search(t).is_ok(),
            TimeExtent::Interval { start, end, period } => {
                if t < start || t > end {
                    return false;
                }
                match period {
                    Some(p) => (*t - *start).num_seconds() % p.num_seconds() == 0,
                    None => true,
                }
            }
        }
    }

    /// Latest valid time.
    pub fn default_value(&self) -> DateTime<Utc> {
        match self {
            TimeExtent::Instants(times) => times[times.len() - 1],
            TimeExtent::Interval { start, end, period } => match period {
                Some(p) => {
                    let steps = (*end - *start).num_seconds() / p.num_seconds();
                    *start + Duration::seconds(steps * p.num_seconds())
                }
                None => *end,
            },
        }
    }

    /// Latest valid time inside `[from, to]`, if any.
    pub fn latest_within(&self, from: &DateTime<Utc>, to: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TimeExtent::Instants(times) => times.iter().rev().find(|t| *t >= from && *t <= to).copied(),
            TimeExtent::Interval { start, end, period } => {
                let hi = (*end).min(*to);
                let lo = (*start).max(*from);
                if hi < lo {
                    return None;
                }
                let candidate = match period {
                    Some(p) => {
                        let steps = (hi - *start).num_seconds() / p.num_seconds();
                        *start + Duration::seconds(steps * p.num_seconds())
                    }
                    None => hi,
                };
                (candidate >= lo).then_some(candidate)
            }
        }
    }

    /// Earliest and latest valid times.
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        match self {
            TimeExtent::Instants(times) => (times[0], times[times.len() - 1]),
            TimeExtent::Interval { start, .. } => (*start, self.default_value()),
        }
    }

    /// Extent string for capabilities `Dimension`/`Extent` elements.
    pub fn to_extent_string(&self) -> String {
        match self {
            TimeExtent::Instants(times) => times
                .iter()
                .map(format_iso8601)
                .collect::<Vec<_>>()
                .join(","),
            TimeExtent::Interval { start, end, period } => match period {
                Some(p) => format!(
                    "{}/{}/{}",
                    format_iso8601(start),
                    format_iso8601(end),
                    format_iso_duration(p)
                ),
                None => format!("{}/{}", format_iso8601(start), format_iso8601(end)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> DateTime<Utc> {
        parse_iso8601(s).unwrap()
    }

    #[test]
    fn test_parse_iso8601_variants() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(t("2024-01-15T12:00:00Z"), expected);
        assert_eq!(t("2024-01-15T12:00:00"), expected);
        assert_eq!(t("2024-01-15T14:00:00+02:00"), expected);
        assert_eq!(t("2024-01-15T12:00"), expected);
        assert_eq!(
            t("2024-01-15"),
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
        );
        assert!(parse_iso8601("yesterday").is_err());
    }

    #[test]
    fn test_duration_round_trip() {
        assert_eq!(parse_iso_duration("PT3H").unwrap(), Duration::hours(3));
        assert_eq!(parse_iso_duration("P1DT30M").unwrap(), Duration::minutes(1470));
        assert_eq!(parse_iso_duration("P2W").unwrap(), Duration::days(14));
        assert!(parse_iso_duration("P1M").is_err());
        assert!(parse_iso_duration("PT").is_err());
        assert!(parse_iso_duration("3H").is_err());
        assert!(parse_iso_duration("PT5").is_err());
        assert_eq!(format_iso_duration(&Duration::hours(3)), "PT3H");
        assert_eq!(format_iso_duration(&Duration::minutes(1470)), "P1DT30M");
    }

    #[test]
    fn test_huge_period_is_rejected() {
        assert!(matches!(
            parse_iso_duration("P99999999999999999W"),
            Err(TimeParseError::InvalidDuration(_))
        ));
        assert!(parse_iso_duration("PT9223372036854775807S").is_err());
        let extent = "2024-01-01T00:00:00Z/2024-01-02T00:00:00Z/P9999999999999999D";
        assert!(TimeExtent::parse(extent).is_err());
    }

    #[test]
    fn test_time_spec_rejects_lists() {
        assert_eq!(TimeSpec::parse("current").unwrap(), TimeSpec::Current);
        assert!(matches!(
            TimeSpec::parse("2024-01-01,2024-01-02"),
            Err(TimeParseError::NotSingleValue(_))
        ));
        assert!(matches!(
            TimeSpec::parse("2024-01-01/2024-01-02"),
            Err(TimeParseError::NotSingleValue(_))
        ));
    }

    #[test]
    fn test_instant_extent() {
        let extent = TimeExtent::parse("2024-01-15T12:00:00Z,2024-01-15T00:00:00Z").unwrap();
        assert!(extent.contains(&t("2024-01-15T00:00:00Z")));
        assert!(!extent.contains(&t("2024-01-15T06:00:00Z")));
        assert_eq!(extent.default_value(), t("2024-01-15T12:00:00Z"));
        assert_eq!(
            extent.to_extent_string(),
            "2024-01-15T00:00:00Z,2024-01-15T12:00:00Z"
        );
    }

    #[test]
    fn test_periodic_interval() {
        let extent = TimeExtent::parse("2024-01-15T00:00:00Z/2024-01-15T10:00:00Z/PT3H").unwrap();
        assert!(extent.contains(&t("2024-01-15T06:00:00Z")));
        assert!(!extent.contains(&t("2024-01-15T07:00:00Z")));
        assert!(!extent.contains(&t("2024-01-15T12:00:00Z")));
        assert_eq!(extent.default_value(), t("2024-01-15T09:00:00Z"));
        assert_eq!(
            extent.to_extent_string(),
            "2024-01-15T00:00:00Z/2024-01-15T10:00:00Z/PT3H"
        );
    }

    #[test]
    fn test_inverted_interval() {
        assert!(matches!(
            TimeExtent::parse("2024-01-16/2024-01-15"),
            Err(TimeParseError::InvertedInterval { .. })
        ));
    }

    #[test]
    fn test_latest_within() {
        let periodic =
            TimeExtent::parse("2024-01-15T00:00:00Z/2024-01-15T10:00:00Z/PT3H").unwrap();
        assert_eq!(
            periodic.latest_within(&t("2024-01-15T01:00:00Z"), &t("2024-01-15T08:00:00Z")),
            Some(t("2024-01-15T06:00:00Z"))
        );
        assert_eq!(
            periodic.latest_within(&t("2024-01-15T04:00:00Z"), &t("2024-01-15T05:00:00Z")),
            None
        );

        let instants = TimeExtent::parse("2024-01-15T00:00:00Z,2024-01-15T12:00:00Z").unwrap();
        assert_eq!(
            instants.latest_within(&t("2024-01-01T00:00:00Z"), &t("2024-01-15T11:00:00Z")),
            Some(t("2024-01-15T00:00:00Z"))
        );
    }
}
