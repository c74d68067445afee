//! Standard 5-field cron expression parser and next-run computation
//! (spec §4.L). Supports ranges (`1-5`), lists (`1,3,5`), step values
//! (`*/15`, `1-30/5`), and classical day-of-month/day-of-week OR
//! semantics: when both fields are restricted (not `*`), a candidate
//! matches if it satisfies *either* one.

use chrono::{Datelike, TimeZone, Timelike, Utc};
use thiserror::Error;

/// Why a cron expression could not be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CronError {
    #[error("expected 5 whitespace-separated fields, got {0}")]
    WrongFieldCount(usize),
    #[error("invalid {field} field {value:?}: {reason}")]
    InvalidField { field: &'static str, value: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldSpec {
    /// `None` means unrestricted (the field was `*`).
    values: Option<Vec<u32>>,
}

impl FieldSpec {
    fn matches(&self, candidate: u32) -> bool {
        match &self.values {
            None => true,
            Some(values) => values.contains(&candidate),
        }
    }

    fn is_wildcard(&self) -> bool {
        self.values.is_none()
    }

    fn parse(raw: &str, field: &'static str, min: u32, max: u32) -> Result<Self, CronError> {
        if raw == "*" {
            return Ok(Self { values: None });
        }

        let mut values = Vec::new();
        for part in raw.split(',') {
            values.extend(Self::parse_part(part, field, min, max)?);
        }
        values.sort_unstable();
        values.dedup();
        Ok(Self { values: Some(values) })
    }

    fn parse_part(part: &str, field: &'static str, min: u32, max: u32) -> Result<Vec<u32>, CronError> {
        let invalid = |reason: String| CronError::InvalidField { field, value: part.to_string(), reason };

        let (range_part, step) = match part.split_once('/') {
            Some((range_part, step_str)) => {
                let step: u32 = step_str.parse().map_err(|_| invalid("bad step value".to_string()))?;
                if step == 0 {
                    return Err(invalid("step cannot be zero".to_string()));
                }
                (range_part, step)
            }
            None => (part, 1),
        };

        let (start, end) = if range_part == "*" {
            (min, max)
        } else if let Some((lo, hi)) = range_part.split_once('-') {
            let lo: u32 = lo.parse().map_err(|_| invalid("bad range start".to_string()))?;
            let hi: u32 = hi.parse().map_err(|_| invalid("bad range end".to_string()))?;
            (lo, hi)
        } else {
            let single: u32 = range_part.parse().map_err(|_| invalid("not a number".to_string()))?;
            (single, single)
        };

        if start < min || end > max || start > end {
            return Err(invalid(format!("out of range {min}-{max}")));
        }

        Ok((start..=end).step_by(step as usize).collect())
    }
}

/// A parsed 5-field cron expression: minute, hour, day-of-month, month,
/// day-of-week (0 = Sunday, matching classical cron).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    minute: FieldSpec,
    hour: FieldSpec,
    day_of_month: FieldSpec,
    month: FieldSpec,
    day_of_week: FieldSpec,
}

impl CronSchedule {
    /// Parse a standard 5-field expression.
    ///
    /// # Errors
    ///
    /// Returns [`CronError`] if the field count or any field is malformed.
    pub fn parse(expression: &str) -> Result<Self, CronError> {
        let fields: Vec<&str> = expression.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(CronError::WrongFieldCount(fields.len()));
        }
        Ok(Self {
            minute: FieldSpec::parse(fields[0], "minute", 0, 59)?,
            hour: FieldSpec::parse(fields[1], "hour", 0, 23)?,
            day_of_month: FieldSpec::parse(fields[2], "day_of_month", 1, 31)?,
            month: FieldSpec::parse(fields[3], "month", 1, 12)?,
            day_of_week: FieldSpec::parse(fields[4], "day_of_week", 0, 7)?,
        })
    }

    fn matches_day(&self, date: chrono::NaiveDate) -> bool {
        let dom_restricted = !self.day_of_month.is_wildcard();
        let dow_restricted = !self.day_of_week.is_wildcard();

        let dom_ok = self.day_of_month.matches(date.day());
        // chrono's Weekday::num_days_from_sunday already gives 0=Sunday; also
        // fold 7 onto 0 so both classical conventions for Sunday match.
        let dow_value = date.weekday().num_days_from_sunday();
        let dow_ok = self.day_of_week.matches(dow_value) || self.day_of_week.matches(if dow_value == 0 { 7 } else { dow_value });

        match (dom_restricted, dow_restricted) {
            (true, true) => dom_ok || dow_ok,
            (true, false) => dom_ok,
            (false, true) => dow_ok,
            (false, false) => true,
        }
    }

    /// Find the next minute-aligned instant strictly after `from` that
    /// satisfies every field, searching up to two years ahead.
    #[must_use]
    pub fn next_after(&self, from: chrono::DateTime<Utc>) -> Option<chrono::DateTime<Utc>> {
        let mut candidate = (from + chrono::Duration::minutes(1))
            .with_second(0)
            .and_then(|dt| dt.with_nanosecond(0))?;
        let limit = from + chrono::Duration::days(366 * 2);

        while candidate <= limit {
            let month_ok = self.month.matches(candidate.month());
            if !month_ok {
                candidate = next_month_start(candidate)?;
                continue;
            }
            if !self.matches_day(candidate.date_naive()) {
                candidate = (candidate + chrono::Duration::days(1))
                    .date_naive()
                    .and_hms_opt(0, 0, 0)?
                    .and_utc();
                continue;
            }
            if !self.hour.matches(candidate.hour()) {
                candidate = candidate
                    .date_naive()
                    .and_hms_opt(candidate.hour(), 0, 0)?
                    .and_utc()
                    + chrono::Duration::hours(1);
                continue;
            }
            if !self.minute.matches(candidate.minute()) {
                candidate += chrono::Duration::minutes(1);
                continue;
            }
            return Some(candidate);
        }
        None
    }
}

fn next_month_start(from: chrono::DateTime<Utc>) -> Option<chrono::DateTime<Utc>> {
    let (year, month) = if from.month() == 12 { (from.year() + 1, 1) } else { (from.year(), from.month() + 1) };
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()
}
