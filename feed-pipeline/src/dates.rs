use crate::types::{PipelineError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// One accepted publish-date shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateLayout {
    Rfc2822,
    Rfc3339,
    /// `strftime` pattern that carries its own offset (`%z`).
    WithOffset(&'static str),
    /// `strftime` pattern without an offset, read as UTC.
    NaiveUtc(&'static str),
    /// Date-only `strftime` pattern, read as midnight UTC.
    DateOnly(&'static str),
}

impl DateLayout {
    pub fn parse(&self, value: &str) -> Option<DateTime<Utc>> {
        match self {
            DateLayout::Rfc2822 => DateTime::parse_from_rfc2822(value)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            DateLayout::Rfc3339 => DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            DateLayout::WithOffset(pattern) => DateTime::parse_from_str(value, pattern)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            DateLayout::NaiveUtc(pattern) => NaiveDateTime::parse_from_str(value, pattern)
                .ok()
                .map(|naive| Utc.from_utc_datetime(&naive)),
            DateLayout::DateOnly(pattern) => NaiveDate::parse_from_str(value, pattern)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive)),
        }
    }
}

/// First layout that accepts `value` wins.
pub fn parse_with_layouts(value: &str, layouts: &[DateLayout]) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();
    if !trimmed.is_empty() {
        for layout in layouts {
            if let Some(parsed) = layout.parse(trimmed) {
                return Ok(parsed);
            }
        }
    }
    Err(PipelineError::DateParse {
        value: value.to_string(),
    })
}
