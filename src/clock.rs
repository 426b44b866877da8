//! Calendar helpers: the injected "today" provider and `YYYY-MM-DD` parsing.

use time::{format_description::FormatItem, macros::format_description, Date, OffsetDateTime};

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Source of the current calendar date. Handlers never read the system time
/// directly so default dates and date windows stay deterministic under test.
pub trait Clock: Send + Sync {
    fn today(&self) -> Date;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> Date {
        OffsetDateTime::now_utc().date()
    }
}

/// Clock pinned to one date.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Date);

#[cfg(test)]
impl Clock for FixedClock {
    fn today(&self) -> Date {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DateError {
    #[error("Invalid date format. Use the format YYYY-MM-DD.")]
    Malformed,
    #[error("The date provided does not exist. Please provide a valid date.")]
    Nonexistent,
}

/// Parse a `YYYY-MM-DD` date. Text that matches the shape but names no real
/// day (February 30th) is reported separately from malformed text.
pub fn parse_date(raw: &str) -> Result<Date, DateError> {
    use time::error::{Parse, TryFromParsed};

    match Date::parse(raw.trim(), DATE_FORMAT) {
        Ok(date) => Ok(date),
        Err(Parse::TryFromParsed(TryFromParsed::ComponentRange(_))) => Err(DateError::Nonexistent),
        Err(_) => Err(DateError::Malformed),
    }
}

/// Serialize a [`Date`] as `YYYY-MM-DD`.
pub mod iso_date {
    use serde::Serializer;
    use time::Date;

    pub fn serialize<S: Serializer>(date: &Date, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(date)
    }

    pub mod option {
        use serde::Serializer;
        use time::Date;

        pub fn serialize<S: Serializer>(date: &Option<Date>, s: S) -> Result<S::Ok, S::Error> {
            match date {
                Some(d) => s.collect_str(d),
                None => s.serialize_none(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn parses_iso_dates() {
        assert_eq!(parse_date("2024-02-29"), Ok(date!(2024 - 02 - 29)));
        assert_eq!(parse_date(" 2000-01-01 "), Ok(date!(2000 - 01 - 01)));
    }

    #[test]
    fn impossible_day_is_nonexistent() {
        assert_eq!(parse_date("2023-02-30"), Err(DateError::Nonexistent));
        assert_eq!(parse_date("2023-02-29"), Err(DateError::Nonexistent));
    }

    #[test]
    fn wrong_shape_is_malformed() {
        assert_eq!(parse_date("2023/12/31"), Err(DateError::Malformed));
        assert_eq!(parse_date("yesterday"), Err(DateError::Malformed));
        assert_eq!(parse_date(""), Err(DateError::Malformed));
    }

    #[test]
    fn fixed_clock_reports_its_date() {
        let clock = FixedClock(date!(2024 - 06 - 01));
        assert_eq!(clock.today(), date!(2024 - 06 - 01));
    }

    #[test]
    fn iso_date_serializes_as_string() {
        #[derive(serde::Serialize)]
        struct Row {
            #[serde(with = "iso_date")]
            day: Date,
        }
        let json = serde_json::to_string(&Row { day: date!(2024 - 01 - 05) }).unwrap();
        assert_eq!(json, r#"{"day":"2024-01-05"}"#);
    }
}
