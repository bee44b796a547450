//! Day parameter parsing for dashboard URLs

use chrono::{Days, NaiveDate};

use crate::core::constants::{DAY_PATH_FORMAT, EV_DAY_FORMAT};

/// Parse a day path segment (`YYYYMMDD`)
pub fn parse_day_path(s: &str) -> Option<NaiveDate> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(s, DAY_PATH_FORMAT).ok()
}

/// Format a day as URL path segment (`YYYYMMDD`)
pub fn format_day_path(day: NaiveDate) -> String {
    day.format(DAY_PATH_FORMAT).to_string()
}

/// Format a day for display (`DD.MM.YYYY`), the same format `ev_day` accepts
pub fn format_ev_day(day: NaiveDate) -> String {
    day.format(EV_DAY_FORMAT).to_string()
}

/// Resolve the `ev_day`/`ev_offset` pair of the day picker
///
/// Without `ev_day` the result is `today` and the offset is ignored.
pub fn resolve_ev_day(
    ev_day: Option<&str>,
    offset: i64,
    today: NaiveDate,
) -> Result<NaiveDate, String> {
    let Some(raw) = ev_day.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(today);
    };
    let day = NaiveDate::parse_from_str(raw, EV_DAY_FORMAT)
        .map_err(|_| format!("Invalid day '{}'. Use DD.MM.YYYY", raw))?;

    let shifted = if offset >= 0 {
        day.checked_add_days(Days::new(offset.unsigned_abs()))
    } else {
        day.checked_sub_days(Days::new(offset.unsigned_abs()))
    };
    shifted.ok_or_else(|| format!("Day offset {} out of range", offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_day_path() {
        assert_eq!(parse_day_path("20240301"), Some(ymd(2024, 3, 1)));
        assert_eq!(parse_day_path("20240230"), None);
        assert_eq!(parse_day_path("2024-03-01"), None);
        assert_eq!(parse_day_path("2024031"), None);
        assert_eq!(parse_day_path("+2024031"), None);
    }

    #[test]
    fn test_format_day_path() {
        assert_eq!(format_day_path(ymd(2024, 3, 1)), "20240301");
        assert_eq!(format_ev_day(ymd(2024, 3, 1)), "01.03.2024");
    }

    #[test]
    fn test_resolve_ev_day_defaults_to_today() {
        let today = ymd(2024, 6, 15);
        assert_eq!(resolve_ev_day(None, 0, today), Ok(today));
        assert_eq!(resolve_ev_day(None, -3, today), Ok(today));
        assert_eq!(resolve_ev_day(Some(" "), 0, today), Ok(today));
    }

    #[test]
    fn test_resolve_ev_day_with_offset() {
        let today = ymd(2024, 6, 15);
        assert_eq!(
            resolve_ev_day(Some("01.03.2024"), 0, today),
            Ok(ymd(2024, 3, 1))
        );
        assert_eq!(
            resolve_ev_day(Some("01.03.2024"), -1, today),
            Ok(ymd(2024, 2, 29))
        );
        assert_eq!(
            resolve_ev_day(Some("31.12.2023"), 1, today),
            Ok(ymd(2024, 1, 1))
        );
    }

    #[test]
    fn test_resolve_ev_day_rejects_bad_input() {
        let today = ymd(2024, 6, 15);
        assert!(resolve_ev_day(Some("2024-03-01"), 0, today).is_err());
        assert!(resolve_ev_day(Some("31.02.2024"), 0, today).is_err());
        assert!(resolve_ev_day(Some("01.03.2024"), i64::MAX, today).is_err());
    }
}
