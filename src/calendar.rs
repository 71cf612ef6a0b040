use chrono::{Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

pub fn week_label(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}

/// Every date in `[start, end]`, ascending. Empty when `end < start`.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|day| *day <= end).collect()
}

pub fn parse_timezone(name: &str) -> Option<Tz> {
    name.trim().parse::<Tz>().ok()
}

/// Calendar date "now" in the given IANA zone. Unknown zones resolve as UTC.
pub fn local_today(timezone: &str) -> NaiveDate {
    match parse_timezone(timezone) {
        Some(tz) => Utc::now().with_timezone(&tz).date_naive(),
        None => {
            warn!("unknown timezone {timezone:?}, using UTC");
            Utc::now().date_naive()
        }
    }
}

/// Parses a `YYYY-MM-DD` value from a request boundary, substituting
/// `fallback` when it is absent or malformed.
pub fn parse_date_or(raw: Option<&str>, fallback: NaiveDate) -> NaiveDate {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return fallback;
    };
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => date,
        Err(err) => {
            debug!("ignoring malformed date {raw:?}: {err}");
            fallback
        }
    }
}
