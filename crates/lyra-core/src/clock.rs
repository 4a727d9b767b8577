//! Time and date formatting for the desktop clock and chat bubbles.
//!
//! Output follows en-US conventions: 2-digit 12-hour times, long weekday and
//! month names. Every formatter takes the zone to render in; the default is
//! the system zone.

use chrono::{DateTime, Local, Utc};
use chrono_tz::Tz;

use crate::error::{LyraError, Result};

pub const TIME_PATTERN: &str = "%I:%M %p";
pub const DATE_PATTERN: &str = "%A, %B %-d";
pub const DATE_TIME_PATTERN: &str = "%b %-d, %I:%M %p";

/// Zone used when rendering timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeZoneSetting {
    /// The system timezone
    #[default]
    Local,
    Named(Tz),
}

impl TimeZoneSetting {
    /// Empty input selects the system zone, anything else must be an IANA name
    pub fn parse(identifier: &str) -> Result<Self> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Ok(Self::Local);
        }
        identifier
            .parse::<Tz>()
            .map(Self::Named)
            .map_err(|_| LyraError::UnknownTimezone(identifier.to_string()))
    }

    pub fn identifier(&self) -> &'static str {
        match self {
            Self::Local => "",
            Self::Named(tz) => tz.name(),
        }
    }
}

pub fn format_with(ts: DateTime<Utc>, pattern: &str, tz: TimeZoneSetting) -> String {
    match tz {
        TimeZoneSetting::Local => ts.with_timezone(&Local).format(pattern).to_string(),
        TimeZoneSetting::Named(zone) => ts.with_timezone(&zone).format(pattern).to_string(),
    }
}

/// `09:05 AM`
pub fn format_time(ts: DateTime<Utc>, tz: TimeZoneSetting) -> String {
    format_with(ts, TIME_PATTERN, tz)
}

/// `Thursday, October 15`
pub fn format_date(ts: DateTime<Utc>, tz: TimeZoneSetting) -> String {
    format_with(ts, DATE_PATTERN, tz)
}

/// `Oct 15, 09:05 AM`
pub fn format_date_time(ts: DateTime<Utc>, tz: TimeZoneSetting) -> String {
    format_with(ts, DATE_TIME_PATTERN, tz)
}

pub fn timezone_display_name(tz: TimeZoneSetting) -> String {
    match tz {
        TimeZoneSetting::Local => "Local Time".to_string(),
        TimeZoneSetting::Named(zone) => zone.name().replacen('_', " ", 1),
    }
}
