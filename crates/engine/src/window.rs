//! Business-hours classification.

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

pub const BUSINESS_START_HOUR: u32 = 9;
pub const BUSINESS_END_HOUR: u32 = 18;

/// Local-hour window `[start, end)` during which human agents are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessHours {
    pub start: u32,
    pub end: u32,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            start: BUSINESS_START_HOUR,
            end: BUSINESS_END_HOUR,
        }
    }
}

impl BusinessHours {
    pub fn contains(&self, hour: u32) -> bool {
        self.start <= hour && hour < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowClassification {
    pub is_business_window: bool,
    pub local_hour: u32,
    /// Name of the zone actually used; "UTC" when the requested one was unknown.
    pub resolved_timezone: String,
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// IANA lookup; an exact match wins, otherwise names match ignoring case.
pub fn resolve_timezone(name: &str) -> Option<Tz> {
    let name = name.trim();
    name.parse::<Tz>()
        .ok()
        .or_else(|| Tz::from_str_insensitive(name).ok())
}

pub fn classify_window(
    now: DateTime<Utc>,
    timezone: &str,
    hours: BusinessHours,
) -> WindowClassification {
    let (local_hour, resolved_timezone) = match resolve_timezone(timezone) {
        Some(tz) => (now.with_timezone(&tz).hour(), tz.name().to_string()),
        None => {
            tracing::warn!(timezone, "unknown timezone, classifying in UTC");
            (now.hour(), "UTC".to_string())
        }
    };
    WindowClassification {
        is_business_window: hours.contains(local_hour),
        local_hour,
        resolved_timezone,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, h, m, 0).unwrap()
    }

    fn is_open(now: DateTime<Utc>, tz: &str) -> bool {
        classify_window(now, tz, BusinessHours::default()).is_business_window
    }

    #[test]
    fn half_open_boundaries() {
        assert!(is_open(utc(9, 0), "UTC"));
        assert!(is_open(utc(17, 59), "UTC"));
        assert!(!is_open(utc(18, 0), "UTC"));
        assert!(!is_open(utc(8, 59), "UTC"));
    }

    #[test]
    fn converts_to_local_civil_hour() {
        // 14:00 UTC is 09:00 in New York during January (EST, UTC-5).
        let c = classify_window(utc(14, 0), "America/New_York", BusinessHours::default());
        assert_eq!(c.local_hour, 9);
        assert!(c.is_business_window);
        assert_eq!(c.resolved_timezone, "America/New_York");

        // 08:30 UTC is 17:30 in Tokyo.
        assert!(is_open(utc(8, 30), "Asia/Tokyo"));
        // 09:00 UTC is 18:00 in Tokyo.
        assert!(!is_open(utc(9, 0), "Asia/Tokyo"));
    }

    #[test]
    fn timezone_names_ignore_case() {
        // 10:00 UTC is 19:00 in Tokyo.
        let c = classify_window(utc(10, 0), "asia/tokyo", BusinessHours::default());
        assert_eq!(c.resolved_timezone, "Asia/Tokyo");
        assert_eq!(c.local_hour, 19);
        assert!(!c.is_business_window);
        assert_eq!(resolve_timezone(" AMERICA/NEW_YORK "), Some(Tz::America__New_York));
    }

    #[test]
    fn unknown_timezone_falls_back_to_utc() {
        let c = classify_window(utc(10, 0), "Mars/Olympus_Mons", BusinessHours::default());
        assert_eq!(c.resolved_timezone, "UTC");
        assert_eq!(c.local_hour, 10);
        assert!(c.is_business_window);

        assert!(!is_open(utc(20, 0), ""));
    }

    #[test]
    fn custom_window() {
        let hours = BusinessHours { start: 0, end: 1 };
        assert!(classify_window(utc(0, 30), "UTC", hours).is_business_window);
        assert!(!classify_window(utc(1, 0), "UTC", hours).is_business_window);
    }

    proptest! {
        #[test]
        fn utc_classification_matches_hour(h in 0u32..24, m in 0u32..60) {
            let c = classify_window(utc(h, m), "UTC", BusinessHours::default());
            prop_assert_eq!(c.local_hour, h);
            prop_assert_eq!(c.is_business_window, (9..18).contains(&h));
        }
    }
}
