//! Wall-clock helpers shared by history records and the sun schedule.

use chrono::{DateTime, Utc};

pub type Timestamp = DateTime<Utc>;

#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// How long to sleep from `now` to reach `deadline`. Zero once it has passed.
#[must_use]
pub fn until(deadline: Timestamp, now: Timestamp) -> std::time::Duration {
    (deadline - now).to_std().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn noon() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 6, 21, 12, 0, 0).unwrap()
    }

    #[test]
    fn should_not_go_backwards() {
        let first = now();
        assert!(now() >= first);
    }

    #[test]
    fn should_sleep_zero_for_deadline_in_the_past() {
        assert_eq!(until(noon() - Duration::minutes(3), noon()), std::time::Duration::ZERO);
    }

    #[test]
    fn should_sleep_until_sunset_later_today() {
        let sunset = noon() + Duration::hours(9) + Duration::minutes(30);
        assert_eq!(until(sunset, noon()).as_secs(), 9 * 3600 + 30 * 60);
    }
}
