//! Sunrise and sunset times for a geographic coordinate.
//!
//! Uses the almanac algorithm published by the US Naval Observatory
//! ("Almanac for Computers", 1990) with the official zenith of 90°50′.
//! Accuracy is within a couple of minutes for non-polar latitudes,
//! which is plenty for lighting automations.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::HubError;
use crate::time::Timestamp;
use crate::trigger::SolarEvent;

/// Official zenith for sunrise/sunset, in degrees.
pub const OFFICIAL_ZENITH: f64 = 90.833_3;

/// How many days ahead [`SunCalculator::next_event`] looks before giving up.
const SEARCH_DAYS: usize = 370;

/// A point on earth, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// # Errors
    ///
    /// Returns [`HubError::InvalidValue`] when either angle is out of range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, HubError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(HubError::invalid_value(
                latitude.to_string(),
                "latitude must be within -90..=90",
            ));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(HubError::invalid_value(
                longitude.to_string(),
                "longitude must be within -180..=180",
            ));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Parse a coordinate from two setting strings.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidValue`] when a part is not a number or out of range.
    pub fn parse(latitude: &str, longitude: &str) -> Result<Self, HubError> {
        let lat = latitude
            .trim()
            .parse::<f64>()
            .map_err(|_| HubError::invalid_value(latitude, "latitude is not a number"))?;
        let lng = longitude
            .trim()
            .parse::<f64>()
            .map_err(|_| HubError::invalid_value(longitude, "longitude is not a number"))?;
        Self::new(lat, lng)
    }

    /// Longitude expressed in hours east of Greenwich.
    fn longitude_hours(self) -> f64 {
        self.longitude / 15.0
    }
}

/// Next solar event after some instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolarTime {
    pub event: SolarEvent,
    pub at: Timestamp,
}

/// Computes sunrise and sunset for one coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunCalculator {
    coordinate: Coordinate,
    zenith: f64,
}

impl SunCalculator {
    #[must_use]
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            zenith: OFFICIAL_ZENITH,
        }
    }

    #[must_use]
    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    /// Instant of `event` on the local solar day `date`.
    ///
    /// Returns `None` when the sun does not cross the horizon that day
    /// (polar day or polar night).
    #[must_use]
    pub fn event_time(&self, date: NaiveDate, event: SolarEvent) -> Option<Timestamp> {
        let ut = self.universal_hours(date, event)?;
        let midnight = date.and_hms_opt(0, 0, 0)?.and_utc();
        #[allow(clippy::cast_possible_truncation)]
        let millis = (ut * 3_600_000.0).round() as i64;
        Some(midnight + chrono::Duration::milliseconds(millis))
    }

    #[must_use]
    pub fn sunrise(&self, date: NaiveDate) -> Option<Timestamp> {
        self.event_time(date, SolarEvent::Sunrise)
    }

    #[must_use]
    pub fn sunset(&self, date: NaiveDate) -> Option<Timestamp> {
        self.event_time(date, SolarEvent::Sunset)
    }

    /// First sunrise or sunset strictly after `now`.
    ///
    /// An event exactly at `now` counts as already past, so calling this
    /// with the instant an event fired yields the following one.
    #[must_use]
    pub fn next_event(&self, now: Timestamp) -> Option<SolarTime> {
        let shifted = now + chrono::Duration::minutes(solar_offset_minutes(self.coordinate));
        let start = shifted.date_naive().pred_opt()?;
        start.iter_days().take(SEARCH_DAYS).find_map(|date| {
            [SolarEvent::Sunrise, SolarEvent::Sunset]
                .into_iter()
                .filter_map(|event| {
                    self.event_time(date, event)
                        .map(|at| SolarTime { event, at })
                })
                .find(|candidate| candidate.at > now)
        })
    }

    /// Event time in fractional UTC hours relative to midnight of `date`,
    /// kept within twelve hours of local solar noon.
    fn universal_hours(&self, date: NaiveDate, event: SolarEvent) -> Option<f64> {
        let lng_hour = self.coordinate.longitude_hours();
        let day_of_year = f64::from(date.ordinal());
        let approx = match event {
            SolarEvent::Sunrise => day_of_year + (6.0 - lng_hour) / 24.0,
            SolarEvent::Sunset => day_of_year + (18.0 - lng_hour) / 24.0,
        };

        let mean_anomaly = 0.9856 * approx - 3.289;
        let true_longitude = normalize(
            mean_anomaly
                + 1.916 * sin_deg(mean_anomaly)
                + 0.020 * sin_deg(2.0 * mean_anomaly)
                + 282.634,
            360.0,
        );

        let mut right_ascension = normalize(atan_deg(0.91764 * tan_deg(true_longitude)), 360.0);
        let l_quadrant = (true_longitude / 90.0).floor() * 90.0;
        let ra_quadrant = (right_ascension / 90.0).floor() * 90.0;
        right_ascension = (right_ascension + l_quadrant - ra_quadrant) / 15.0;

        let sin_dec = 0.39782 * sin_deg(true_longitude);
        let cos_dec = sin_dec.asin().cos();
        let cos_hour = (cos_deg(self.zenith) - sin_dec * sin_deg(self.coordinate.latitude))
            / (cos_dec * cos_deg(self.coordinate.latitude));
        if !(-1.0..=1.0).contains(&cos_hour) {
            return None;
        }

        let hour_angle = match event {
            SolarEvent::Sunrise => 360.0 - cos_hour.acos().to_degrees(),
            SolarEvent::Sunset => cos_hour.acos().to_degrees(),
        } / 15.0;

        let local_mean = hour_angle + right_ascension - 0.06571 * approx - 6.622;
        let mut ut = normalize(local_mean - lng_hour, 24.0);

        let solar_noon = 12.0 - lng_hour;
        if ut - solar_noon > 12.0 {
            ut -= 24.0;
        } else if ut - solar_noon < -12.0 {
            ut += 24.0;
        }
        Some(ut)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn solar_offset_minutes(coordinate: Coordinate) -> i64 {
    (coordinate.longitude_hours() * 60.0).round() as i64
}

fn normalize(value: f64, modulus: f64) -> f64 {
    value.rem_euclid(modulus)
}

fn sin_deg(deg: f64) -> f64 {
    deg.to_radians().sin()
}

fn cos_deg(deg: f64) -> f64 {
    deg.to_radians().cos()
}

fn tan_deg(deg: f64) -> f64 {
    deg.to_radians().tan()
}

fn atan_deg(x: f64) -> f64 {
    x.atan().to_degrees()
}
