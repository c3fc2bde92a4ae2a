// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Unsigned time management
#![warn(missing_docs)]

mod error;
pub use error::TimeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Time structure used everywhere.
/// milliseconds since 01/01/1970.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LensTime(u64);

impl fmt::Display for LensTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_millis())
    }
}

impl TryFrom<Duration> for LensTime {
    type Error = TimeError;

    /// Conversion from `std::time::Duration`.
    /// ```
    /// # use std::time::Duration;
    /// # use lens_time::*;
    /// let duration: Duration = Duration::from_millis(42);
    /// let time: LensTime = LensTime::from_millis(42);
    /// assert_eq!(time, LensTime::try_from(duration).unwrap());
    /// ```
    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        Ok(LensTime(
            value
                .as_millis()
                .try_into()
                .map_err(|_| TimeError::ConversionError)?,
        ))
    }
}

impl From<LensTime> for Duration {
    fn from(value: LensTime) -> Self {
        value.to_duration()
    }
}

impl FromStr for LensTime {
    type Err = crate::TimeError;

    /// Conversion from `&str`.
    ///
    /// ```
    /// # use lens_time::*;
    /// # use std::str::FromStr;
    /// let duration: &str = "42";
    /// let time: LensTime = LensTime::from_millis(42);
    ///
    /// assert_eq!(time, LensTime::from_str(duration).unwrap());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(LensTime(
            u64::from_str(s).map_err(|_| Self::Err::ConversionError)?,
        ))
    }
}

impl LensTime {
    /// Conversion from `u64`, representing timestamp in milliseconds.
    /// ```
    /// # use lens_time::*;
    /// let time: LensTime = LensTime::from_millis(42);
    /// ```
    pub const fn from_millis(value: u64) -> Self {
        LensTime(value)
    }

    /// Smallest time interval
    pub const EPSILON: LensTime = LensTime(1);

    /// Gets current UNIX timestamp (resolution: milliseconds).
    pub fn now() -> Result<Self, TimeError> {
        let now: u64 = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| TimeError::TimeOverflowError)?
            .as_millis()
            .try_into()
            .map_err(|_| TimeError::TimeOverflowError)?;
        Ok(LensTime(now))
    }

    /// Conversion to `std::time::Duration`.
    /// ```
    /// # use std::time::Duration;
    /// # use lens_time::*;
    /// let duration: Duration = Duration::from_millis(42);
    /// let time: LensTime = LensTime::from_millis(42);
    /// let res: Duration = time.to_duration();
    /// assert_eq!(res, duration);
    /// ```
    pub fn to_duration(&self) -> Duration {
        Duration::from_millis(self.0)
    }

    /// Conversion to `u64`, representing milliseconds.
    /// ```
    /// # use lens_time::*;
    /// let time: LensTime = LensTime::from_millis(42);
    /// let res: u64 = time.to_millis();
    /// assert_eq!(res, 42);
    /// ```
    pub const fn to_millis(&self) -> u64 {
        self.0
    }

    /// Estimates the `Instant` at which this timestamp occurs,
    /// relative to the current time.
    pub fn estimate_instant(self) -> Result<Instant, TimeError> {
        let (cur_timestamp, cur_instant) = (LensTime::now()?, Instant::now());
        if self >= cur_timestamp {
            cur_instant.checked_add(self.saturating_sub(cur_timestamp).to_duration())
        } else {
            cur_instant.checked_sub(cur_timestamp.saturating_sub(self).to_duration())
        }
        .ok_or(TimeError::TimeOverflowError)
    }

    /// ```
    /// # use lens_time::*;
    /// let time_1: LensTime = LensTime::from_millis(42);
    /// let time_2: LensTime = LensTime::from_millis(7);
    /// let res: LensTime = time_1.saturating_sub(time_2);
    /// assert_eq!(res, LensTime::from_millis(42-7))
    /// ```
    #[must_use]
    pub fn saturating_sub(self, t: LensTime) -> Self {
        LensTime(self.0.saturating_sub(t.0))
    }

    /// ```
    /// # use lens_time::*;
    /// let time_1: LensTime = LensTime::from_millis(42);
    /// let time_2: LensTime = LensTime::from_millis(7);
    /// let res: LensTime = time_1.saturating_add(time_2);
    /// assert_eq!(res, LensTime::from_millis(42+7))
    /// ```
    #[must_use]
    pub fn saturating_add(self, t: LensTime) -> Self {
        LensTime(self.0.saturating_add(t.0))
    }

    /// ```
    /// # use lens_time::*;
    /// let time_1: LensTime = LensTime::from_millis(42);
    /// let time_2: LensTime = LensTime::from_millis(7);
    /// let res: LensTime = time_1.checked_sub(time_2).unwrap();
    /// assert_eq!(res, LensTime::from_millis(42-7))
    /// ```
    pub fn checked_sub(self, t: LensTime) -> Result<Self, TimeError> {
        self.0
            .checked_sub(t.0)
            .ok_or_else(|| TimeError::CheckedOperationError("subtraction error".to_string()))
            .map(LensTime)
    }

    /// ```
    /// # use lens_time::*;
    /// let time_1: LensTime = LensTime::from_millis(42);
    /// let time_2: LensTime = LensTime::from_millis(7);
    /// let res: LensTime = time_1.checked_add(time_2).unwrap();
    /// assert_eq!(res, LensTime::from_millis(42+7))
    /// ```
    pub fn checked_add(self, t: LensTime) -> Result<Self, TimeError> {
        self.0
            .checked_add(t.0)
            .ok_or_else(|| TimeError::CheckedOperationError("addition error".to_string()))
            .map(LensTime)
    }

    /// ```
    /// # use lens_time::*;
    /// let time_1: LensTime = LensTime::from_millis(42);
    /// let time_2: LensTime = LensTime::from_millis(7);
    /// let res: u64 = time_1.checked_div_time(time_2).unwrap();
    /// assert_eq!(res, 42/7)
    /// ```
    pub fn checked_div_time(self, t: LensTime) -> Result<u64, TimeError> {
        self.0
            .checked_div(t.0)
            .ok_or_else(|| TimeError::CheckedOperationError("division error".to_string()))
    }

    /// ```
    /// # use lens_time::*;
    /// let time_1: LensTime = LensTime::from_millis(42);
    /// let res: LensTime = time_1.checked_div_u64(7).unwrap();
    /// assert_eq!(res, LensTime::from_millis(42/7))
    /// ```
    pub fn checked_div_u64(self, n: u64) -> Result<LensTime, TimeError> {
        self.0
            .checked_div(n)
            .ok_or_else(|| TimeError::CheckedOperationError("division error".to_string()))
            .map(LensTime)
    }

    /// ```
    /// # use lens_time::*;
    /// let time_1: LensTime = LensTime::from_millis(42);
    /// let res: LensTime = time_1.saturating_mul(7);
    /// assert_eq!(res, LensTime::from_millis(42*7))
    /// ```
    #[must_use]
    pub const fn saturating_mul(self, n: u64) -> LensTime {
        LensTime(self.0.saturating_mul(n))
    }

    /// ```
    /// # use lens_time::*;
    /// let time_1: LensTime = LensTime::from_millis(42);
    /// let res: LensTime = time_1.checked_mul(7).unwrap();
    /// assert_eq!(res, LensTime::from_millis(42*7))
    /// ```
    pub fn checked_mul(self, n: u64) -> Result<Self, TimeError> {
        self.0
            .checked_mul(n)
            .ok_or_else(|| TimeError::CheckedOperationError("multiplication error".to_string()))
            .map(LensTime)
    }

    /// ```
    /// # use lens_time::*;
    ///
    /// let time1 = LensTime::from_millis(42);
    /// let time2 = LensTime::from_millis(84);
    ///
    /// assert_eq!(time1.abs_diff(time2), LensTime::from_millis(42));
    /// assert_eq!(time2.abs_diff(time1), LensTime::from_millis(42));
    /// ```
    pub fn abs_diff(&self, t: LensTime) -> LensTime {
        LensTime(self.0.abs_diff(t.0))
    }

    /// ```
    /// # use lens_time::*;
    /// let lens_time: LensTime = LensTime::from_millis(1_640_995_200_000);
    /// assert_eq!(lens_time.format_instant(), String::from("2022-01-01T00:00:00Z"))
    /// ```
    pub fn format_instant(&self) -> String {
        let naive = OffsetDateTime::from_unix_timestamp((self.to_millis() / 1000) as i64).unwrap();
        naive.format(&Rfc3339).unwrap()
    }

    /// Parse an RFC3339 instant string into a `LensTime`.
    /// ```
    /// # use lens_time::*;
    /// let lens_time = LensTime::from_instant_str("2022-01-01T00:00:00Z").unwrap();
    /// assert_eq!(lens_time, LensTime::from_millis(1_640_995_200_000))
    /// ```
    pub fn from_instant_str(s: &str) -> Result<LensTime, TimeError> {
        let date_time = OffsetDateTime::parse(s, &Rfc3339).map_err(|_| TimeError::ConversionError)?;
        let millis: u64 = (date_time.unix_timestamp_nanos() / 1_000_000)
            .try_into()
            .map_err(|_| TimeError::ConversionError)?;
        Ok(LensTime::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_follows_millis() {
        assert!(LensTime::from_millis(1) < LensTime::from_millis(2));
        assert_eq!(
            LensTime::from_millis(5).saturating_sub(LensTime::from_millis(9)),
            LensTime::from_millis(0)
        );
    }

    #[test]
    fn test_serde_is_plain_millis() {
        let t = LensTime::from_millis(123_456);
        assert_eq!(serde_json::to_string(&t).unwrap(), "123456");
        let back: LensTime = serde_json::from_str("123456").unwrap();
        assert_eq!(back, t);
    }
}
