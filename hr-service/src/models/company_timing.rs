use crate::models::attendance::AttendanceStatus;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed `_id` of the singleton timing document.
pub const COMPANY_TIMING_ID: &str = "company-timing";

/// Company-wide working hours. `start_time`/`end_time` are "HH:mm" strings;
/// `late_after_minutes` is the grace period added to the start time before a
/// check-in counts as late.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyTiming {
    #[serde(rename = "_id")]
    pub id: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub late_after_minutes: i64,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl CompanyTiming {
    pub fn new(start_time: String, end_time: String, late_after_minutes: i64) -> Self {
        Self {
            id: COMPANY_TIMING_ID.to_string(),
            start_time,
            end_time,
            late_after_minutes,
            updated_at: Utc::now(),
        }
    }

    pub fn parse_hhmm(value: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
    }

    /// `day@start_time + late_after_minutes` in UTC; `None` when the stored
    /// start time does not parse.
    pub fn late_threshold(&self, day: NaiveDate) -> Option<DateTime<Utc>> {
        let start = Self::parse_hhmm(&self.start_time)?;
        Some(day.and_time(start).and_utc() + Duration::minutes(self.late_after_minutes))
    }

    /// Late strictly after the threshold, Present at or before it.
    pub fn classify(&self, day: NaiveDate, instant: DateTime<Utc>) -> Option<AttendanceStatus> {
        let threshold = self.late_threshold(day)?;
        Some(if instant > threshold {
            AttendanceStatus::Late
        } else {
            AttendanceStatus::Present
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing() -> CompanyTiming {
        CompanyTiming::new("09:00".into(), "18:00".into(), 15)
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2024, 6, 10)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn check_in_after_grace_is_late() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        assert_eq!(timing().classify(day, at(9, 20)), Some(AttendanceStatus::Late));
    }

    #[test]
    fn check_in_within_grace_is_present() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        assert_eq!(
            timing().classify(day, at(9, 10)),
            Some(AttendanceStatus::Present)
        );
        // Exactly at the threshold still counts as present.
        assert_eq!(
            timing().classify(day, at(9, 15)),
            Some(AttendanceStatus::Present)
        );
    }

    #[test]
    fn unparsable_start_time_yields_none() {
        let broken = CompanyTiming::new("9 am".into(), "18:00".into(), 15);
        let day = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        assert_eq!(broken.classify(day, at(9, 0)), None);
    }
}
