use crate::models::Employee;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical leave taxonomy. This enum is the single mapping between the
/// human-readable leave-type names on the wire and the entitlement bucket
/// keys stored on the employee record; the leave ledger and payroll both go
/// through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LeaveType {
    #[serde(rename = "Casual Leave")]
    Casual,
    #[serde(rename = "Sick Leave")]
    Sick,
    #[serde(rename = "Earned Leave")]
    Earned,
    #[serde(rename = "Maternity Leave")]
    Maternity,
    #[serde(rename = "Paternity Leave")]
    Paternity,
    #[serde(rename = "Annual Leave")]
    Annual,
    #[serde(rename = "Unpaid Leave")]
    Unpaid,
    #[serde(rename = "Compensatory Leave")]
    Compensatory,
}

impl LeaveType {
    pub const ALL: [LeaveType; 8] = [
        LeaveType::Casual,
        LeaveType::Sick,
        LeaveType::Earned,
        LeaveType::Maternity,
        LeaveType::Paternity,
        LeaveType::Annual,
        LeaveType::Unpaid,
        LeaveType::Compensatory,
    ];

    /// Human-readable name used on the wire and in stored leave requests.
    pub fn name(&self) -> &'static str {
        match self {
            LeaveType::Casual => "Casual Leave",
            LeaveType::Sick => "Sick Leave",
            LeaveType::Earned => "Earned Leave",
            LeaveType::Maternity => "Maternity Leave",
            LeaveType::Paternity => "Paternity Leave",
            LeaveType::Annual => "Annual Leave",
            LeaveType::Unpaid => "Unpaid Leave",
            LeaveType::Compensatory => "Compensatory Leave",
        }
    }

    /// Entitlement bucket key on the employee record.
    pub fn key(&self) -> &'static str {
        match self {
            LeaveType::Casual => "casual_leave",
            LeaveType::Sick => "sick_leave",
            LeaveType::Earned => "earned_leave",
            LeaveType::Maternity => "maternity_leave",
            LeaveType::Paternity => "paternity_leave",
            LeaveType::Annual => "annual_leave",
            LeaveType::Unpaid => "unpaid_leave",
            LeaveType::Compensatory => "compensatory_leave",
        }
    }

    pub fn from_name(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(value))
    }

    pub fn from_key(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.key() == value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveRequest {
    #[serde(rename = "_id")]
    pub id: String,
    pub employee_id: String,
    pub employee_name: String,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub status: LeaveStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub applied_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl LeaveRequest {
    pub fn new(
        employee: &Employee,
        leave_type: LeaveType,
        start_date: NaiveDate,
        end_date: NaiveDate,
        reason: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            employee_id: employee.employee_id.clone(),
            employee_name: employee.name.clone(),
            leave_type,
            start_date,
            end_date,
            reason,
            status: LeaveStatus::Pending,
            approved_by: None,
            applied_at: now,
            updated_at: now,
        }
    }

    /// Whole calendar days covered by the request, bounds inclusive.
    pub fn day_count(&self) -> i64 {
        inclusive_days(self.start_date, self.end_date)
    }

    /// Inclusive-inclusive interval intersection test.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && self.end_date >= start
    }
}

/// `(end - start in whole days) + 1`; non-positive when the range is inverted.
pub fn inclusive_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// Every calendar day in `[start, end]`.
pub fn span_days(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |day| *day <= end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn leave_type_round_trips_between_name_and_key() {
        for leave_type in LeaveType::ALL {
            assert_eq!(LeaveType::from_name(leave_type.name()), Some(leave_type));
            assert_eq!(LeaveType::from_key(leave_type.key()), Some(leave_type));
        }
        assert_eq!(LeaveType::from_name("casual leave"), Some(LeaveType::Casual));
        assert_eq!(LeaveType::from_name("Garden Leave"), None);
    }

    #[test]
    fn leave_type_serializes_as_display_name() {
        let value = serde_json::to_value(LeaveType::Casual).unwrap();
        assert_eq!(value, serde_json::json!("Casual Leave"));
        let parsed: LeaveType = serde_json::from_str("\"Sick Leave\"").unwrap();
        assert_eq!(parsed, LeaveType::Sick);
    }

    #[test]
    fn inclusive_day_count() {
        assert_eq!(inclusive_days(date(2024, 6, 10), date(2024, 6, 12)), 3);
        assert_eq!(inclusive_days(date(2024, 6, 11), date(2024, 6, 11)), 1);
        assert_eq!(inclusive_days(date(2024, 6, 12), date(2024, 6, 10)), -1);
    }

    #[test]
    fn span_days_covers_both_bounds() {
        let days: Vec<NaiveDate> = span_days(date(2024, 6, 10), date(2024, 6, 12)).collect();
        assert_eq!(
            days,
            vec![date(2024, 6, 10), date(2024, 6, 11), date(2024, 6, 12)]
        );
    }

    #[test]
    fn overlap_counts_inclusive_bounds() {
        let employee_stub = crate::models::Employee::new(
            "Test".into(),
            "test@example.com".into(),
            "Engineer".into(),
            crate::models::EmployeeType::OfficeStaff,
            "Engineering".into(),
            date(2020, 1, 1),
            Default::default(),
            Default::default(),
            Default::default(),
        );
        let leave = LeaveRequest::new(
            &employee_stub,
            LeaveType::Casual,
            date(2024, 6, 10),
            date(2024, 6, 12),
            "trip".into(),
        );

        assert!(leave.overlaps(date(2024, 6, 12), date(2024, 6, 14)));
        assert!(leave.overlaps(date(2024, 6, 8), date(2024, 6, 10)));
        assert!(leave.overlaps(date(2024, 6, 11), date(2024, 6, 11)));
        assert!(!leave.overlaps(date(2024, 6, 13), date(2024, 6, 14)));
        assert!(!leave.overlaps(date(2024, 6, 8), date(2024, 6, 9)));
    }
}
