use crate::models::employee::{Employee, EmployeeType};
use crate::models::leave::LeaveType;
use crate::models::opt_chrono_datetime_as_bson_datetime;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Day-level attendance classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
    #[serde(rename = "Half-day")]
    HalfDay,
    #[serde(rename = "On Leave")]
    OnLeave,
}

impl AttendanceStatus {
    pub const ALL: [AttendanceStatus; 5] = [
        AttendanceStatus::Present,
        AttendanceStatus::Late,
        AttendanceStatus::Absent,
        AttendanceStatus::HalfDay,
        AttendanceStatus::OnLeave,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Late => "Late",
            AttendanceStatus::Absent => "Absent",
            AttendanceStatus::HalfDay => "Half-day",
            AttendanceStatus::OnLeave => "On Leave",
        }
    }
}

/// Intra-day check-in state machine position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckInStatus {
    Pending,
    CheckedIn,
    OnBreak,
    CheckedOut,
    #[serde(rename = "On Leave")]
    OnLeave,
}

impl CheckInStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckInStatus::Pending => "Pending",
            CheckInStatus::CheckedIn => "CheckedIn",
            CheckInStatus::OnBreak => "OnBreak",
            CheckInStatus::CheckedOut => "CheckedOut",
            CheckInStatus::OnLeave => "On Leave",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckEvent {
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakSpan {
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub start_time: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "opt_chrono_datetime_as_bson_datetime"
    )]
    pub end_time: Option<DateTime<Utc>>,
}

/// Point-in-time copy of employee identity taken when the record is created.
/// Later employee edits do not re-sync it; the snapshot is the audit trail of
/// who the employee was on that day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeSnapshot {
    pub id: String,
    pub employee_id: String,
    pub name: String,
    pub role: String,
    pub employee_type: EmployeeType,
}

impl From<&Employee> for EmployeeSnapshot {
    fn from(employee: &Employee) -> Self {
        Self {
            id: employee.id.clone(),
            employee_id: employee.employee_id.clone(),
            name: employee.name.clone(),
            role: employee.role.clone(),
            employee_type: employee.employee_type,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveInfo {
    pub leave_id: String,
    pub leave_type: LeaveType,
}

/// One document per (employee, UTC calendar day); the compound unique index
/// on `(employee.employee_id, date)` is what enforces that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub employee: EmployeeSnapshot,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub check_in_status: CheckInStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_in: Option<CheckEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_out: Option<CheckEvent>,
    #[serde(rename = "break", default, skip_serializing_if = "Option::is_none")]
    pub break_span: Option<BreakSpan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leave_info: Option<LeaveInfo>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl AttendanceRecord {
    /// Default record seeded by the daily initializer: no-show until proven
    /// otherwise.
    pub fn absent(employee: EmployeeSnapshot, date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            employee,
            date,
            status: AttendanceStatus::Absent,
            check_in_status: CheckInStatus::Pending,
            check_in: None,
            check_out: None,
            break_span: None,
            leave_info: None,
            locked: false,
            reason: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_names_match_stored_values() {
        assert_eq!(
            serde_json::to_value(AttendanceStatus::HalfDay).unwrap(),
            serde_json::json!("Half-day")
        );
        assert_eq!(
            serde_json::to_value(AttendanceStatus::OnLeave).unwrap(),
            serde_json::json!("On Leave")
        );
        assert_eq!(
            serde_json::to_value(CheckInStatus::CheckedIn).unwrap(),
            serde_json::json!("CheckedIn")
        );
        for status in AttendanceStatus::ALL {
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                serde_json::json!(status.as_str())
            );
        }
    }

    #[test]
    fn absent_record_starts_pending_and_unlocked() {
        let snapshot = EmployeeSnapshot {
            id: "id".into(),
            employee_id: "ENG1234ABC".into(),
            name: "Test".into(),
            role: "Engineer".into(),
            employee_type: EmployeeType::OfficeStaff,
        };
        let record = AttendanceRecord::absent(
            snapshot,
            NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
        );
        assert_eq!(record.status, AttendanceStatus::Absent);
        assert_eq!(record.check_in_status, CheckInStatus::Pending);
        assert!(!record.locked);
        assert!(record.check_in.is_none());
    }
}
