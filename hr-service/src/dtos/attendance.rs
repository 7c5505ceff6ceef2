use crate::models::{
    AttendanceRecord, AttendanceStatus, CheckInStatus, EmployeeSnapshot, GeoPoint, LeaveInfo,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CheckInRequest {
    /// Another employee's code; honored only for privileged callers.
    #[serde(default)]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Deserialize)]
pub struct CheckOutRequest {
    #[serde(default)]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Deserialize, Default)]
pub struct BreakRequest {
    #[serde(default)]
    pub employee_id: Option<String>,
}

/// Allow-listed manual correction; unknown fields are rejected instead of
/// merged. A supplied check-in time wins over a manual status.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateAttendanceRequest {
    pub status: Option<AttendanceStatus>,
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetCompanyTimingRequest {
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub late_after_minutes: i64,
}

#[derive(Debug, Serialize)]
pub struct CompanyTimingResponse {
    pub start_time: String,
    pub end_time: String,
    pub late_after_minutes: i64,
}

impl From<crate::models::CompanyTiming> for CompanyTimingResponse {
    fn from(timing: crate::models::CompanyTiming) -> Self {
        Self {
            start_time: timing.start_time,
            end_time: timing.end_time,
            late_after_minutes: timing.late_after_minutes,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AttendanceSearchParams {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MonthlyGraphParams {
    pub year: i32,
}

#[derive(Debug, Serialize)]
pub struct CheckEventResponse {
    pub time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Serialize)]
pub struct BreakResponse {
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct AttendanceResponse {
    pub id: String,
    pub employee: EmployeeSnapshot,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub check_in_status: CheckInStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_in: Option<CheckEventResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out: Option<CheckEventResponse>,
    #[serde(rename = "break", skip_serializing_if = "Option::is_none")]
    pub break_span: Option<BreakResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leave_info: Option<LeaveInfo>,
    pub locked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<AttendanceRecord> for AttendanceResponse {
    fn from(record: AttendanceRecord) -> Self {
        Self {
            id: record.id,
            employee: record.employee,
            date: record.date,
            status: record.status,
            check_in_status: record.check_in_status,
            check_in: record.check_in.map(|e| CheckEventResponse {
                time: e.time,
                location: e.location,
            }),
            check_out: record.check_out.map(|e| CheckEventResponse {
                time: e.time,
                location: e.location,
            }),
            break_span: record.break_span.map(|b| BreakResponse {
                start_time: b.start_time,
                end_time: b.end_time,
            }),
            leave_info: record.leave_info,
            locked: record.locked,
            reason: record.reason,
        }
    }
}

/// Today-vs-yesterday counts for one attendance status.
#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub status: AttendanceStatus,
    pub today: u64,
    pub yesterday: u64,
    pub change_pct: f64,
}

#[derive(Debug, Serialize)]
pub struct MonthlyGraphPoint {
    pub month: u32,
    pub total_employees: u64,
    pub present: u64,
}

/// Outcome of a daily-initializer run.
#[derive(Debug, Serialize)]
pub struct DailyAttendanceSummary {
    pub created: u64,
    pub skipped_on_leave: u64,
    pub notified_employees: u64,
}
