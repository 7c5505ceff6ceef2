use crate::models::{LeaveRequest, LeaveStatus, LeaveType};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ApplyLeaveRequest {
    /// Defaults to the calling employee when omitted.
    #[serde(default)]
    pub employee_id: Option<String>,
    /// Human-readable name, e.g. "Casual Leave".
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLeaveStatusRequest {
    pub status: LeaveStatus,
    pub approved_by: String,
}

/// Allow-listed edit of a non-approved request; unknown fields are rejected.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateLeaveRequest {
    pub leave_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LeaveSearchParams {
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LeaveResponse {
    pub id: String,
    pub employee_id: String,
    pub employee_name: String,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub status: LeaveStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    pub applied_at: DateTime<Utc>,
}

impl From<LeaveRequest> for LeaveResponse {
    fn from(leave: LeaveRequest) -> Self {
        Self {
            id: leave.id,
            employee_id: leave.employee_id,
            employee_name: leave.employee_name,
            leave_type: leave.leave_type,
            start_date: leave.start_date,
            end_date: leave.end_date,
            reason: leave.reason,
            status: leave.status,
            approved_by: leave.approved_by,
            applied_at: leave.applied_at,
        }
    }
}
