use crate::models::{Allowances, Deductions, PayrollRecord, PayrollStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct GeneratePayrollRequest {
    #[validate(length(min = 1, message = "Employee id cannot be empty"))]
    pub employee_id: String,
    #[validate(length(min = 1, message = "Month cannot be empty"))]
    pub month: String,
    #[validate(range(min = 1970, message = "Year is out of range"))]
    pub year: i32,
    #[validate(range(min = 0.0, message = "Basic salary cannot be negative"))]
    pub basic_salary: f64,
    #[serde(default)]
    pub allowances: Allowances,
    #[serde(default)]
    pub deductions: Deductions,
    #[serde(default)]
    #[validate(range(min = 0, message = "Present days cannot be negative"))]
    pub present_days: i64,
    #[serde(default)]
    #[validate(range(min = 0, message = "Approved leaves cannot be negative"))]
    pub approved_leaves: i64,
    #[serde(default)]
    #[validate(range(min = 0, message = "Total working days cannot be negative"))]
    pub total_working_days: i64,
}

/// Allow-listed partial update; derived amounts are recomputed from the
/// merged values. Approval has its own endpoint, so `payroll_status` here
/// only accepts Pending/Processed.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePayrollRequest {
    pub basic_salary: Option<f64>,
    pub allowances: Option<Allowances>,
    pub deductions: Option<Deductions>,
    pub present_days: Option<i64>,
    pub approved_leaves: Option<i64>,
    pub total_working_days: Option<i64>,
    pub payroll_status: Option<PayrollStatus>,
    #[serde(default)]
    pub regenerate_slip: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct ApprovePayrollRequest {
    #[serde(default)]
    pub approved_by: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PayrollResponse {
    pub id: String,
    pub employee_id: String,
    pub month: String,
    pub year: i32,
    pub basic_salary: f64,
    pub allowances: Allowances,
    pub deductions: Deductions,
    pub present_days: i64,
    pub approved_leaves: i64,
    pub total_working_days: i64,
    pub gross_salary: f64,
    pub net_pay: f64,
    pub payroll_status: PayrollStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    pub is_locked: bool,
    pub processed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_slip_url: Option<String>,
}

impl From<PayrollRecord> for PayrollResponse {
    fn from(payroll: PayrollRecord) -> Self {
        Self {
            id: payroll.id,
            employee_id: payroll.employee_id,
            month: payroll.month,
            year: payroll.year,
            basic_salary: payroll.basic_salary,
            allowances: payroll.allowances,
            deductions: payroll.deductions,
            present_days: payroll.present_days,
            approved_leaves: payroll.approved_leaves,
            total_working_days: payroll.total_working_days,
            gross_salary: payroll.gross_salary,
            net_pay: payroll.net_pay,
            payroll_status: payroll.payroll_status,
            approved_by: payroll.approved_by,
            is_locked: payroll.is_locked,
            processed_at: payroll.processed_at,
            salary_slip_url: payroll.salary_slip_url,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SalarySlipResponse {
    pub salary_slip_url: String,
    pub payroll: PayrollResponse,
}
