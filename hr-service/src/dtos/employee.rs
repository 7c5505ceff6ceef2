use crate::models::{
    Employee, EmployeeType, LeaveBalance, LoanPf, SalaryStructure,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEmployeeRequest {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Role cannot be empty"))]
    pub role: String,
    pub employee_type: EmployeeType,
    #[validate(length(min = 1, message = "Department cannot be empty"))]
    pub department: String,
    pub joining_date: NaiveDate,
    #[serde(default)]
    pub employee_status: Option<String>,
    #[serde(default)]
    pub fcm_tokens: Vec<String>,
    #[serde(default)]
    pub salary_structure: SalaryStructure,
    #[serde(default)]
    pub loan_pf: LoanPf,
    /// Keyed by entitlement bucket key, e.g. `casual_leave`.
    #[serde(default)]
    pub entitlements: BTreeMap<String, LeaveBalance>,
}

/// Allow-listed employee update; unknown fields are rejected rather than
/// merged. Entitlement edits only touch totals, never `consumed`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateEmployeeRequest {
    pub name: Option<String>,
    pub role: Option<String>,
    pub department: Option<String>,
    pub employee_status: Option<String>,
    pub fcm_tokens: Option<Vec<String>>,
    pub salary_structure: Option<SalaryStructure>,
    pub loan_pf: Option<LoanPf>,
    pub entitlement_totals: Option<BTreeMap<String, i64>>,
}

#[derive(Debug, Deserialize)]
pub struct EmployeeSearchParams {
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EmployeeResponse {
    pub id: String,
    pub employee_id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub employee_type: EmployeeType,
    pub department: String,
    pub joining_date: NaiveDate,
    pub employee_status: String,
    pub fcm_tokens: Vec<String>,
    pub salary_structure: SalaryStructure,
    pub loan_pf: LoanPf,
    pub entitlements: BTreeMap<String, LeaveBalance>,
    pub created_at: DateTime<Utc>,
}

impl From<Employee> for EmployeeResponse {
    fn from(employee: Employee) -> Self {
        Self {
            id: employee.id,
            employee_id: employee.employee_id,
            name: employee.name,
            email: employee.email,
            role: employee.role,
            employee_type: employee.employee_type,
            department: employee.department,
            joining_date: employee.joining_date,
            employee_status: employee.employee_status,
            fcm_tokens: employee.fcm_tokens,
            salary_structure: employee.salary_structure,
            loan_pf: employee.loan_pf,
            entitlements: employee.entitlements,
            created_at: employee.created_at,
        }
    }
}
