use crate::models::leave::LeaveType;
use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmployeeType {
    Admin,
    #[serde(rename = "Office Staff")]
    OfficeStaff,
    #[serde(rename = "Field Staff")]
    FieldStaff,
    #[serde(rename = "HR")]
    Hr,
}

impl EmployeeType {
    /// Privileged callers may act on attendance records of other employees.
    pub fn is_privileged(&self) -> bool {
        matches!(self, EmployeeType::Admin | EmployeeType::Hr)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Incentive {
    #[serde(default)]
    pub flue: f64,
    #[serde(default)]
    pub medical: f64,
    #[serde(default)]
    pub others: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SalaryStructure {
    #[serde(default)]
    pub basic: f64,
    #[serde(default)]
    pub incentive: Incentive,
    #[serde(default)]
    pub deductions: f64,
    #[serde(default)]
    pub tax: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LoanPf {
    #[serde(default)]
    pub loan: f64,
    #[serde(default)]
    pub pf: f64,
}

/// One leave-type bucket on the employee record. `consumed <= total` is the
/// intended invariant but increments are applied with `$inc`, not a guarded
/// compare-and-set, so it is not enforced atomically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LeaveBalance {
    pub total: i64,
    #[serde(default)]
    pub consumed: i64,
}

impl LeaveBalance {
    pub fn available(&self) -> i64 {
        self.total - self.consumed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    #[serde(rename = "_id")]
    pub id: String,
    pub employee_id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub employee_type: EmployeeType,
    pub department: String,
    pub joining_date: NaiveDate,
    pub employee_status: String,
    #[serde(default)]
    pub fcm_tokens: Vec<String>,
    #[serde(default)]
    pub salary_structure: SalaryStructure,
    #[serde(default)]
    pub loan_pf: LoanPf,
    /// Keyed by `LeaveType::key()`.
    #[serde(default)]
    pub entitlements: BTreeMap<String, LeaveBalance>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        email: String,
        role: String,
        employee_type: EmployeeType,
        department: String,
        joining_date: NaiveDate,
        salary_structure: SalaryStructure,
        loan_pf: LoanPf,
        entitlements: BTreeMap<String, LeaveBalance>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            employee_id: generate_employee_code(&role),
            name,
            email,
            role,
            employee_type,
            department,
            joining_date,
            employee_status: "Active".to_string(),
            fcm_tokens: Vec::new(),
            salary_structure,
            loan_pf,
            entitlements,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn entitlement(&self, leave_type: LeaveType) -> Option<&LeaveBalance> {
        self.entitlements.get(leave_type.key())
    }
}

/// Employee code: three-letter role prefix, four digits, three letters.
pub fn generate_employee_code(role: &str) -> String {
    let mut rng = rand::thread_rng();

    let mut prefix: String = role
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(3)
        .collect::<String>()
        .to_ascii_uppercase();
    while prefix.len() < 3 {
        prefix.push('X');
    }

    let digits: u32 = rng.gen_range(1000..10000);
    let letters: String = (0..3).map(|_| rng.gen_range(b'A'..=b'Z') as char).collect();

    format!("{}{}{}", prefix, digits, letters)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn employee_code_has_expected_shape() {
        let code = generate_employee_code("Engineer");
        assert_eq!(code.len(), 10);
        assert_eq!(&code[..3], "ENG");
        assert!(code[3..7].chars().all(|c| c.is_ascii_digit()));
        assert!(code[7..].chars().all(|c| c.is_ascii_uppercase()));
    }

    #[test]
    fn short_roles_are_padded() {
        let code = generate_employee_code("IT");
        assert_eq!(&code[..3], "ITX");
    }

    #[test]
    fn balance_available_subtracts_consumed() {
        let balance = LeaveBalance {
            total: 10,
            consumed: 2,
        };
        assert_eq!(balance.available(), 8);
    }

    #[test]
    fn employee_type_wire_names() {
        let value = serde_json::to_value(EmployeeType::OfficeStaff).unwrap();
        assert_eq!(value, serde_json::json!("Office Staff"));
        assert!(EmployeeType::Hr.is_privileged());
        assert!(!EmployeeType::FieldStaff.is_privileged());
    }
}
