use crate::models::opt_chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Allowances {
    #[serde(default)]
    pub medical: f64,
    #[serde(default)]
    pub transport: f64,
    #[serde(default)]
    pub others: f64,
}

impl Allowances {
    pub fn total(&self) -> f64 {
        self.medical + self.transport + self.others
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Deductions {
    #[serde(default)]
    pub pf: f64,
    #[serde(default)]
    pub loan: f64,
    #[serde(default)]
    pub advance_salary: f64,
    #[serde(default)]
    pub tax: f64,
    #[serde(default)]
    pub others: f64,
}

impl Deductions {
    pub fn total(&self) -> f64 {
        self.pf + self.loan + self.advance_salary + self.tax + self.others
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayrollStatus {
    Pending,
    Processed,
    Approved,
}

/// One document per (employee, month, year); the compound unique index
/// enforces it. Once approved the record is locked and read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayrollRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub employee_id: String,
    pub month: String,
    pub year: i32,
    pub basic_salary: f64,
    #[serde(default)]
    pub allowances: Allowances,
    #[serde(default)]
    pub deductions: Deductions,
    #[serde(default)]
    pub present_days: i64,
    #[serde(default)]
    pub approved_leaves: i64,
    #[serde(default)]
    pub total_working_days: i64,
    pub gross_salary: f64,
    pub net_pay: f64,
    pub payroll_status: PayrollStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub processed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_slip_url: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "opt_chrono_datetime_as_bson_datetime"
    )]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl PayrollRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        employee_id: String,
        month: String,
        year: i32,
        basic_salary: f64,
        allowances: Allowances,
        deductions: Deductions,
        present_days: i64,
        approved_leaves: i64,
        total_working_days: i64,
    ) -> Self {
        let now = Utc::now();
        let mut record = Self {
            id: Uuid::new_v4().to_string(),
            employee_id,
            month,
            year,
            basic_salary,
            allowances,
            deductions,
            present_days,
            approved_leaves,
            total_working_days,
            gross_salary: 0.0,
            net_pay: 0.0,
            payroll_status: PayrollStatus::Pending,
            approved_by: None,
            is_locked: false,
            processed_at: now,
            salary_slip_url: None,
            approved_at: None,
            updated_at: now,
        };
        record.recompute();
        record
    }

    /// Recomputes the derived amounts from the current inputs.
    pub fn recompute(&mut self) {
        self.gross_salary = self.basic_salary + self.allowances.total();
        self.net_pay = self.gross_salary - self.deductions.total();
    }
}

/// Month-name lookup for the attendance-locking pass on approval. Payroll
/// months are stored as names ("June"), attendance dates as calendar days.
pub fn month_number(name: &str) -> Option<u32> {
    match name.trim().to_ascii_lowercase().as_str() {
        "january" | "jan" => Some(1),
        "february" | "feb" => Some(2),
        "march" | "mar" => Some(3),
        "april" | "apr" => Some(4),
        "may" => Some(5),
        "june" | "jun" => Some(6),
        "july" | "jul" => Some(7),
        "august" | "aug" => Some(8),
        "september" | "sep" => Some(9),
        "october" | "oct" => Some(10),
        "november" | "nov" => Some(11),
        "december" | "dec" => Some(12),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gross_and_net_follow_the_formula() {
        let record = PayrollRecord::new(
            "ENG1234ABC".into(),
            "June".into(),
            2024,
            50_000.0,
            Allowances {
                medical: 2_000.0,
                transport: 1_000.0,
                others: 0.0,
            },
            Deductions {
                pf: 500.0,
                loan: 0.0,
                advance_salary: 0.0,
                tax: 1_000.0,
                others: 0.0,
            },
            20,
            2,
            22,
        );

        assert_eq!(record.gross_salary, 53_000.0);
        assert_eq!(record.net_pay, 51_500.0);
        assert_eq!(record.payroll_status, PayrollStatus::Pending);
        assert!(!record.is_locked);
    }

    #[test]
    fn recompute_reflects_updated_inputs() {
        let mut record = PayrollRecord::new(
            "ENG1234ABC".into(),
            "June".into(),
            2024,
            10_000.0,
            Allowances::default(),
            Deductions::default(),
            0,
            0,
            0,
        );
        record.deductions.tax = 750.0;
        record.allowances.medical = 250.0;
        record.recompute();

        assert_eq!(record.gross_salary, 10_250.0);
        assert_eq!(record.net_pay, 9_500.0);
    }

    #[test]
    fn month_names_resolve_to_numbers() {
        assert_eq!(month_number("June"), Some(6));
        assert_eq!(month_number("december"), Some(12));
        assert_eq!(month_number(" Feb "), Some(2));
        assert_eq!(month_number("Brumaire"), None);
    }
}
