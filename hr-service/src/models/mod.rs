pub mod attendance;
pub mod company_timing;
pub mod employee;
pub mod leave;
pub mod payroll;

pub use attendance::{
    AttendanceRecord, AttendanceStatus, BreakSpan, CheckEvent, CheckInStatus, EmployeeSnapshot,
    GeoPoint, LeaveInfo,
};
pub use company_timing::{CompanyTiming, COMPANY_TIMING_ID};
pub use employee::{Employee, EmployeeType, LeaveBalance, LoanPf, SalaryStructure};
pub use leave::{inclusive_days, span_days, LeaveRequest, LeaveStatus, LeaveType};
pub use payroll::{month_number, Allowances, Deductions, PayrollRecord, PayrollStatus};

use chrono::{NaiveDate, Utc};

/// Calendar-day key used for attendance bucketing and leave spans (UTC).
pub fn utc_today() -> NaiveDate {
    Utc::now().date_naive()
}

// Helper module for optional DateTime<Utc> as BSON DateTime
pub(crate) mod opt_chrono_datetime_as_bson_datetime {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::{self, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(dt) => {
                let bson_dt = bson::DateTime::from_chrono(*dt);
                bson_dt.serialize(serializer)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<bson::DateTime> = Option::deserialize(deserializer)?;
        Ok(opt.map(|dt| dt.to_chrono()))
    }
}
