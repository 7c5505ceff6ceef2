pub mod employee_id;

pub use employee_id::CallerEmployeeId;
