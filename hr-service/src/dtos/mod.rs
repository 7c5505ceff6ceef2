pub mod attendance;
pub mod employee;
pub mod leave;
pub mod payroll;

pub use attendance::{
    AttendanceResponse, AttendanceSearchParams, BreakRequest, CheckInRequest, CheckOutRequest,
    CompanyTimingResponse, DailyAttendanceSummary, MonthlyGraphParams, MonthlyGraphPoint,
    SetCompanyTimingRequest, StatusSummary, UpdateAttendanceRequest,
};
pub use employee::{
    CreateEmployeeRequest, EmployeeResponse, EmployeeSearchParams, UpdateEmployeeRequest,
};
pub use leave::{
    ApplyLeaveRequest, LeaveResponse, LeaveSearchParams, UpdateLeaveRequest,
    UpdateLeaveStatusRequest,
};
pub use payroll::{
    ApprovePayrollRequest, GeneratePayrollRequest, PayrollResponse, SalarySlipResponse,
    UpdatePayrollRequest,
};
