//! REST backend for HR operations: employee records, attendance tracking,
//! leave requests and balances, and payroll generation with salary-slip
//! documents. CRUD over MongoDB with the business rules expressed as axum
//! request handlers.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
