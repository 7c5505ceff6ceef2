use crate::dtos::{
    ApprovePayrollRequest, GeneratePayrollRequest, PayrollResponse, SalarySlipResponse,
    UpdatePayrollRequest,
};
use crate::models::{month_number, PayrollRecord, PayrollStatus};
use crate::services::is_duplicate_key;
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{Duration, NaiveDate, Utc};
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::FindOptions;
use service_core::error::AppError;
use validator::Validate;

#[tracing::instrument(skip(state, request))]
pub async fn generate_payroll(
    State(state): State<AppState>,
    Json(request): Json<GeneratePayrollRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let exists = state
        .db
        .payrolls()
        .find_one(
            doc! {
                "employee_id": &request.employee_id,
                "month": &request.month,
                "year": request.year,
            },
            None,
        )
        .await?;
    if exists.is_some() {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Payroll already generated for this period"
        )));
    }

    let mut payroll = PayrollRecord::new(
        request.employee_id,
        request.month,
        request.year,
        request.basic_salary,
        request.allowances,
        request.deductions,
        request.present_days,
        request.approved_leaves,
        request.total_working_days,
    );

    state
        .db
        .payrolls()
        .insert_one(&payroll, None)
        .await
        .map_err(|e| {
            // The unique (employee, month, year) index backs the pre-check
            // against concurrent generators.
            if is_duplicate_key(&e) {
                AppError::Conflict(anyhow::anyhow!("Payroll already generated for this period"))
            } else {
                AppError::from(e)
            }
        })?;

    tracing::info!(
        payroll_id = %payroll.id,
        employee_id = %payroll.employee_id,
        gross = payroll.gross_salary,
        net = payroll.net_pay,
        "Payroll generated"
    );

    // The payroll record stands on its own; a failed slip render is logged
    // and the reference stays unset until regeneration.
    match state.slips.generate(&payroll).await {
        Ok(url) => {
            state
                .db
                .payrolls()
                .update_one(
                    doc! { "_id": &payroll.id },
                    doc! { "$set": { "salary_slip_url": &url } },
                    None,
                )
                .await?;
            payroll.salary_slip_url = Some(url);
        }
        Err(e) => {
            tracing::error!(payroll_id = %payroll.id, "Salary slip generation failed: {}", e);
        }
    }

    Ok((StatusCode::CREATED, Json(PayrollResponse::from(payroll))))
}

#[tracing::instrument(skip(state, request))]
pub async fn update_payroll(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdatePayrollRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut payroll = state
        .db
        .payrolls()
        .find_one(doc! { "_id": &id }, None)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payroll not found")))?;

    if payroll.is_locked {
        return Err(AppError::Conflict(anyhow::anyhow!("Payroll is locked")));
    }

    if request.payroll_status == Some(PayrollStatus::Approved) {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Use the approve endpoint to approve payroll"
        )));
    }

    if let Some(basic_salary) = request.basic_salary {
        if basic_salary < 0.0 {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Basic salary cannot be negative"
            )));
        }
        payroll.basic_salary = basic_salary;
    }
    if let Some(allowances) = request.allowances {
        payroll.allowances = allowances;
    }
    if let Some(deductions) = request.deductions {
        payroll.deductions = deductions;
    }
    if let Some(present_days) = request.present_days {
        payroll.present_days = present_days;
    }
    if let Some(approved_leaves) = request.approved_leaves {
        payroll.approved_leaves = approved_leaves;
    }
    if let Some(total_working_days) = request.total_working_days {
        payroll.total_working_days = total_working_days;
    }
    if let Some(status) = request.payroll_status {
        payroll.payroll_status = status;
    }

    payroll.recompute();
    payroll.updated_at = Utc::now();

    state
        .db
        .payrolls()
        .replace_one(doc! { "_id": &id }, &payroll, None)
        .await?;

    if request.regenerate_slip {
        let url = state.slips.generate(&payroll).await?;
        state
            .db
            .payrolls()
            .update_one(
                doc! { "_id": &id },
                doc! { "$set": { "salary_slip_url": &url } },
                None,
            )
            .await?;
        payroll.salary_slip_url = Some(url);
    }

    Ok(Json(PayrollResponse::from(payroll)))
}

/// Approval is terminal: the payroll is locked against edits and the
/// attendance records of the covered month are locked too, since the
/// approved payroll has now consumed them.
#[tracing::instrument(skip(state, request))]
pub async fn approve_payroll(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ApprovePayrollRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut payroll = state
        .db
        .payrolls()
        .find_one(doc! { "_id": &id }, None)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payroll not found")))?;

    let now = Utc::now();
    payroll.payroll_status = PayrollStatus::Approved;
    payroll.is_locked = true;
    payroll.approved_by = request.approved_by;
    payroll.approved_at = Some(now);
    payroll.updated_at = now;

    state
        .db
        .payrolls()
        .replace_one(doc! { "_id": &id }, &payroll, None)
        .await?;

    lock_month_attendance(&state, &payroll).await?;

    tracing::info!(
        payroll_id = %payroll.id,
        employee_id = %payroll.employee_id,
        "Payroll approved and locked"
    );

    Ok(Json(PayrollResponse::from(payroll)))
}

async fn lock_month_attendance(state: &AppState, payroll: &PayrollRecord) -> Result<(), AppError> {
    let Some(month) = month_number(&payroll.month) else {
        tracing::warn!(
            payroll_id = %payroll.id,
            month = %payroll.month,
            "Unrecognized payroll month; attendance not locked"
        );
        return Ok(());
    };

    let first = NaiveDate::from_ymd_opt(payroll.year, month, 1)
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Payroll year is out of range")))?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(payroll.year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(payroll.year, month + 1, 1)
    }
    .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Payroll year is out of range")))?;
    let last = next_month - Duration::days(1);

    let result = state
        .db
        .attendance()
        .update_many(
            doc! {
                "employee.employee_id": &payroll.employee_id,
                "date": { "$gte": first.to_string(), "$lte": last.to_string() },
            },
            doc! { "$set": { "locked": true } },
            None,
        )
        .await?;

    tracing::info!(
        payroll_id = %payroll.id,
        locked = result.modified_count,
        "Attendance records locked for approved payroll"
    );

    Ok(())
}

#[tracing::instrument(skip(state))]
pub async fn generate_salary_slip(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mut payroll = state
        .db
        .payrolls()
        .find_one(doc! { "_id": &id }, None)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payroll not found")))?;

    let url = state.slips.generate(&payroll).await?;
    state
        .db
        .payrolls()
        .update_one(
            doc! { "_id": &id },
            doc! { "$set": { "salary_slip_url": &url } },
            None,
        )
        .await?;
    payroll.salary_slip_url = Some(url.clone());

    Ok(Json(SalarySlipResponse {
        salary_slip_url: url,
        payroll: PayrollResponse::from(payroll),
    }))
}

pub async fn get_all_payrolls(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let options = FindOptions::builder()
        .sort(doc! { "processed_at": -1 })
        .build();
    let payrolls: Vec<PayrollResponse> = state
        .db
        .payrolls()
        .find(doc! {}, options)
        .await?
        .map_ok(PayrollResponse::from)
        .try_collect()
        .await?;

    Ok(Json(payrolls))
}

pub async fn get_employee_payrolls(
    State(state): State<AppState>,
    Path(employee_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let options = FindOptions::builder()
        .sort(doc! { "processed_at": -1 })
        .build();
    let payrolls: Vec<PayrollResponse> = state
        .db
        .payrolls()
        .find(doc! { "employee_id": &employee_id }, options)
        .await?
        .map_ok(PayrollResponse::from)
        .try_collect()
        .await?;

    Ok(Json(payrolls))
}
