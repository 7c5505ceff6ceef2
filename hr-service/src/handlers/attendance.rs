use crate::dtos::{
    AttendanceResponse, AttendanceSearchParams, BreakRequest, CheckInRequest, CheckOutRequest,
    CompanyTimingResponse, DailyAttendanceSummary, MonthlyGraphParams, MonthlyGraphPoint,
    SetCompanyTimingRequest, StatusSummary, UpdateAttendanceRequest,
};
use crate::middleware::CallerEmployeeId;
use crate::models::{
    utc_today, AttendanceRecord, AttendanceStatus, BreakSpan, CheckEvent, CheckInStatus,
    CompanyTiming, Employee, EmployeeSnapshot, COMPANY_TIMING_ID,
};
use crate::services::is_duplicate_key;
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{Duration, NaiveDate, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, DateTime as BsonDateTime};
use mongodb::options::{FindOptions, UpdateOptions};
use service_core::error::AppError;
use uuid::Uuid;

/// Resolves which employee an attendance action applies to. Privileged
/// callers (Admin/HR) may act on another employee by supplying that
/// employee's code; everyone else always acts on themselves.
async fn resolve_target(
    state: &AppState,
    caller: &CallerEmployeeId,
    requested: Option<&String>,
) -> Result<Employee, AppError> {
    let caller_employee = state
        .db
        .find_employee_by_code(&caller.0)
        .await?
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Unknown caller")))?;

    match requested {
        Some(code)
            if *code != caller_employee.employee_id
                && caller_employee.employee_type.is_privileged() =>
        {
            state
                .db
                .find_employee_by_code(code)
                .await?
                .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Employee not found")))
        }
        _ => Ok(caller_employee),
    }
}

async fn find_today_record(
    state: &AppState,
    employee_code: &str,
) -> Result<Option<AttendanceRecord>, AppError> {
    state
        .db
        .attendance()
        .find_one(
            doc! {
                "employee.employee_id": employee_code,
                "date": utc_today().to_string(),
            },
            None,
        )
        .await
        .map_err(AppError::from)
}

async fn load_company_timing(state: &AppState) -> Result<CompanyTiming, AppError> {
    state
        .db
        .company_timing()
        .find_one(doc! { "_id": COMPANY_TIMING_ID }, None)
        .await?
        .ok_or_else(|| {
            AppError::ConfigurationMissing(anyhow::anyhow!("Company timing is not configured"))
        })
}

#[tracing::instrument(skip(state, request))]
pub async fn check_in(
    State(state): State<AppState>,
    caller: CallerEmployeeId,
    Json(request): Json<CheckInRequest>,
) -> Result<impl IntoResponse, AppError> {
    let employee = resolve_target(&state, &caller, request.employee_id.as_ref()).await?;
    let today = utc_today();

    let existing = find_today_record(&state, &employee.employee_id).await?;
    if let Some(ref record) = existing {
        match record.check_in_status {
            CheckInStatus::CheckedIn | CheckInStatus::OnBreak => {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Already checked in today"
                )));
            }
            CheckInStatus::CheckedOut => {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Already checked out today"
                )));
            }
            CheckInStatus::OnLeave => {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "On approved leave today"
                )));
            }
            CheckInStatus::Pending => {}
        }
    }

    let timing = load_company_timing(&state).await?;
    let now = Utc::now();
    let status = timing.classify(today, now).ok_or_else(|| {
        AppError::ConfigurationMissing(anyhow::anyhow!("Company start time is not configured"))
    })?;

    let record = match existing {
        Some(mut record) => {
            record.status = status;
            record.check_in_status = CheckInStatus::CheckedIn;
            record.check_in = Some(CheckEvent {
                time: now,
                location: request.location,
            });
            record.updated_at = now;
            state
                .db
                .attendance()
                .replace_one(doc! { "_id": &record.id }, &record, None)
                .await?;
            record
        }
        None => {
            let mut record = AttendanceRecord::absent(EmployeeSnapshot::from(&employee), today);
            record.status = status;
            record.check_in_status = CheckInStatus::CheckedIn;
            record.check_in = Some(CheckEvent {
                time: now,
                location: request.location,
            });
            state
                .db
                .attendance()
                .insert_one(&record, None)
                .await
                .map_err(|e| {
                    // A concurrent check-in won the unique-index race.
                    if is_duplicate_key(&e) {
                        AppError::Conflict(anyhow::anyhow!("Already checked in today"))
                    } else {
                        AppError::from(e)
                    }
                })?;
            record
        }
    };

    tracing::info!(
        employee_id = %employee.employee_id,
        status = %record.status.as_str(),
        "Checked in"
    );

    Ok(Json(AttendanceResponse::from(record)))
}

#[tracing::instrument(skip(state, request))]
pub async fn start_break(
    State(state): State<AppState>,
    caller: CallerEmployeeId,
    Json(request): Json<BreakRequest>,
) -> Result<impl IntoResponse, AppError> {
    let employee = resolve_target(&state, &caller, request.employee_id.as_ref()).await?;

    let mut record = find_today_record(&state, &employee.employee_id)
        .await?
        .ok_or_else(|| AppError::StateViolation(anyhow::anyhow!("Check-in required first")))?;

    match record.check_in_status {
        CheckInStatus::Pending | CheckInStatus::OnLeave => {
            return Err(AppError::StateViolation(anyhow::anyhow!(
                "Check-in required first"
            )));
        }
        CheckInStatus::OnBreak => {
            return Err(AppError::Conflict(anyhow::anyhow!("Already on break")));
        }
        CheckInStatus::CheckedOut => {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Already checked out today"
            )));
        }
        CheckInStatus::CheckedIn => {}
    }

    record.break_span = Some(BreakSpan {
        start_time: Utc::now(),
        end_time: None,
    });
    record.check_in_status = CheckInStatus::OnBreak;
    record.updated_at = Utc::now();

    state
        .db
        .attendance()
        .replace_one(doc! { "_id": &record.id }, &record, None)
        .await?;

    Ok(Json(AttendanceResponse::from(record)))
}

#[tracing::instrument(skip(state, request))]
pub async fn end_break(
    State(state): State<AppState>,
    caller: CallerEmployeeId,
    Json(request): Json<BreakRequest>,
) -> Result<impl IntoResponse, AppError> {
    let employee = resolve_target(&state, &caller, request.employee_id.as_ref()).await?;

    let mut record = find_today_record(&state, &employee.employee_id)
        .await?
        .ok_or_else(|| AppError::StateViolation(anyhow::anyhow!("Check-in required first")))?;

    match record.check_in_status {
        CheckInStatus::Pending | CheckInStatus::OnLeave => {
            return Err(AppError::StateViolation(anyhow::anyhow!(
                "Check-in required first"
            )));
        }
        CheckInStatus::OnBreak => {}
        _ => {
            return Err(AppError::StateViolation(anyhow::anyhow!("Not on break")));
        }
    }

    let Some(break_span) = record.break_span.as_mut() else {
        return Err(AppError::StateViolation(anyhow::anyhow!(
            "Break not started"
        )));
    };

    break_span.end_time = Some(Utc::now());
    record.check_in_status = CheckInStatus::CheckedIn;
    record.updated_at = Utc::now();

    state
        .db
        .attendance()
        .replace_one(doc! { "_id": &record.id }, &record, None)
        .await?;

    Ok(Json(AttendanceResponse::from(record)))
}

#[tracing::instrument(skip(state, request))]
pub async fn check_out(
    State(state): State<AppState>,
    caller: CallerEmployeeId,
    Json(request): Json<CheckOutRequest>,
) -> Result<impl IntoResponse, AppError> {
    let employee = resolve_target(&state, &caller, request.employee_id.as_ref()).await?;

    let mut record = find_today_record(&state, &employee.employee_id)
        .await?
        .ok_or_else(|| AppError::StateViolation(anyhow::anyhow!("Check-in required first")))?;

    match record.check_in_status {
        CheckInStatus::Pending | CheckInStatus::OnLeave => {
            return Err(AppError::StateViolation(anyhow::anyhow!(
                "Check-in required first"
            )));
        }
        CheckInStatus::CheckedOut => {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Already checked out today"
            )));
        }
        CheckInStatus::OnBreak => {
            return Err(AppError::StateViolation(anyhow::anyhow!(
                "Cannot check out while on break"
            )));
        }
        CheckInStatus::CheckedIn => {}
    }

    // The day classification (Present/Late) is decided at check-in and is
    // deliberately left untouched here.
    record.check_out = Some(CheckEvent {
        time: Utc::now(),
        location: request.location,
    });
    record.check_in_status = CheckInStatus::CheckedOut;
    record.updated_at = Utc::now();

    state
        .db
        .attendance()
        .replace_one(doc! { "_id": &record.id }, &record, None)
        .await?;

    tracing::info!(employee_id = %employee.employee_id, "Checked out");

    Ok(Json(AttendanceResponse::from(record)))
}

#[tracing::instrument(skip(state, request))]
pub async fn edit_attendance(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateAttendanceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut record = state
        .db
        .attendance()
        .find_one(doc! { "_id": &id }, None)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Attendance not found")))?;

    if record.locked {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Cannot edit locked attendance"
        )));
    }

    if let Some(check_in_time) = request.check_in_time {
        // A corrected check-in re-derives Present/Late; a manual status in
        // the same request is ignored in favor of the derived one.
        let timing = load_company_timing(&state).await?;
        let status = timing.classify(record.date, check_in_time).ok_or_else(|| {
            AppError::ConfigurationMissing(anyhow::anyhow!("Company start time is not configured"))
        })?;

        record.status = status;
        record.check_in_status = CheckInStatus::CheckedIn;
        match record.check_in {
            Some(ref mut event) => event.time = check_in_time,
            None => {
                record.check_in = Some(CheckEvent {
                    time: check_in_time,
                    location: None,
                })
            }
        }
    } else if let Some(status) = request.status {
        record.status = status;
    }

    if let Some(check_out_time) = request.check_out_time {
        if record.check_in.is_none() {
            return Err(AppError::StateViolation(anyhow::anyhow!(
                "Check-in required before setting check-out"
            )));
        }
        match record.check_out {
            Some(ref mut event) => event.time = check_out_time,
            None => {
                record.check_out = Some(CheckEvent {
                    time: check_out_time,
                    location: None,
                })
            }
        }
        record.check_in_status = CheckInStatus::CheckedOut;
    }

    if let Some(reason) = request.reason {
        record.reason = Some(reason);
    }
    record.updated_at = Utc::now();

    state
        .db
        .attendance()
        .replace_one(doc! { "_id": &record.id }, &record, None)
        .await?;

    tracing::info!(attendance_id = %id, "Attendance corrected");

    Ok(Json(AttendanceResponse::from(record)))
}

pub async fn get_all_attendance(
    State(state): State<AppState>,
    Query(params): Query<AttendanceSearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut filter = doc! {};
    if let Some(search) = params.search.filter(|s| !s.is_empty()) {
        filter = doc! { "$or": [
            { "employee.employee_id": { "$regex": &search, "$options": "i" } },
            { "employee.name": { "$regex": &search, "$options": "i" } },
        ]};
    }

    let options = FindOptions::builder().sort(doc! { "date": -1 }).build();
    let records: Vec<AttendanceResponse> = state
        .db
        .attendance()
        .find(filter, options)
        .await?
        .map_ok(AttendanceResponse::from)
        .try_collect()
        .await?;

    Ok(Json(records))
}

/// The calling employee's record for today.
pub async fn get_attendance_status(
    State(state): State<AppState>,
    caller: CallerEmployeeId,
) -> Result<impl IntoResponse, AppError> {
    let employee = state
        .db
        .find_employee_by_code(&caller.0)
        .await?
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Unknown caller")))?;

    let record = find_today_record(&state, &employee.employee_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("No attendance record for today")))?;

    Ok(Json(AttendanceResponse::from(record)))
}

pub async fn get_attendance_summary(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let today = utc_today();
    let yesterday = today - Duration::days(1);

    let mut summaries = Vec::with_capacity(AttendanceStatus::ALL.len());
    for status in AttendanceStatus::ALL {
        let today_count = state
            .db
            .attendance()
            .count_documents(
                doc! { "date": today.to_string(), "status": status.as_str() },
                None,
            )
            .await?;
        let yesterday_count = state
            .db
            .attendance()
            .count_documents(
                doc! { "date": yesterday.to_string(), "status": status.as_str() },
                None,
            )
            .await?;

        summaries.push(StatusSummary {
            status,
            today: today_count,
            yesterday: yesterday_count,
            change_pct: percentage_change(today_count, yesterday_count),
        });
    }

    Ok(Json(summaries))
}

/// 100 when a count appears out of nowhere, 0 when both days are empty,
/// the standard percentage change otherwise.
fn percentage_change(today: u64, yesterday: u64) -> f64 {
    if yesterday == 0 {
        if today > 0 {
            100.0
        } else {
            0.0
        }
    } else {
        (today as f64 - yesterday as f64) / yesterday as f64 * 100.0
    }
}

pub async fn get_monthly_attendance_graph(
    State(state): State<AppState>,
    Query(params): Query<MonthlyGraphParams>,
) -> Result<impl IntoResponse, AppError> {
    let total_employees = state.db.employees().count_documents(doc! {}, None).await?;

    let mut points = Vec::with_capacity(12);
    for month in 1..=12u32 {
        let first = NaiveDate::from_ymd_opt(params.year, month, 1)
            .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Year is out of range")))?;
        let next_month = if month == 12 {
            NaiveDate::from_ymd_opt(params.year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(params.year, month + 1, 1)
        }
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Year is out of range")))?;
        let last = next_month - Duration::days(1);

        let present = state
            .db
            .attendance()
            .count_documents(
                doc! {
                    "status": "Present",
                    "date": { "$gte": first.to_string(), "$lte": last.to_string() },
                },
                None,
            )
            .await?;

        points.push(MonthlyGraphPoint {
            month,
            total_employees,
            present,
        });
    }

    Ok(Json(points))
}

/// Seeds today's attendance record for every employee not on approved
/// leave. Purely additive: existing records are never touched, so the job
/// can run any number of times per day. Every employee gets a check-in
/// reminder regardless of whether a record was created for them.
#[tracing::instrument(skip(state))]
pub async fn create_daily_attendance(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let today = utc_today();
    let today_key = today.to_string();

    let mut created = 0u64;
    let mut skipped_on_leave = 0u64;
    let mut notified_employees = 0u64;
    let mut tokens = Vec::new();

    let mut cursor = state.db.employees().find(None, None).await?;
    while let Some(employee) = cursor.try_next().await? {
        notified_employees += 1;
        tokens.extend(employee.fcm_tokens.iter().cloned());

        let on_leave = state
            .db
            .leaves()
            .find_one(
                doc! {
                    "employee_id": &employee.employee_id,
                    "status": "Approved",
                    "start_date": { "$lte": &today_key },
                    "end_date": { "$gte": &today_key },
                },
                None,
            )
            .await?;
        if on_leave.is_some() {
            skipped_on_leave += 1;
            continue;
        }

        let employee_type_bson = mongodb::bson::to_bson(&employee.employee_type)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?;
        let now = BsonDateTime::now();

        let result = state
            .db
            .attendance()
            .update_one(
                doc! {
                    "employee.employee_id": &employee.employee_id,
                    "date": &today_key,
                },
                doc! {
                    "$setOnInsert": {
                        "_id": Uuid::new_v4().to_string(),
                        "employee.id": &employee.id,
                        "employee.name": &employee.name,
                        "employee.role": &employee.role,
                        "employee.employee_type": employee_type_bson,
                        "status": "Absent",
                        "check_in_status": "Pending",
                        "locked": false,
                        "created_at": now,
                        "updated_at": now,
                    },
                },
                UpdateOptions::builder().upsert(true).build(),
            )
            .await?;

        if result.upserted_id.is_some() {
            created += 1;
        }
    }

    state
        .notifier
        .notify_tokens(&tokens, "Attendance reminder", "Please remember to check in today")
        .await;

    tracing::info!(created, skipped_on_leave, "Daily attendance initialized");

    Ok(Json(DailyAttendanceSummary {
        created,
        skipped_on_leave,
        notified_employees,
    }))
}

#[tracing::instrument(skip(state, request))]
pub async fn set_company_timing(
    State(state): State<AppState>,
    Json(request): Json<SetCompanyTimingRequest>,
) -> Result<impl IntoResponse, AppError> {
    if CompanyTiming::parse_hhmm(&request.start_time).is_none()
        || CompanyTiming::parse_hhmm(&request.end_time).is_none()
    {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Times must be in HH:mm format"
        )));
    }
    if request.late_after_minutes < 0 {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Grace period cannot be negative"
        )));
    }

    state
        .db
        .company_timing()
        .update_one(
            doc! { "_id": COMPANY_TIMING_ID },
            doc! { "$set": {
                "start_time": &request.start_time,
                "end_time": &request.end_time,
                "late_after_minutes": request.late_after_minutes,
                "updated_at": BsonDateTime::now(),
            }},
            UpdateOptions::builder().upsert(true).build(),
        )
        .await?;

    tracing::info!(
        start_time = %request.start_time,
        late_after_minutes = request.late_after_minutes,
        "Company timing updated"
    );

    Ok(Json(CompanyTimingResponse {
        start_time: request.start_time,
        end_time: request.end_time,
        late_after_minutes: request.late_after_minutes,
    }))
}

pub async fn get_company_timing(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let timing = load_company_timing(&state).await?;
    Ok(Json(CompanyTimingResponse::from(timing)))
}

#[cfg(test)]
mod tests {
    use super::percentage_change;

    #[test]
    fn percentage_change_edge_cases() {
        assert_eq!(percentage_change(0, 0), 0.0);
        assert_eq!(percentage_change(5, 0), 100.0);
        assert_eq!(percentage_change(0, 4), -100.0);
        assert_eq!(percentage_change(6, 4), 50.0);
    }
}
