use crate::dtos::{
    ApplyLeaveRequest, LeaveResponse, LeaveSearchParams, UpdateLeaveRequest,
    UpdateLeaveStatusRequest,
};
use crate::middleware::CallerEmployeeId;
use crate::models::{
    inclusive_days, span_days, EmployeeSnapshot, LeaveRequest, LeaveStatus, LeaveType,
};
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use futures::TryStreamExt;
use mongodb::bson::{doc, DateTime as BsonDateTime};
use mongodb::options::{FindOptions, ReturnDocument, UpdateOptions};
use service_core::error::AppError;
use uuid::Uuid;

#[tracing::instrument(skip(state, request))]
pub async fn apply_leave(
    State(state): State<AppState>,
    caller: CallerEmployeeId,
    Json(request): Json<ApplyLeaveRequest>,
) -> Result<impl IntoResponse, AppError> {
    if request.reason.trim().is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!("Reason is required")));
    }

    let employee_code = request
        .employee_id
        .clone()
        .unwrap_or_else(|| caller.0.clone());
    let employee = state
        .db
        .find_employee_by_code(&employee_code)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Employee not found")))?;

    let leave_type = LeaveType::from_name(&request.leave_type).ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!("Unknown leave type: {}", request.leave_type))
    })?;
    let balance = employee.entitlement(leave_type).ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!(
            "No {} entitlement for this employee",
            leave_type.name()
        ))
    })?;

    let requested_days = inclusive_days(request.start_date, request.end_date);
    if requested_days <= 0 {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "End date must not be before start date"
        )));
    }

    // Balance is checked at apply time only; approval does not re-check it.
    if requested_days > balance.available() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Insufficient {} balance: requested {} days, {} available",
            leave_type.name(),
            requested_days,
            balance.available()
        )));
    }

    if find_approved_overlap(
        &state,
        &employee.employee_id,
        request.start_date,
        request.end_date,
        None,
    )
    .await?
    {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Leave overlaps with existing approved leave"
        )));
    }

    let leave = LeaveRequest::new(
        &employee,
        leave_type,
        request.start_date,
        request.end_date,
        request.reason.trim().to_string(),
    );
    state.db.leaves().insert_one(&leave, None).await?;

    tracing::info!(
        leave_id = %leave.id,
        employee_id = %leave.employee_id,
        leave_type = %leave_type.name(),
        days = requested_days,
        "Leave request created"
    );

    notify_admins(&state, &leave).await;

    Ok((StatusCode::CREATED, Json(LeaveResponse::from(leave))))
}

#[tracing::instrument(skip(state, request))]
pub async fn update_leave_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateLeaveStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let leave = state
        .db
        .leaves()
        .find_one(doc! { "_id": &id }, None)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Leave not found")))?;

    let was_approved = leave.status == LeaveStatus::Approved;

    // The status and approver are assigned unconditionally; the side effects
    // below fire only on the edge into Approved, so repeated
    // Approved -> Approved calls do not consume entitlement twice.
    let status_bson = mongodb::bson::to_bson(&request.status)
        .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?;
    state
        .db
        .leaves()
        .update_one(
            doc! { "_id": &id },
            doc! { "$set": {
                "status": status_bson,
                "approved_by": &request.approved_by,
                "updated_at": BsonDateTime::now(),
            }},
            None,
        )
        .await?;

    if request.status == LeaveStatus::Approved && !was_approved {
        apply_approval_side_effects(&state, &leave).await?;
    }

    notify_employee(&state, &leave, request.status).await;

    let updated = state
        .db
        .leaves()
        .find_one(doc! { "_id": &id }, None)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Leave not found")))?;

    Ok(Json(LeaveResponse::from(updated)))
}

/// Entitlement consumption plus the On-Leave attendance upserts. Runs
/// without a transaction: a mid-sequence store failure leaves the
/// entitlement consumed with only part of the span marked.
async fn apply_approval_side_effects(
    state: &AppState,
    leave: &LeaveRequest,
) -> Result<(), AppError> {
    let employee = state
        .db
        .find_employee_by_code(&leave.employee_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Employee not found")))?;

    if employee.entitlement(leave.leave_type).is_none() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "No {} entitlement for this employee",
            leave.leave_type.name()
        )));
    }

    // TODO: consumption is never released when an approved leave is later
    // rejected or deleted; building the reversal path needs a product
    // decision on how reclaimed days should be accounted.
    let consumed_field = format!("entitlements.{}.consumed", leave.leave_type.key());
    state
        .db
        .employees()
        .update_one(
            doc! { "_id": &employee.id },
            doc! { "$inc": { consumed_field: leave.day_count() } },
            None,
        )
        .await?;

    let snapshot = EmployeeSnapshot::from(&employee);
    for day in span_days(leave.start_date, leave.end_date) {
        mark_day_on_leave(state, &snapshot, day, leave).await?;
    }

    tracing::info!(
        leave_id = %leave.id,
        employee_id = %leave.employee_id,
        days = leave.day_count(),
        "Leave approved; entitlement consumed and span marked"
    );

    Ok(())
}

async fn mark_day_on_leave(
    state: &AppState,
    snapshot: &EmployeeSnapshot,
    day: NaiveDate,
    leave: &LeaveRequest,
) -> Result<(), AppError> {
    let employee_type_bson = mongodb::bson::to_bson(&snapshot.employee_type)
        .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?;
    let now = BsonDateTime::now();

    state
        .db
        .attendance()
        .update_one(
            doc! {
                "employee.employee_id": &snapshot.employee_id,
                "date": day.to_string(),
            },
            doc! {
                "$set": {
                    "status": "On Leave",
                    "check_in_status": "On Leave",
                    "leave_info": {
                        "leave_id": &leave.id,
                        "leave_type": leave.leave_type.name(),
                    },
                    "updated_at": now,
                },
                "$setOnInsert": {
                    "_id": Uuid::new_v4().to_string(),
                    "employee.id": &snapshot.id,
                    "employee.name": &snapshot.name,
                    "employee.role": &snapshot.role,
                    "employee.employee_type": employee_type_bson,
                    "locked": false,
                    "created_at": now,
                },
            },
            UpdateOptions::builder().upsert(true).build(),
        )
        .await?;
    Ok(())
}

#[tracing::instrument(skip(state, request))]
pub async fn update_leave(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateLeaveRequest>,
) -> Result<impl IntoResponse, AppError> {
    let leave = state
        .db
        .leaves()
        .find_one(doc! { "_id": &id }, None)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Leave not found")))?;

    if leave.status == LeaveStatus::Approved {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Approved leave cannot be edited"
        )));
    }

    let leave_type = match &request.leave_type {
        Some(name) => LeaveType::from_name(name).ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!("Unknown leave type: {}", name))
        })?,
        None => leave.leave_type,
    };
    let start_date = request.start_date.unwrap_or(leave.start_date);
    let end_date = request.end_date.unwrap_or(leave.end_date);
    let reason = request.reason.clone().unwrap_or_else(|| leave.reason.clone());

    if reason.trim().is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!("Reason is required")));
    }
    if inclusive_days(start_date, end_date) <= 0 {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "End date must not be before start date"
        )));
    }

    if find_approved_overlap(&state, &leave.employee_id, start_date, end_date, Some(&id)).await? {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Leave overlaps with existing approved leave"
        )));
    }

    let updated = state
        .db
        .leaves()
        .find_one_and_update(
            doc! { "_id": &id },
            doc! { "$set": {
                "leave_type": leave_type.name(),
                "start_date": start_date.to_string(),
                "end_date": end_date.to_string(),
                "reason": reason.trim(),
                "updated_at": BsonDateTime::now(),
            }},
            mongodb::options::FindOneAndUpdateOptions::builder()
                .return_document(ReturnDocument::After)
                .build(),
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Leave not found")))?;

    Ok(Json(LeaveResponse::from(updated)))
}

#[tracing::instrument(skip(state))]
pub async fn delete_leave(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let leave = state
        .db
        .leaves()
        .find_one(doc! { "_id": &id }, None)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Leave not found")))?;

    if leave.status == LeaveStatus::Approved {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Approved leave cannot be deleted"
        )));
    }

    state
        .db
        .leaves()
        .delete_one(doc! { "_id": &id }, None)
        .await?;

    tracing::info!(leave_id = %id, "Leave request deleted");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_all_leaves(
    State(state): State<AppState>,
    Query(params): Query<LeaveSearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut filter = doc! {};
    if let Some(search) = params.search.filter(|s| !s.is_empty()) {
        filter = doc! { "$or": [
            { "employee_id": { "$regex": &search, "$options": "i" } },
            { "employee_name": { "$regex": &search, "$options": "i" } },
        ]};
    }

    let options = FindOptions::builder()
        .sort(doc! { "applied_at": -1 })
        .build();
    let leaves: Vec<LeaveResponse> = state
        .db
        .leaves()
        .find(filter, options)
        .await?
        .map_ok(LeaveResponse::from)
        .try_collect()
        .await?;

    Ok(Json(leaves))
}

pub async fn get_employee_leaves(
    State(state): State<AppState>,
    Path(employee_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let options = FindOptions::builder()
        .sort(doc! { "applied_at": -1 })
        .build();
    let leaves: Vec<LeaveResponse> = state
        .db
        .leaves()
        .find(doc! { "employee_id": &employee_id }, options)
        .await?
        .map_ok(LeaveResponse::from)
        .try_collect()
        .await?;

    Ok(Json(leaves))
}

/// True when an Approved leave for `employee_id` intersects
/// `[start_date, end_date]`, bounds inclusive on both sides.
async fn find_approved_overlap(
    state: &AppState,
    employee_id: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    exclude_id: Option<&String>,
) -> Result<bool, AppError> {
    let mut filter = doc! {
        "employee_id": employee_id,
        "status": "Approved",
        "start_date": { "$lte": end_date.to_string() },
        "end_date": { "$gte": start_date.to_string() },
    };
    if let Some(id) = exclude_id {
        filter.insert("_id", doc! { "$ne": id });
    }

    Ok(state.db.leaves().find_one(filter, None).await?.is_some())
}

async fn notify_admins(state: &AppState, leave: &LeaveRequest) {
    let filter = doc! { "employee_type": { "$in": ["Admin", "HR"] } };
    let mut tokens = Vec::new();

    match state.db.employees().find(filter, None).await {
        Ok(mut cursor) => loop {
            match cursor.try_next().await {
                Ok(Some(admin)) => tokens.extend(admin.fcm_tokens),
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Failed to enumerate admins for notification: {}", e);
                    break;
                }
            }
        },
        Err(e) => {
            tracing::warn!("Failed to query admins for notification: {}", e);
            return;
        }
    }

    if tokens.is_empty() {
        return;
    }

    let body = format!(
        "{} applied for {} ({} to {})",
        leave.employee_name,
        leave.leave_type.name(),
        leave.start_date,
        leave.end_date
    );
    state
        .notifier
        .notify_tokens(&tokens, "New leave request", &body)
        .await;
}

async fn notify_employee(state: &AppState, leave: &LeaveRequest, status: LeaveStatus) {
    let employee = match state.db.find_employee_by_code(&leave.employee_id).await {
        Ok(Some(employee)) => employee,
        Ok(None) => return,
        Err(e) => {
            tracing::warn!("Failed to load employee for notification: {}", e);
            return;
        }
    };

    if employee.fcm_tokens.is_empty() {
        return;
    }

    let (title, body) = match status {
        LeaveStatus::Approved => (
            "Leave approved",
            format!(
                "Your {} from {} to {} has been approved",
                leave.leave_type.name(),
                leave.start_date,
                leave.end_date
            ),
        ),
        LeaveStatus::Rejected => (
            "Leave rejected",
            format!(
                "Your {} from {} to {} has been rejected",
                leave.leave_type.name(),
                leave.start_date,
                leave.end_date
            ),
        ),
        LeaveStatus::Pending => (
            "Leave updated",
            format!(
                "Your {} from {} to {} is pending review",
                leave.leave_type.name(),
                leave.start_date,
                leave.end_date
            ),
        ),
    };

    state
        .notifier
        .notify_tokens(&employee.fcm_tokens, title, &body)
        .await;
}
