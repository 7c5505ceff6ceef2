use crate::dtos::{
    CreateEmployeeRequest, EmployeeResponse, EmployeeSearchParams, UpdateEmployeeRequest,
};
use crate::models::{Employee, LeaveType};
use crate::services::is_duplicate_key;
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use futures::TryStreamExt;
use mongodb::bson::{doc, DateTime as BsonDateTime, Document};
use mongodb::options::FindOptions;
use service_core::error::AppError;
use validator::Validate;

#[tracing::instrument(skip(state, request))]
pub async fn create_employee(
    State(state): State<AppState>,
    Json(request): Json<CreateEmployeeRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    for (key, balance) in &request.entitlements {
        if LeaveType::from_key(key).is_none() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Unknown leave type key: {}",
                key
            )));
        }
        if balance.total < 0 || balance.consumed < 0 {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Entitlement for {} cannot be negative",
                key
            )));
        }
    }

    let mut employee = Employee::new(
        request.name,
        request.email,
        request.role,
        request.employee_type,
        request.department,
        request.joining_date,
        request.salary_structure,
        request.loan_pf,
        request.entitlements,
    );
    if let Some(status) = request.employee_status {
        employee.employee_status = status;
    }
    employee.fcm_tokens = request.fcm_tokens;

    state
        .db
        .employees()
        .insert_one(&employee, None)
        .await
        .map_err(|e| {
            if is_duplicate_key(&e) {
                AppError::Conflict(anyhow::anyhow!("Employee with this email already exists"))
            } else {
                AppError::from(e)
            }
        })?;

    tracing::info!(
        employee_id = %employee.employee_id,
        "Employee created"
    );

    Ok((StatusCode::CREATED, Json(EmployeeResponse::from(employee))))
}

pub async fn get_all_employees(
    State(state): State<AppState>,
    Query(params): Query<EmployeeSearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut filter = doc! {};
    if let Some(search) = params.search.filter(|s| !s.is_empty()) {
        filter = doc! { "$or": [
            { "employee_id": { "$regex": &search, "$options": "i" } },
            { "name": { "$regex": &search, "$options": "i" } },
        ]};
    }

    let options = FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .build();
    let employees: Vec<EmployeeResponse> = state
        .db
        .employees()
        .find(filter, options)
        .await?
        .map_ok(EmployeeResponse::from)
        .try_collect()
        .await?;

    Ok(Json(employees))
}

/// Looks an employee up by code first, then by document id, so both kinds
/// of reference work on the path.
async fn find_employee_by_ref(state: &AppState, reference: &str) -> Result<Employee, AppError> {
    if let Some(employee) = state.db.find_employee_by_code(reference).await? {
        return Ok(employee);
    }
    state
        .db
        .employees()
        .find_one(doc! { "_id": reference }, None)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Employee not found")))
}

pub async fn get_employee(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let employee = find_employee_by_ref(&state, &id).await?;
    Ok(Json(EmployeeResponse::from(employee)))
}

#[tracing::instrument(skip(state, request))]
pub async fn update_employee(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateEmployeeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let employee = find_employee_by_ref(&state, &id).await?;

    let mut set = Document::new();
    if let Some(name) = request.name {
        set.insert("name", name);
    }
    if let Some(role) = request.role {
        set.insert("role", role);
    }
    if let Some(department) = request.department {
        set.insert("department", department);
    }
    if let Some(employee_status) = request.employee_status {
        set.insert("employee_status", employee_status);
    }
    if let Some(fcm_tokens) = request.fcm_tokens {
        set.insert("fcm_tokens", fcm_tokens);
    }
    if let Some(salary_structure) = request.salary_structure {
        let value = mongodb::bson::to_bson(&salary_structure)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?;
        set.insert("salary_structure", value);
    }
    if let Some(loan_pf) = request.loan_pf {
        let value = mongodb::bson::to_bson(&loan_pf)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?;
        set.insert("loan_pf", value);
    }

    // Entitlement edits adjust totals only; `consumed` belongs to the leave
    // ledger and is never written here.
    if let Some(entitlement_totals) = request.entitlement_totals {
        for (key, total) in entitlement_totals {
            if LeaveType::from_key(&key).is_none() {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Unknown leave type key: {}",
                    key
                )));
            }
            if total < 0 {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Entitlement for {} cannot be negative",
                    key
                )));
            }
            set.insert(format!("entitlements.{}.total", key), total);
        }
    }

    if set.is_empty() {
        return Ok(Json(EmployeeResponse::from(employee)));
    }
    set.insert("updated_at", BsonDateTime::now());

    state
        .db
        .employees()
        .update_one(doc! { "_id": &employee.id }, doc! { "$set": set }, None)
        .await?;

    let updated = state
        .db
        .employees()
        .find_one(doc! { "_id": &employee.id }, None)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Employee not found")))?;

    Ok(Json(EmployeeResponse::from(updated)))
}

#[tracing::instrument(skip(state))]
pub async fn delete_employee(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let employee = find_employee_by_ref(&state, &id).await?;

    state
        .db
        .employees()
        .delete_one(doc! { "_id": &employee.id }, None)
        .await?;

    tracing::info!(employee_id = %employee.employee_id, "Employee deleted");

    Ok(StatusCode::NO_CONTENT)
}
