mod common;

use chrono::{Datelike, Utc};
use common::TestApp;
use mongodb::bson::doc;
use reqwest::StatusCode;

fn entitlements() -> serde_json::Value {
    serde_json::json!({ "casual_leave": { "total": 10, "consumed": 0 } })
}

fn june_payroll(employee_id: &str) -> serde_json::Value {
    serde_json::json!({
        "employee_id": employee_id,
        "month": "June",
        "year": 2024,
        "basic_salary": 50000.0,
        "allowances": { "medical": 2000.0, "transport": 1000.0, "others": 0.0 },
        "deductions": { "pf": 500.0, "loan": 0.0, "advance_salary": 0.0, "tax": 1000.0, "others": 0.0 },
        "present_days": 20,
        "approved_leaves": 2,
        "total_working_days": 22,
    })
}

#[tokio::test]
async fn generate_payroll_computes_gross_and_net() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(format!("{}/payroll/generatePayroll", app.address))
        .json(&june_payroll("ENG1234ABC"))
        .send()
        .await
        .unwrap();

    assert_eq!(StatusCode::CREATED, response.status());
    let payroll: serde_json::Value = response.json().await.unwrap();
    assert_eq!(payroll["gross_salary"], 53000.0);
    assert_eq!(payroll["net_pay"], 51500.0);
    assert_eq!(payroll["payroll_status"], "Pending");
    assert_eq!(payroll["is_locked"], false);

    // The slip was rendered and its reference stored.
    let slip_url = payroll["salary_slip_url"]
        .as_str()
        .expect("salary_slip_url missing");
    let slip = tokio::fs::read_to_string(slip_url)
        .await
        .expect("slip file missing");
    assert!(slip.contains("51500.00"));

    app.cleanup().await;
}

#[tokio::test]
async fn duplicate_period_is_rejected() {
    let app = TestApp::spawn().await;

    let first = app
        .client
        .post(format!("{}/payroll/generatePayroll", app.address))
        .json(&june_payroll("ENG1234ABC"))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::CREATED, first.status());

    let second = app
        .client
        .post(format!("{}/payroll/generatePayroll", app.address))
        .json(&june_payroll("ENG1234ABC"))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::CONFLICT, second.status());
    let body: serde_json::Value = second.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("already generated"));

    // A different month for the same employee is fine.
    let mut other_month = june_payroll("ENG1234ABC");
    other_month["month"] = serde_json::json!("July");
    let third = app
        .client
        .post(format!("{}/payroll/generatePayroll", app.address))
        .json(&other_month)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::CREATED, third.status());

    app.cleanup().await;
}

#[tokio::test]
async fn update_recomputes_derived_amounts() {
    let app = TestApp::spawn().await;

    let payroll: serde_json::Value = app
        .client
        .post(format!("{}/payroll/generatePayroll", app.address))
        .json(&june_payroll("ENG1234ABC"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = payroll["id"].as_str().unwrap();

    let response = app
        .client
        .put(format!("{}/payroll/updatePayroll/{}", app.address, id))
        .json(&serde_json::json!({
            "deductions": { "pf": 500.0, "loan": 2000.0, "advance_salary": 0.0, "tax": 1000.0, "others": 0.0 },
            "payroll_status": "Processed",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(StatusCode::OK, response.status());
    let updated: serde_json::Value = response.json().await.unwrap();
    assert_eq!(updated["gross_salary"], 53000.0);
    assert_eq!(updated["net_pay"], 49500.0);
    assert_eq!(updated["payroll_status"], "Processed");

    // Unknown fields are rejected instead of silently merged.
    let response = app
        .client
        .put(format!("{}/payroll/updatePayroll/{}", app.address, id))
        .json(&serde_json::json!({ "is_locked": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::UNPROCESSABLE_ENTITY, response.status());

    // Approval must go through its own endpoint.
    let response = app
        .client
        .put(format!("{}/payroll/updatePayroll/{}", app.address, id))
        .json(&serde_json::json!({ "payroll_status": "Approved" }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, response.status());

    app.cleanup().await;
}

#[tokio::test]
async fn approval_locks_payroll_and_consumed_attendance() {
    let app = TestApp::spawn().await;
    let employee = app
        .create_employee("Sana Iqbal", "Office Staff", entitlements())
        .await;
    let code = employee["employee_id"].as_str().unwrap();

    // Give the employee an attendance record in the payroll month.
    app.set_company_timing("00:00", 0).await;
    app.post_as(code, "/attendance/checkin")
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();

    let now = Utc::now();
    let mut request = june_payroll(code);
    request["month"] = serde_json::json!(now.format("%B").to_string());
    request["year"] = serde_json::json!(now.year());

    let payroll: serde_json::Value = app
        .client
        .post(format!("{}/payroll/generatePayroll", app.address))
        .json(&request)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = payroll["id"].as_str().unwrap();

    let response = app
        .client
        .put(format!("{}/payroll/approve/{}", app.address, id))
        .json(&serde_json::json!({ "approved_by": "HR0001AAA" }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, response.status());
    let approved: serde_json::Value = response.json().await.unwrap();
    assert_eq!(approved["payroll_status"], "Approved");
    assert_eq!(approved["is_locked"], true);
    assert_eq!(approved["approved_by"], "HR0001AAA");

    // The payroll is now read-only.
    let response = app
        .client
        .put(format!("{}/payroll/updatePayroll/{}", app.address, id))
        .json(&serde_json::json!({ "basic_salary": 60000.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::CONFLICT, response.status());
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("locked"));

    // The month's attendance was consumed by the approved payroll.
    let record = app
        .db
        .attendance()
        .find_one(doc! { "employee.employee_id": code }, None)
        .await
        .unwrap()
        .unwrap();
    assert!(record.locked);

    // And locked attendance rejects edits.
    let response = app
        .client
        .put(format!("{}/attendance/UpdateAttendance/{}", app.address, record.id))
        .json(&serde_json::json!({ "reason": "correction" }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::CONFLICT, response.status());

    app.cleanup().await;
}

#[tokio::test]
async fn salary_slip_can_be_regenerated() {
    let app = TestApp::spawn().await;

    let payroll: serde_json::Value = app
        .client
        .post(format!("{}/payroll/generatePayroll", app.address))
        .json(&june_payroll("ENG1234ABC"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = payroll["id"].as_str().unwrap();

    let response = app
        .client
        .post(format!("{}/payroll/generateSalarySlip/{}", app.address, id))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, response.status());
    let body: serde_json::Value = response.json().await.unwrap();
    let url = body["salary_slip_url"].as_str().unwrap();
    assert!(tokio::fs::metadata(url).await.is_ok());
    assert_eq!(body["payroll"]["salary_slip_url"], url);

    app.cleanup().await;
}

#[tokio::test]
async fn payroll_listings_are_sorted_and_scoped() {
    let app = TestApp::spawn().await;

    app.client
        .post(format!("{}/payroll/generatePayroll", app.address))
        .json(&june_payroll("ENG1234ABC"))
        .send()
        .await
        .unwrap();
    let mut other = june_payroll("HRX5678DEF");
    other["month"] = serde_json::json!("July");
    app.client
        .post(format!("{}/payroll/generatePayroll", app.address))
        .json(&other)
        .send()
        .await
        .unwrap();

    let response = app
        .client
        .get(format!("{}/payroll/getAllPayrolls", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, response.status());
    let payrolls: Vec<serde_json::Value> = response.json().await.unwrap();
    assert_eq!(payrolls.len(), 2);

    let response = app
        .client
        .get(format!("{}/payroll/employee/ENG1234ABC", app.address))
        .send()
        .await
        .unwrap();
    let payrolls: Vec<serde_json::Value> = response.json().await.unwrap();
    assert_eq!(payrolls.len(), 1);
    assert_eq!(payrolls[0]["employee_id"], "ENG1234ABC");

    app.cleanup().await;
}

#[tokio::test]
async fn missing_payroll_returns_not_found() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .put(format!("{}/payroll/approve/{}", app.address, "nonexistent-id"))
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::NOT_FOUND, response.status());

    app.cleanup().await;
}
