mod common;

use chrono::Utc;
use common::TestApp;
use mongodb::bson::doc;
use reqwest::StatusCode;

fn entitlements() -> serde_json::Value {
    serde_json::json!({ "casual_leave": { "total": 10, "consumed": 0 } })
}

#[tokio::test]
async fn initializer_seeds_absent_records_and_skips_employees_on_leave() {
    let app = TestApp::spawn().await;
    let working = app
        .create_employee("Sana Iqbal", "Office Staff", entitlements())
        .await;
    let on_leave = app
        .create_employee("Omar Farooq", "Office Staff", entitlements())
        .await;
    let working_code = working["employee_id"].as_str().unwrap();
    let on_leave_code = on_leave["employee_id"].as_str().unwrap();

    // Put the second employee on approved leave covering today.
    let today = Utc::now().date_naive().to_string();
    let leave: serde_json::Value = app
        .apply_leave(on_leave_code, "Casual Leave", &today, &today)
        .await
        .json()
        .await
        .unwrap();
    app.update_leave_status(leave["id"].as_str().unwrap(), "Approved", "HR0001AAA")
        .await;

    let response = app
        .client
        .post(format!("{}/attendance/createDailyAttendance", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, response.status());
    let summary: serde_json::Value = response.json().await.unwrap();
    assert_eq!(summary["created"], 1);
    assert_eq!(summary["skipped_on_leave"], 1);
    assert_eq!(summary["notified_employees"], 2);

    // The working employee got a fresh Absent/Pending record.
    let record = app
        .db
        .attendance()
        .find_one(
            doc! { "employee.employee_id": working_code, "date": &today },
            None,
        )
        .await
        .unwrap()
        .expect("no record for working employee");
    assert_eq!(record.status.as_str(), "Absent");
    assert_eq!(record.check_in_status.as_str(), "Pending");
    assert_eq!(record.employee.name, "Sana Iqbal");

    // The employee on leave keeps the On Leave record written at approval.
    let record = app
        .db
        .attendance()
        .find_one(
            doc! { "employee.employee_id": on_leave_code, "date": &today },
            None,
        )
        .await
        .unwrap()
        .expect("no record for employee on leave");
    assert_eq!(record.status.as_str(), "On Leave");

    app.cleanup().await;
}

#[tokio::test]
async fn initializer_is_idempotent_and_never_overwrites() {
    let app = TestApp::spawn().await;
    let employee = app
        .create_employee("Sana Iqbal", "Office Staff", entitlements())
        .await;
    let code = employee["employee_id"].as_str().unwrap();

    let first: serde_json::Value = app
        .client
        .post(format!("{}/attendance/createDailyAttendance", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first["created"], 1);

    // Check in so the record has meaningful state to preserve.
    app.set_company_timing("00:00", 0).await;
    app.post_as(code, "/attendance/checkin")
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();

    let second: serde_json::Value = app
        .client
        .post(format!("{}/attendance/createDailyAttendance", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second["created"], 0);

    // Still exactly one record for (employee, today), with the check-in
    // state intact.
    let today = Utc::now().date_naive().to_string();
    let count = app
        .db
        .attendance()
        .count_documents(
            doc! { "employee.employee_id": code, "date": &today },
            None,
        )
        .await
        .unwrap();
    assert_eq!(count, 1);

    let record = app
        .db
        .attendance()
        .find_one(doc! { "employee.employee_id": code, "date": &today }, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.check_in_status.as_str(), "CheckedIn");
    assert_eq!(record.status.as_str(), "Late");

    app.cleanup().await;
}
