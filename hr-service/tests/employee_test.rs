mod common;

use common::TestApp;
use reqwest::StatusCode;

#[tokio::test]
async fn created_employee_gets_a_generated_code() {
    let app = TestApp::spawn().await;

    let employee = app
        .create_employee(
            "Sana Iqbal",
            "Office Staff",
            serde_json::json!({
                "casual_leave": { "total": 10, "consumed": 0 },
                "sick_leave": { "total": 7 },
            }),
        )
        .await;

    let code = employee["employee_id"].as_str().unwrap();
    assert_eq!(code.len(), 10);
    assert_eq!(&code[..3], "ENG"); // role prefix from "Engineer"
    assert_eq!(employee["employee_status"], "Active");
    assert_eq!(employee["entitlements"]["sick_leave"]["total"], 7);
    assert_eq!(employee["entitlements"]["sick_leave"]["consumed"], 0);

    app.cleanup().await;
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let app = TestApp::spawn().await;

    let body = serde_json::json!({
        "name": "Sana Iqbal",
        "email": "sana@example.com",
        "role": "Engineer",
        "employee_type": "Office Staff",
        "department": "Engineering",
        "joining_date": "2023-01-15",
    });

    let first = app
        .client
        .post(format!("{}/employees", app.address))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::CREATED, first.status());

    let second = app
        .client
        .post(format!("{}/employees", app.address))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::CONFLICT, second.status());

    app.cleanup().await;
}

#[tokio::test]
async fn unknown_entitlement_key_is_rejected() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(format!("{}/employees", app.address))
        .json(&serde_json::json!({
            "name": "Sana Iqbal",
            "email": "sana@example.com",
            "role": "Engineer",
            "employee_type": "Office Staff",
            "department": "Engineering",
            "joining_date": "2023-01-15",
            "entitlements": { "garden_leave": { "total": 5 } },
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(StatusCode::BAD_REQUEST, response.status());

    app.cleanup().await;
}

#[tokio::test]
async fn update_adjusts_totals_but_never_consumed() {
    let app = TestApp::spawn().await;
    let employee = app
        .create_employee(
            "Sana Iqbal",
            "Office Staff",
            serde_json::json!({ "casual_leave": { "total": 10, "consumed": 4 } }),
        )
        .await;
    let code = employee["employee_id"].as_str().unwrap();

    let response = app
        .client
        .put(format!("{}/employees/{}", app.address, code))
        .json(&serde_json::json!({
            "department": "Platform",
            "entitlement_totals": { "casual_leave": 15 },
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(StatusCode::OK, response.status());
    let updated: serde_json::Value = response.json().await.unwrap();
    assert_eq!(updated["department"], "Platform");
    assert_eq!(updated["entitlements"]["casual_leave"]["total"], 15);
    assert_eq!(updated["entitlements"]["casual_leave"]["consumed"], 4);

    // Unknown fields are rejected rather than merged.
    let response = app
        .client
        .put(format!("{}/employees/{}", app.address, code))
        .json(&serde_json::json!({ "employee_id": "FORGED1234" }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::UNPROCESSABLE_ENTITY, response.status());

    app.cleanup().await;
}

#[tokio::test]
async fn delete_removes_the_employee() {
    let app = TestApp::spawn().await;
    let employee = app
        .create_employee("Sana Iqbal", "Office Staff", serde_json::json!({}))
        .await;
    let code = employee["employee_id"].as_str().unwrap();

    let response = app
        .client
        .delete(format!("{}/employees/{}", app.address, code))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::NO_CONTENT, response.status());

    let response = app
        .client
        .get(format!("{}/employees/{}", app.address, code))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::NOT_FOUND, response.status());

    app.cleanup().await;
}

#[tokio::test]
async fn listing_filters_by_name() {
    let app = TestApp::spawn().await;
    app.create_employee("Sana Iqbal", "Office Staff", serde_json::json!({}))
        .await;
    app.create_employee("Omar Farooq", "Field Staff", serde_json::json!({}))
        .await;

    let response = app
        .client
        .get(format!("{}/employees?search=sana", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, response.status());
    let employees: Vec<serde_json::Value> = response.json().await.unwrap();
    assert_eq!(employees.len(), 1);
    assert_eq!(employees[0]["name"], "Sana Iqbal");

    app.cleanup().await;
}
