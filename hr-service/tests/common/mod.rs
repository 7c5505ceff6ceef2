use hr_service::config::HrConfig;
use hr_service::services::HrDb;
use hr_service::startup::Application;
use uuid::Uuid;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub db: HrDb,
    pub db_name: String,
    pub slip_dir: String,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        if std::env::var("MONGODB_URI").is_err() {
            std::env::set_var("MONGODB_URI", "mongodb://localhost:27017");
        }

        let db_name = format!("hr_test_{}", Uuid::new_v4().simple());
        let slip_dir = format!("target/test-slips-{}", Uuid::new_v4());

        let mut config = HrConfig::load().expect("Failed to load configuration");
        config.common.port = 0; // Random port for testing
        config.mongodb.database = db_name.clone();
        config.slips.dir = slip_dir.clone();

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let db = app.db().clone();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to be ready by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            db,
            db_name,
            slip_dir,
            client,
        }
    }

    /// Creates an employee over the API; returns the response body.
    pub async fn create_employee(
        &self,
        name: &str,
        employee_type: &str,
        entitlements: serde_json::Value,
    ) -> serde_json::Value {
        let response = self
            .client
            .post(format!("{}/employees", self.address))
            .json(&serde_json::json!({
                "name": name,
                "email": format!("{}@example.com", Uuid::new_v4().simple()),
                "role": "Engineer",
                "employee_type": employee_type,
                "department": "Engineering",
                "joining_date": "2023-01-15",
                "entitlements": entitlements,
            }))
            .send()
            .await
            .expect("Failed to execute create-employee request");
        assert_eq!(
            reqwest::StatusCode::CREATED,
            response.status(),
            "employee creation failed"
        );
        response.json().await.expect("Failed to parse employee JSON")
    }

    /// Fetches an employee by code; returns the response body.
    pub async fn get_employee(&self, employee_code: &str) -> serde_json::Value {
        let response = self
            .client
            .get(format!("{}/employees/{}", self.address, employee_code))
            .send()
            .await
            .expect("Failed to execute get-employee request");
        assert_eq!(reqwest::StatusCode::OK, response.status());
        response.json().await.expect("Failed to parse employee JSON")
    }

    pub async fn set_company_timing(&self, start_time: &str, late_after_minutes: i64) {
        let response = self
            .client
            .post(format!("{}/attendance/setCompanyTiming", self.address))
            .json(&serde_json::json!({
                "start_time": start_time,
                "end_time": "18:00",
                "late_after_minutes": late_after_minutes,
            }))
            .send()
            .await
            .expect("Failed to execute set-company-timing request");
        assert_eq!(reqwest::StatusCode::OK, response.status());
    }

    /// POST with the caller identity header the attendance endpoints expect.
    pub fn post_as(&self, employee_code: &str, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{}", self.address, path))
            .header("X-Employee-ID", employee_code)
    }

    /// Applies for leave as `employee_code`; returns the raw response.
    pub async fn apply_leave(
        &self,
        employee_code: &str,
        leave_type: &str,
        start_date: &str,
        end_date: &str,
    ) -> reqwest::Response {
        self.post_as(employee_code, "/leaves/apply")
            .json(&serde_json::json!({
                "leave_type": leave_type,
                "start_date": start_date,
                "end_date": end_date,
                "reason": "Personal errand",
            }))
            .send()
            .await
            .expect("Failed to execute apply-leave request")
    }

    pub async fn update_leave_status(
        &self,
        leave_id: &str,
        status: &str,
        approved_by: &str,
    ) -> reqwest::Response {
        self.client
            .put(format!("{}/leaves/updateLeaveStatus/{}", self.address, leave_id))
            .json(&serde_json::json!({
                "status": status,
                "approved_by": approved_by,
            }))
            .send()
            .await
            .expect("Failed to execute update-leave-status request")
    }

    /// Cleanup test resources (database and slip storage).
    pub async fn cleanup(&self) {
        let _ = self.db.client().database(&self.db_name).drop(None).await;
        let _ = tokio::fs::remove_dir_all(&self.slip_dir).await;
    }
}
