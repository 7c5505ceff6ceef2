//! Application startup and lifecycle management.

use crate::config::HrConfig;
use crate::handlers;
use crate::services::{
    FcmProvider, HrDb, LocalSlipWriter, MockPushProvider, Notifier, PushProvider, SlipGenerator,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;
use service_core::error::AppError;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: HrConfig,
    pub db: HrDb,
    pub notifier: Notifier,
    pub slips: Arc<dyn SlipGenerator>,
}

/// Health check endpoint for Docker/K8s liveness probes.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "service": "hr-service",
                "version": env!("CARGO_PKG_VERSION")
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "service": "hr-service",
                "error": e.to_string()
            })),
        ),
    }
}

/// Readiness check endpoint for K8s readiness probes.
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.health_check().await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn router(state: AppState) -> Router {
    let attendance_routes = Router::new()
        .route("/checkin", post(handlers::attendance::check_in))
        .route("/checkout", post(handlers::attendance::check_out))
        .route("/startBreak", post(handlers::attendance::start_break))
        .route("/endBreak", post(handlers::attendance::end_break))
        .route(
            "/getAllAttendance",
            get(handlers::attendance::get_all_attendance),
        )
        .route(
            "/getAttendanceSummary",
            get(handlers::attendance::get_attendance_summary),
        )
        .route("/status", get(handlers::attendance::get_attendance_status))
        // Both correction paths share one handler; the older route name is
        // kept for compatibility with existing clients.
        .route(
            "/UpdateAttendance/:id",
            put(handlers::attendance::edit_attendance),
        )
        .route(
            "/updateAttendanceAdmin/:id",
            put(handlers::attendance::edit_attendance),
        )
        .route(
            "/createDailyAttendance",
            post(handlers::attendance::create_daily_attendance),
        )
        .route(
            "/getMonthlyAttendanceGraph",
            get(handlers::attendance::get_monthly_attendance_graph),
        )
        .route(
            "/setCompanyTiming",
            post(handlers::attendance::set_company_timing),
        )
        .route(
            "/getCompanyTiming",
            get(handlers::attendance::get_company_timing),
        );

    let leave_routes = Router::new()
        .route("/apply", post(handlers::leave::apply_leave))
        .route(
            "/updateLeaveStatus/:id",
            put(handlers::leave::update_leave_status),
        )
        .route("/updateLeave/:id", put(handlers::leave::update_leave))
        .route("/deleteLeave/:id", delete(handlers::leave::delete_leave))
        .route("/getAllLeaves", get(handlers::leave::get_all_leaves))
        .route(
            "/employee/:employeeId",
            get(handlers::leave::get_employee_leaves),
        );

    let payroll_routes = Router::new()
        .route(
            "/generatePayroll",
            post(handlers::payroll::generate_payroll),
        )
        .route("/approve/:id", put(handlers::payroll::approve_payroll))
        .route("/updatePayroll/:id", put(handlers::payroll::update_payroll))
        .route("/getAllPayrolls", get(handlers::payroll::get_all_payrolls))
        .route(
            "/employee/:employeeId",
            get(handlers::payroll::get_employee_payrolls),
        )
        .route(
            "/generateSalarySlip/:id",
            post(handlers::payroll::generate_salary_slip),
        );

    let employee_routes = Router::new()
        .route(
            "/",
            post(handlers::employee::create_employee).get(handlers::employee::get_all_employees),
        )
        .route(
            "/:id",
            get(handlers::employee::get_employee)
                .put(handlers::employee::update_employee)
                .delete(handlers::employee::delete_employee),
        );

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/attendance", attendance_routes)
        .nest("/leaves", leave_routes)
        .nest("/payroll", payroll_routes)
        .nest("/employees", employee_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: HrConfig) -> Result<Self, AppError> {
        let db = HrDb::connect(&config.mongodb.uri, &config.mongodb.database)
            .await
            .map_err(|e| {
                tracing::error!("Failed to connect to MongoDB: {}", e);
                e
            })?;

        db.initialize_indexes().await.map_err(|e| {
            tracing::error!("Failed to initialize database indexes: {}", e);
            e
        })?;

        let push_provider: Arc<dyn PushProvider> = if config.fcm.enabled {
            tracing::info!("FCM push provider initialized");
            Arc::new(FcmProvider::new(config.fcm.clone()))
        } else {
            tracing::info!("FCM provider disabled, using mock push provider");
            Arc::new(MockPushProvider::new(true))
        };

        let slips: Arc<dyn SlipGenerator> = Arc::new(
            LocalSlipWriter::new(&config.slips.dir).await.map_err(|e| {
                tracing::error!(
                    "Failed to initialize salary slip storage at {}: {}",
                    config.slips.dir,
                    e
                );
                e
            })?,
        );

        let state = AppState {
            config: config.clone(),
            db,
            notifier: Notifier::new(push_provider),
            slips,
        };

        // Port 0 = random port for testing.
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("hr-service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get a reference to the database.
    pub fn db(&self) -> &HrDb {
        &self.state.db
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let app = router(self.state);
        axum::serve(self.listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
