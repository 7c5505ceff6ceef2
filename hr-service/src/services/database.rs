use crate::models::{AttendanceRecord, CompanyTiming, Employee, LeaveRequest, PayrollRecord};
use mongodb::{
    bson::doc, options::IndexOptions, Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

#[derive(Clone)]
pub struct HrDb {
    client: MongoClient,
    db: Database,
}

impl HrDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(uri = %uri, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB at {}: {}", uri, e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    /// Creates the indexes the business rules lean on. The two unique
    /// compound indexes are load-bearing: they are the only cross-document
    /// guardrails against concurrent writers (no multi-document
    /// transactions are used anywhere).
    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for hr-service");

        self.create_index(
            self.employees(),
            doc! { "employee_id": 1 },
            "employee_code_idx",
            true,
        )
        .await?;
        self.create_index(self.employees(), doc! { "email": 1 }, "email_idx", true)
            .await?;

        self.create_index(
            self.leaves(),
            doc! { "employee_id": 1, "status": 1 },
            "leave_employee_status_idx",
            false,
        )
        .await?;
        self.create_index(
            self.leaves(),
            doc! { "applied_at": -1 },
            "leave_applied_at_idx",
            false,
        )
        .await?;

        // One attendance record per employee per calendar day.
        self.create_index(
            self.attendance(),
            doc! { "employee.employee_id": 1, "date": 1 },
            "attendance_employee_day_idx",
            true,
        )
        .await?;
        self.create_index(self.attendance(), doc! { "date": -1 }, "attendance_date_idx", false)
            .await?;

        // One payroll record per employee per month/year.
        self.create_index(
            self.payrolls(),
            doc! { "employee_id": 1, "month": 1, "year": 1 },
            "payroll_period_idx",
            true,
        )
        .await?;
        self.create_index(
            self.payrolls(),
            doc! { "processed_at": -1 },
            "payroll_processed_at_idx",
            false,
        )
        .await?;

        tracing::info!("Successfully created all MongoDB indexes");
        Ok(())
    }

    async fn create_index<T: Send + Sync>(
        &self,
        collection: Collection<T>,
        keys: mongodb::bson::Document,
        name: &str,
        unique: bool,
    ) -> Result<(), AppError> {
        let mut options = IndexOptions::builder().name(name.to_string()).build();
        options.unique = unique.then_some(true);

        let index = IndexModel::builder().keys(keys).options(options).build();

        collection.create_index(index, None).await.map_err(|e| {
            tracing::error!("Failed to create index {}: {}", name, e);
            AppError::from(e)
        })?;
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    pub fn employees(&self) -> Collection<Employee> {
        self.db.collection("employees")
    }

    pub fn leaves(&self) -> Collection<LeaveRequest> {
        self.db.collection("leaves")
    }

    pub fn attendance(&self) -> Collection<AttendanceRecord> {
        self.db.collection("attendance")
    }

    pub fn payrolls(&self) -> Collection<PayrollRecord> {
        self.db.collection("payrolls")
    }

    pub fn company_timing(&self) -> Collection<CompanyTiming> {
        self.db.collection("company_timing")
    }

    /// Employees are referenced by their human-readable code everywhere on
    /// the API surface.
    pub async fn find_employee_by_code(&self, code: &str) -> Result<Option<Employee>, AppError> {
        self.employees()
            .find_one(doc! { "employee_id": code }, None)
            .await
            .map_err(AppError::from)
    }

    pub fn client(&self) -> &MongoClient {
        &self.client
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

/// True when the error is a unique-index violation (E11000), which the
/// handlers surface as a conflict rather than a server error.
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_err)) => write_err.code == 11000,
        ErrorKind::Command(command_err) => command_err.code == 11000,
        _ => false,
    }
}
