use crate::models::PayrollRecord;
use async_trait::async_trait;
use service_core::error::AppError;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;

/// Renders and stores a salary-slip document for a payroll record, returning
/// a reference to the stored document. Rendering is an external concern; the
/// local writer produces a plain-text slip.
#[async_trait]
pub trait SlipGenerator: Send + Sync {
    async fn generate(&self, payroll: &PayrollRecord) -> Result<String, AppError>;
}

pub struct LocalSlipWriter {
    base_dir: PathBuf,
}

impl LocalSlipWriter {
    pub async fn new(base_dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let base_dir = base_dir.into();
        if !base_dir.exists() {
            fs::create_dir_all(&base_dir).await?;
        }
        Ok(Self { base_dir })
    }
}

#[async_trait]
impl SlipGenerator for LocalSlipWriter {
    async fn generate(&self, payroll: &PayrollRecord) -> Result<String, AppError> {
        let file_name = format!(
            "salary-slip-{}-{}-{}.txt",
            payroll.id, payroll.month, payroll.year
        );
        let path = self.base_dir.join(&file_name);

        fs::write(&path, render_slip(payroll)).await?;

        tracing::info!(
            payroll_id = %payroll.id,
            path = %path.display(),
            "Salary slip written"
        );

        Ok(format!("{}/{}", self.base_dir.display(), file_name))
    }
}

fn render_slip(payroll: &PayrollRecord) -> String {
    let mut out = String::new();

    out.push_str("SALARY SLIP\n");
    out.push_str("===========\n\n");
    out.push_str(&format!("Employee ID: {}\n", payroll.employee_id));
    out.push_str(&format!("Period: {} {}\n", payroll.month, payroll.year));
    out.push_str(&format!(
        "Processed At: {}\n\n",
        payroll.processed_at.format("%Y-%m-%d")
    ));
    out.push_str(&format!(
        "Days: {} present, {} on approved leave, {} working days\n\n",
        payroll.present_days, payroll.approved_leaves, payroll.total_working_days
    ));

    out.push_str("Earnings\n");
    out.push_str(&format!("  Basic Salary        {:>12.2}\n", payroll.basic_salary));
    out.push_str(&format!(
        "  Medical Allowance   {:>12.2}\n",
        payroll.allowances.medical
    ));
    out.push_str(&format!(
        "  Transport Allowance {:>12.2}\n",
        payroll.allowances.transport
    ));
    out.push_str(&format!(
        "  Other Allowance     {:>12.2}\n\n",
        payroll.allowances.others
    ));

    out.push_str("Deductions\n");
    out.push_str(&format!("  PF                  {:>12.2}\n", payroll.deductions.pf));
    out.push_str(&format!("  Loan                {:>12.2}\n", payroll.deductions.loan));
    out.push_str(&format!(
        "  Advance Salary      {:>12.2}\n",
        payroll.deductions.advance_salary
    ));
    out.push_str(&format!("  Tax                 {:>12.2}\n", payroll.deductions.tax));
    out.push_str(&format!(
        "  Other               {:>12.2}\n\n",
        payroll.deductions.others
    ));

    out.push_str(&format!("Gross Salary          {:>12.2}\n", payroll.gross_salary));
    out.push_str(&format!("Net Pay               {:>12.2}\n", payroll.net_pay));

    out
}

/// Mock generator for tests; returns a counted reference without touching
/// the filesystem.
pub struct MockSlipGenerator {
    generate_count: AtomicU64,
}

impl MockSlipGenerator {
    pub fn new() -> Self {
        Self {
            generate_count: AtomicU64::new(0),
        }
    }

    pub fn generate_count(&self) -> u64 {
        self.generate_count.load(Ordering::SeqCst)
    }
}

impl Default for MockSlipGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SlipGenerator for MockSlipGenerator {
    async fn generate(&self, payroll: &PayrollRecord) -> Result<String, AppError> {
        let n = self.generate_count.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(payroll_id = %payroll.id, "[MOCK] Salary slip would be generated");
        Ok(format!("mock-slip-{}", n))
    }
}
