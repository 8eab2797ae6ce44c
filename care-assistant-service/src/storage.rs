use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use thiserror::Error;
use tracing::info;

use crate::models::{MedicalReport, NewMedicalReport, ReportSummary};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Trait for storing and retrieving medical report records
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn create(&self, report: NewMedicalReport) -> Result<MedicalReport>;
    async fn list(&self) -> Result<Vec<MedicalReport>>;
    async fn get(&self, id: i32) -> Result<Option<MedicalReport>>;
    /// Returns `None` when no report has the given id.
    async fn set_verified(&self, id: i32, verified: bool) -> Result<Option<MedicalReport>>;
    async fn list_by_caretaker(&self, caretaker_id: i32) -> Result<Vec<ReportSummary>>;
    async fn list_by_doctor(&self, doctor_id: i32) -> Result<Vec<ReportSummary>>;
}

/// In-memory implementation of ReportStore
pub struct InMemoryReportStore {
    reports: Arc<DashMap<i32, MedicalReport>>,
    next_id: AtomicI32,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self {
            reports: Arc::new(DashMap::new()),
            next_id: AtomicI32::new(1),
        }
    }

    fn summaries_where<F>(&self, keep: F) -> Vec<ReportSummary>
    where
        F: Fn(&MedicalReport) -> bool,
    {
        let mut summaries: Vec<ReportSummary> = self
            .reports
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| ReportSummary::from(entry.value()))
            .collect();
        summaries.sort_by_key(|summary| (summary.created_at, summary.id));
        summaries
    }
}

impl Default for InMemoryReportStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    async fn create(&self, report: NewMedicalReport) -> Result<MedicalReport> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = MedicalReport {
            id,
            patient_id: report.patient_id,
            caretaker_id: report.caretaker_id,
            doctor_id: report.doctor_id,
            symptoms: report.symptoms,
            detailed_analysis: report.detailed_analysis,
            precautions: report.precautions,
            type_of_doctors: report.type_of_doctors,
            predictions: report.predictions,
            verified: report.verified,
            created_at: Utc::now(),
        };
        self.reports.insert(id, record.clone());
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<MedicalReport>> {
        let mut reports: Vec<MedicalReport> =
            self.reports.iter().map(|entry| entry.value().clone()).collect();
        reports.sort_by_key(|report| report.id);
        Ok(reports)
    }

    async fn get(&self, id: i32) -> Result<Option<MedicalReport>> {
        Ok(self.reports.get(&id).map(|entry| entry.clone()))
    }

    async fn set_verified(&self, id: i32, verified: bool) -> Result<Option<MedicalReport>> {
        Ok(self.reports.get_mut(&id).map(|mut entry| {
            entry.verified = verified;
            entry.clone()
        }))
    }

    async fn list_by_caretaker(&self, caretaker_id: i32) -> Result<Vec<ReportSummary>> {
        Ok(self.summaries_where(|report| report.caretaker_id == caretaker_id))
    }

    async fn list_by_doctor(&self, doctor_id: i32) -> Result<Vec<ReportSummary>> {
        Ok(self.summaries_where(|report| report.doctor_id == doctor_id))
    }
}

const CREATE_REPORTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS reports (
    id SERIAL PRIMARY KEY,
    symptoms TEXT NOT NULL,
    detailed_analysis TEXT NOT NULL,
    precautions TEXT[] NOT NULL,
    type_of_doctors VARCHAR(255) NOT NULL,
    predictions TEXT[] NOT NULL,
    patient_id INTEGER NOT NULL,
    caretaker_id INTEGER NOT NULL,
    doctor_id INTEGER NOT NULL,
    verified BOOLEAN NOT NULL DEFAULT FALSE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const REPORT_COLUMNS: &str = "id, patient_id, caretaker_id, doctor_id, symptoms, detailed_analysis, \
     precautions, type_of_doctors, predictions, verified, created_at";

const SUMMARY_COLUMNS: &str = "id, patient_id, detailed_analysis, verified, created_at";

/// PostgreSQL implementation of ReportStore
pub struct PostgresReportStore {
    pool: PgPool,
}

impl PostgresReportStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: PgPool) -> Result<Self> {
        sqlx::query(CREATE_REPORTS_TABLE).execute(&pool).await?;
        info!("Reports table ready");
        Ok(Self { pool })
    }
}

#[async_trait]
impl ReportStore for PostgresReportStore {
    async fn create(&self, report: NewMedicalReport) -> Result<MedicalReport> {
        let sql = format!(
            "INSERT INTO reports (patient_id, caretaker_id, doctor_id, symptoms, detailed_analysis, \
             precautions, type_of_doctors, predictions, verified) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {REPORT_COLUMNS}"
        );
        let record = sqlx::query_as::<_, MedicalReport>(&sql)
            .bind(report.patient_id)
            .bind(report.caretaker_id)
            .bind(report.doctor_id)
            .bind(report.symptoms)
            .bind(report.detailed_analysis)
            .bind(report.precautions)
            .bind(report.type_of_doctors)
            .bind(report.predictions)
            .bind(report.verified)
            .fetch_one(&self.pool)
            .await?;
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<MedicalReport>> {
        let sql = format!("SELECT {REPORT_COLUMNS} FROM reports ORDER BY id");
        let reports = sqlx::query_as::<_, MedicalReport>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(reports)
    }

    async fn get(&self, id: i32) -> Result<Option<MedicalReport>> {
        let sql = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1");
        let report = sqlx::query_as::<_, MedicalReport>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(report)
    }

    async fn set_verified(&self, id: i32, verified: bool) -> Result<Option<MedicalReport>> {
        let sql = format!("UPDATE reports SET verified = $2 WHERE id = $1 RETURNING {REPORT_COLUMNS}");
        let report = sqlx::query_as::<_, MedicalReport>(&sql)
            .bind(id)
            .bind(verified)
            .fetch_optional(&self.pool)
            .await?;
        Ok(report)
    }

    async fn list_by_caretaker(&self, caretaker_id: i32) -> Result<Vec<ReportSummary>> {
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM reports WHERE caretaker_id = $1 ORDER BY created_at, id"
        );
        let summaries = sqlx::query_as::<_, ReportSummary>(&sql)
            .bind(caretaker_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(summaries)
    }

    async fn list_by_doctor(&self, doctor_id: i32) -> Result<Vec<ReportSummary>> {
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM reports WHERE doctor_id = $1 ORDER BY created_at, id"
        );
        let summaries = sqlx::query_as::<_, ReportSummary>(&sql)
            .bind(doctor_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(summaries)
    }
}
