//! Database Connection Pool using sqlx

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::database::feedback::FeedbackRepository;
use crate::error::{AppError, AppResult};

pub struct DatabasePool {
    pool: PgPool,
    feedback: FeedbackRepository,
}

impl DatabasePool {
    pub async fn new(connection_string: &str) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(connection_string)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to connect to PostgreSQL: {}", e)))?;

        info!("Connected to PostgreSQL");

        let feedback = FeedbackRepository::new(pool.clone());

        Ok(Self { pool, feedback })
    }

    pub async fn init_schema(&self) -> AppResult<()> {
        info!("Initializing database schema...");

        sqlx::query("CREATE SCHEMA IF NOT EXISTS feedback")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to create feedback schema: {}", e)))?;

        self.feedback.init_tables().await?;

        info!("Database schema initialized");
        Ok(())
    }

    pub fn feedback(&self) -> &FeedbackRepository {
        &self.feedback
    }
}
