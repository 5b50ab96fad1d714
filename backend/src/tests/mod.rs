pub mod integration;
pub mod unit;

// Common test utilities and shared test setup

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashSet;
use std::sync::Mutex;
use uuid::Uuid;

use crate::services::{EmailError, ReminderEmail, ReminderMailer};

/// Connects to the database named by TEST_DATABASE_URL and runs migrations.
/// Returns None (and the caller skips) when the variable is unset, so the
/// suite passes on machines without a test database.
pub struct TestContext {
    pub db_pool: PgPool,
}

impl TestContext {
    pub async fn new() -> Option<Self> {
        let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set; skipping database-backed test");
            return None;
        };

        let pool = PgPool::connect(&database_url)
            .await
            .expect("Failed to connect to test database");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        Some(Self { db_pool: pool })
    }

    /// Clean up test data between tests
    pub async fn cleanup(&self) {
        for table in ["reminder_log", "invoices", "projects", "customers"] {
            sqlx::query(&format!("TRUNCATE TABLE {} CASCADE", table))
                .execute(&self.db_pool)
                .await
                .ok();
        }
    }
}

/// Mailer double that records every dispatched reminder and can be told to
/// fail for specific invoices.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<ReminderEmail>>,
    fail_for: Mutex<HashSet<Uuid>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, invoice_id: Uuid) {
        self.fail_for.lock().unwrap().insert(invoice_id);
    }

    pub fn sent(&self) -> Vec<ReminderEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_for(&self, invoice_id: Uuid) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.invoice_id == invoice_id)
            .count()
    }

    pub fn total_sent(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl ReminderMailer for RecordingMailer {
    async fn send_reminder(&self, reminder: &ReminderEmail) -> Result<(), EmailError> {
        if self.fail_for.lock().unwrap().contains(&reminder.invoice_id) {
            let err = "missing-at-sign"
                .parse::<lettre::Address>()
                .expect_err("address without @ must not parse");
            return Err(EmailError::Address(err));
        }
        self.sent.lock().unwrap().push(reminder.clone());
        Ok(())
    }
}
