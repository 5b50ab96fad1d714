// Overdue Reminder Job - promotes past-due invoices and dispatches payment reminders
//
// Two overlapping invocations are not guarded against each other: both can
// select the same invoice and send a duplicate reminder before either records
// last_reminder_sent. Runs are expected to come from a single external
// scheduler tick, so the window is accepted rather than locked away.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::services::{ReminderEmail, ReminderMailer};

/// Minimum days between reminders for the same invoice.
pub const REMINDER_COOLDOWN_DAYS: i64 = 3;

pub struct OverdueReminderJob {
    db_pool: PgPool,
    mailer: Arc<dyn ReminderMailer>,
}

/// Summary returned to the cron trigger.
///
/// `reminders_sent` reports the number of invoices *selected* for reminding,
/// not the number of dispatches that succeeded; a mailer failure partway
/// through the batch does not reduce it. Per-invoice results live in
/// [`OverdueCheckResult::outcomes`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OverdueCheckSummary {
    /// Invoices promoted from sent to overdue in this run
    pub checked: usize,
    pub reminders_sent: usize,
}

#[derive(Debug)]
pub struct OverdueCheckResult {
    pub summary: OverdueCheckSummary,
    pub outcomes: Vec<ReminderOutcome>,
}

#[derive(Debug)]
pub struct ReminderOutcome {
    pub invoice_id: Uuid,
    pub outcome: DispatchOutcome,
}

#[derive(Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    SkippedMissingCustomer,
    Failed(String),
}

#[derive(Debug, FromRow)]
struct ReminderCandidate {
    id: Uuid,
    invoice_number: String,
    customer_id: Uuid,
    amount: i64,
    due_date: Option<DateTime<Utc>>,
    reminder_count: i32,
}

impl OverdueReminderJob {
    pub fn new(db_pool: PgPool, mailer: Arc<dyn ReminderMailer>) -> Self {
        Self { db_pool, mailer }
    }

    /// Run one overdue check: promote past-due sent invoices to overdue, then
    /// send a reminder for every overdue invoice outside the cooldown window.
    ///
    /// Store failures in the two selects propagate; everything per-invoice is
    /// recorded as an outcome and never aborts the batch.
    pub async fn run(&self) -> Result<OverdueCheckResult, sqlx::Error> {
        let now = Utc::now();

        let promoted = self.promote_overdue(now).await?;
        let candidates = self.reminder_candidates(now).await?;

        let summary = OverdueCheckSummary {
            checked: promoted.len(),
            reminders_sent: candidates.len(),
        };

        let mut outcomes = Vec::with_capacity(candidates.len());
        for invoice in &candidates {
            let outcome = self.dispatch_reminder(invoice, now).await;
            if let DispatchOutcome::Sent = outcome {
                info!("Sent payment reminder for invoice {}", invoice.invoice_number);
            }
            outcomes.push(ReminderOutcome {
                invoice_id: invoice.id,
                outcome,
            });
        }

        info!(
            "Overdue check completed: {} promoted, {} selected for reminding",
            summary.checked, summary.reminders_sent
        );

        Ok(OverdueCheckResult { summary, outcomes })
    }

    /// Step 1: flip every sent invoice whose due date has passed to overdue.
    /// The id set is fixed by the initial select; concurrent status writes by
    /// other components are last-write-wins.
    async fn promote_overdue(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, sqlx::Error> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM invoices WHERE due_date <= $1 AND status = 'sent'",
        )
        .bind(now)
        .fetch_all(&self.db_pool)
        .await?;

        for id in &ids {
            sqlx::query(
                "UPDATE invoices SET status = 'overdue', updated_at = NOW() WHERE id = $1",
            )
            .bind(id)
            .execute(&self.db_pool)
            .await?;
        }

        Ok(ids)
    }

    /// Step 2: overdue invoices not reminded within the cooldown window.
    /// Runs strictly after promotion, so invoices promoted this run are
    /// already eligible.
    async fn reminder_candidates(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReminderCandidate>, sqlx::Error> {
        let threshold = now - Duration::days(REMINDER_COOLDOWN_DAYS);

        sqlx::query_as::<_, ReminderCandidate>(
            "SELECT id, invoice_number, customer_id, amount, due_date, reminder_count
             FROM invoices
             WHERE status = 'overdue'
               AND (last_reminder_sent IS NULL OR last_reminder_sent <= $1)
             ORDER BY due_date ASC",
        )
        .bind(threshold)
        .fetch_all(&self.db_pool)
        .await
    }

    async fn dispatch_reminder(
        &self,
        invoice: &ReminderCandidate,
        now: DateTime<Utc>,
    ) -> DispatchOutcome {
        let customer_email = match self.customer_email(invoice.customer_id).await {
            Ok(Some(email)) => email,
            Ok(None) => {
                warn!("No customer found for invoice {}", invoice.id);
                return DispatchOutcome::SkippedMissingCustomer;
            }
            Err(e) => {
                error!("Failed to look up customer for invoice {}: {}", invoice.id, e);
                return DispatchOutcome::Failed(e.to_string());
            }
        };

        let reminder = ReminderEmail {
            invoice_id: invoice.id,
            invoice_number: invoice.invoice_number.clone(),
            customer_email,
            total: format_cents(invoice.amount),
            due_date: invoice.due_date,
            reminder_count: invoice.reminder_count,
        };

        if let Err(e) = self.mailer.send_reminder(&reminder).await {
            error!("Failed to send reminder for invoice {}: {}", invoice.id, e);
            return DispatchOutcome::Failed(e.to_string());
        }

        let new_count = invoice.reminder_count + 1;
        if let Err(e) = self.record_dispatch(invoice.id, new_count, now).await {
            error!("Failed to record reminder for invoice {}: {}", invoice.id, e);
            return DispatchOutcome::Failed(e.to_string());
        }

        DispatchOutcome::Sent
    }

    async fn customer_email(&self, customer_id: Uuid) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT email FROM customers WHERE id = $1")
            .bind(customer_id)
            .fetch_optional(&self.db_pool)
            .await
    }

    /// The invoice row is the dedup source of truth, so it is written before
    /// the audit row.
    async fn record_dispatch(
        &self,
        invoice_id: Uuid,
        new_count: i32,
        now: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE invoices
             SET last_reminder_sent = $2, reminder_count = $3, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(invoice_id)
        .bind(now)
        .bind(new_count)
        .execute(&self.db_pool)
        .await?;

        sqlx::query(
            "INSERT INTO reminder_log (invoice_id, sent_at, reminder_type)
             VALUES ($1, $2, $3)",
        )
        .bind(invoice_id)
        .bind(now)
        .bind(reminder_type(new_count))
        .execute(&self.db_pool)
        .await?;

        Ok(())
    }
}

/// Audit label for the nth reminder of an invoice.
pub fn reminder_type(count: i32) -> String {
    format!("reminder_{}", count)
}

/// Render integer minor units as a 2-decimal currency string.
pub fn format_cents(amount: i64) -> String {
    format!("${}.{:02}", amount / 100, amount % 100)
}
