// End-to-end runs of the overdue reminder job against a real database.
//
// Every test skips (and passes) unless TEST_DATABASE_URL points at a
// disposable Postgres database. Tests truncate all tables, so never point
// this at anything you care about.

use serial_test::serial;
use std::sync::Arc;
use uuid::Uuid;

use crate::jobs::{DispatchOutcome, OverdueReminderJob};
use crate::tests::fixtures::{
    insert_customer, invoice_state, reminder_log_types, InvoiceFixture,
};
use crate::tests::{RecordingMailer, TestContext};

#[tokio::test]
#[serial]
async fn sent_invoice_past_due_is_promoted_and_reminded() {
    let Some(ctx) = TestContext::new().await else { return };
    ctx.cleanup().await;

    let customer = insert_customer(&ctx.db_pool, "a@example.com").await;
    let invoice = InvoiceFixture::new(customer, "INV-A", "sent")
        .due_days_ago(Some(10))
        .amount(50_000)
        .insert(&ctx.db_pool)
        .await;

    let mailer = Arc::new(RecordingMailer::new());
    let job = OverdueReminderJob::new(ctx.db_pool.clone(), mailer.clone());
    let result = job.run().await.unwrap();

    assert_eq!(result.summary.checked, 1);
    assert_eq!(result.summary.reminders_sent, 1);

    let state = invoice_state(&ctx.db_pool, invoice).await;
    assert_eq!(state.status, "overdue");
    assert_eq!(state.reminder_count, 1);
    assert!(state.has_last_reminder);

    assert_eq!(reminder_log_types(&ctx.db_pool, invoice).await, ["reminder_1"]);

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].invoice_number, "INV-A");
    assert_eq!(sent[0].customer_email, "a@example.com");
    assert_eq!(sent[0].total, "$500.00");
}

#[tokio::test]
#[serial]
async fn promotion_only_touches_past_due_sent_invoices() {
    let Some(ctx) = TestContext::new().await else { return };
    ctx.cleanup().await;

    let customer = insert_customer(&ctx.db_pool, "b@example.com").await;
    let future_due = InvoiceFixture::new(customer, "INV-FUTURE", "sent")
        .due_days_ago(Some(-5))
        .insert(&ctx.db_pool)
        .await;
    let draft = InvoiceFixture::new(customer, "INV-DRAFT", "draft")
        .due_days_ago(Some(10))
        .insert(&ctx.db_pool)
        .await;
    let paid = InvoiceFixture::new(customer, "INV-PAID", "paid")
        .due_days_ago(Some(10))
        .insert(&ctx.db_pool)
        .await;
    let no_due_date = InvoiceFixture::new(customer, "INV-NODUE", "sent")
        .due_days_ago(None)
        .insert(&ctx.db_pool)
        .await;
    let past_due = InvoiceFixture::new(customer, "INV-PAST", "sent")
        .due_days_ago(Some(1))
        .insert(&ctx.db_pool)
        .await;

    let mailer = Arc::new(RecordingMailer::new());
    let job = OverdueReminderJob::new(ctx.db_pool.clone(), mailer.clone());
    let result = job.run().await.unwrap();

    assert_eq!(result.summary.checked, 1);
    assert_eq!(invoice_state(&ctx.db_pool, past_due).await.status, "overdue");
    assert_eq!(invoice_state(&ctx.db_pool, future_due).await.status, "sent");
    assert_eq!(invoice_state(&ctx.db_pool, draft).await.status, "draft");
    assert_eq!(invoice_state(&ctx.db_pool, paid).await.status, "paid");
    assert_eq!(invoice_state(&ctx.db_pool, no_due_date).await.status, "sent");
}

#[tokio::test]
#[serial]
async fn reminder_within_cooldown_is_not_resent() {
    let Some(ctx) = TestContext::new().await else { return };
    ctx.cleanup().await;

    let customer = insert_customer(&ctx.db_pool, "c@example.com").await;
    let invoice = InvoiceFixture::new(customer, "INV-B", "overdue")
        .last_reminder_days_ago(Some(1))
        .reminder_count(1)
        .insert(&ctx.db_pool)
        .await;

    let mailer = Arc::new(RecordingMailer::new());
    let job = OverdueReminderJob::new(ctx.db_pool.clone(), mailer.clone());
    let result = job.run().await.unwrap();

    assert_eq!(result.summary.reminders_sent, 0);
    assert_eq!(mailer.total_sent(), 0);
    let state = invoice_state(&ctx.db_pool, invoice).await;
    assert_eq!(state.reminder_count, 1);
    assert!(reminder_log_types(&ctx.db_pool, invoice).await.is_empty());
}

#[tokio::test]
#[serial]
async fn reminder_after_cooldown_increments_count_and_logs() {
    let Some(ctx) = TestContext::new().await else { return };
    ctx.cleanup().await;

    let customer = insert_customer(&ctx.db_pool, "d@example.com").await;
    let invoice = InvoiceFixture::new(customer, "INV-C", "overdue")
        .last_reminder_days_ago(Some(4))
        .reminder_count(2)
        .insert(&ctx.db_pool)
        .await;

    let mailer = Arc::new(RecordingMailer::new());
    let job = OverdueReminderJob::new(ctx.db_pool.clone(), mailer.clone());
    let result = job.run().await.unwrap();

    assert_eq!(result.summary.reminders_sent, 1);
    assert_eq!(mailer.sent_for(invoice), 1);
    let state = invoice_state(&ctx.db_pool, invoice).await;
    assert_eq!(state.reminder_count, 3);
    assert_eq!(reminder_log_types(&ctx.db_pool, invoice).await, ["reminder_3"]);
}

#[tokio::test]
#[serial]
async fn reminder_exactly_at_cooldown_boundary_is_eligible() {
    let Some(ctx) = TestContext::new().await else { return };
    ctx.cleanup().await;

    // The selection uses lte: a reminder sent exactly three days ago is due
    // again. The clock only advances between insert and run, which keeps
    // this on the eligible side of the boundary.
    let customer = insert_customer(&ctx.db_pool, "boundary@example.com").await;
    let invoice = InvoiceFixture::new(customer, "INV-EDGE", "overdue")
        .last_reminder_days_ago(Some(3))
        .reminder_count(1)
        .insert(&ctx.db_pool)
        .await;

    let mailer = Arc::new(RecordingMailer::new());
    let job = OverdueReminderJob::new(ctx.db_pool.clone(), mailer.clone());
    let result = job.run().await.unwrap();

    assert_eq!(result.summary.reminders_sent, 1);
    assert_eq!(mailer.sent_for(invoice), 1);
    assert_eq!(invoice_state(&ctx.db_pool, invoice).await.reminder_count, 2);
}

#[tokio::test]
#[serial]
async fn missing_customer_is_skipped_without_aborting_the_batch() {
    let Some(ctx) = TestContext::new().await else { return };
    ctx.cleanup().await;

    let orphaned = InvoiceFixture::new(Uuid::new_v4(), "INV-ORPHAN", "overdue")
        .insert(&ctx.db_pool)
        .await;
    let customer = insert_customer(&ctx.db_pool, "e@example.com").await;
    let healthy = InvoiceFixture::new(customer, "INV-OK", "overdue")
        .insert(&ctx.db_pool)
        .await;

    let mailer = Arc::new(RecordingMailer::new());
    let job = OverdueReminderJob::new(ctx.db_pool.clone(), mailer.clone());
    let result = job.run().await.unwrap();

    // Both were selected; only the one with a customer was dispatched.
    assert_eq!(result.summary.reminders_sent, 2);
    assert_eq!(mailer.sent_for(orphaned), 0);
    assert_eq!(mailer.sent_for(healthy), 1);

    let orphan_outcome = result
        .outcomes
        .iter()
        .find(|o| o.invoice_id == orphaned)
        .unwrap();
    assert_eq!(orphan_outcome.outcome, DispatchOutcome::SkippedMissingCustomer);

    assert_eq!(invoice_state(&ctx.db_pool, orphaned).await.reminder_count, 0);
    assert_eq!(invoice_state(&ctx.db_pool, healthy).await.reminder_count, 1);
}

#[tokio::test]
#[serial]
async fn immediate_second_run_sends_nothing() {
    let Some(ctx) = TestContext::new().await else { return };
    ctx.cleanup().await;

    let customer = insert_customer(&ctx.db_pool, "f@example.com").await;
    let invoice = InvoiceFixture::new(customer, "INV-TWICE", "sent")
        .due_days_ago(Some(10))
        .insert(&ctx.db_pool)
        .await;

    let mailer = Arc::new(RecordingMailer::new());
    let job = OverdueReminderJob::new(ctx.db_pool.clone(), mailer.clone());

    let first = job.run().await.unwrap();
    assert_eq!(first.summary.reminders_sent, 1);

    let second = job.run().await.unwrap();
    assert_eq!(second.summary.checked, 0);
    assert_eq!(second.summary.reminders_sent, 0);
    assert_eq!(mailer.sent_for(invoice), 1);
    assert_eq!(invoice_state(&ctx.db_pool, invoice).await.reminder_count, 1);
}

#[tokio::test]
#[serial]
async fn failed_dispatch_leaves_reminder_state_untouched() {
    let Some(ctx) = TestContext::new().await else { return };
    ctx.cleanup().await;

    let customer = insert_customer(&ctx.db_pool, "g@example.com").await;
    let failing = InvoiceFixture::new(customer, "INV-FAIL", "overdue")
        .insert(&ctx.db_pool)
        .await;
    let succeeding = InvoiceFixture::new(customer, "INV-GOOD", "overdue")
        .insert(&ctx.db_pool)
        .await;

    let mailer = Arc::new(RecordingMailer::new());
    mailer.fail_for(failing);
    let job = OverdueReminderJob::new(ctx.db_pool.clone(), mailer.clone());
    let result = job.run().await.unwrap();

    // The summary reports invoices selected, not sends that succeeded; the
    // partial failure leaves the count at 2. This pins the trigger's
    // long-standing response shape.
    assert_eq!(result.summary.reminders_sent, 2);
    assert!(result
        .outcomes
        .iter()
        .any(|o| o.invoice_id == failing && matches!(o.outcome, DispatchOutcome::Failed(_))));

    let failed_state = invoice_state(&ctx.db_pool, failing).await;
    assert_eq!(failed_state.reminder_count, 0);
    assert!(!failed_state.has_last_reminder);
    assert!(reminder_log_types(&ctx.db_pool, failing).await.is_empty());

    let good_state = invoice_state(&ctx.db_pool, succeeding).await;
    assert_eq!(good_state.reminder_count, 1);
    assert_eq!(
        reminder_log_types(&ctx.db_pool, succeeding).await,
        ["reminder_1"]
    );
}

#[tokio::test]
#[serial]
async fn run_with_nothing_due_is_a_noop() {
    let Some(ctx) = TestContext::new().await else { return };
    ctx.cleanup().await;

    let mailer = Arc::new(RecordingMailer::new());
    let job = OverdueReminderJob::new(ctx.db_pool.clone(), mailer.clone());
    let result = job.run().await.unwrap();

    assert_eq!(result.summary.checked, 0);
    assert_eq!(result.summary.reminders_sent, 0);
    assert!(result.outcomes.is_empty());
    assert_eq!(mailer.total_sent(), 0);
}
