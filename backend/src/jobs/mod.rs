// Background Jobs
//
// Batch work that runs outside the request path. The overdue reminder job is
// triggered by an external scheduler through the authenticated cron endpoint.

pub mod overdue_reminders;

pub use overdue_reminders::{
    DispatchOutcome, OverdueCheckResult, OverdueCheckSummary, OverdueReminderJob,
    ReminderOutcome, REMINDER_COOLDOWN_DAYS,
};
