pub mod email;

pub use email::{EmailError, EmailService, EmailTemplate, ReminderEmail, ReminderMailer};

#[cfg(test)]
pub use email::MockReminderMailer;
