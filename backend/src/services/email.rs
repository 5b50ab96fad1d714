use crate::config::SmtpConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::{authentication::Credentials, PoolConfig},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("invalid mailbox address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("smtp transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// Payload for a single overdue-invoice reminder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderEmail {
    pub invoice_id: Uuid,
    pub invoice_number: String,
    pub customer_email: String,
    /// Preformatted currency string, e.g. "$500.00"
    pub total: String,
    pub due_date: Option<DateTime<Utc>>,
    /// Reminders already sent for this invoice
    pub reminder_count: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub subject: String,
    pub html_body: String,
    pub text_body: Option<String>,
}

/// Dispatch seam for the reminder job, so tests can observe sends without a
/// live SMTP server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReminderMailer: Send + Sync {
    async fn send_reminder(&self, reminder: &ReminderEmail) -> Result<(), EmailError>;
}

#[derive(Debug, Clone)]
pub struct EmailService {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_email: String,
    from_name: String,
    app_base_url: String,
}

impl EmailService {
    pub async fn new(smtp_config: &SmtpConfig, app_base_url: &str) -> Result<Self, EmailError> {
        let creds = Credentials::new(
            smtp_config.username.clone(),
            smtp_config.password.clone(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp_config.host)
            .port(smtp_config.port)
            .credentials(creds)
            .pool_config(PoolConfig::new().max_size(10))
            .timeout(Some(Duration::from_secs(10)))
            .build();

        Ok(EmailService {
            transport,
            from_email: smtp_config.from_email.clone(),
            from_name: smtp_config.from_name.clone(),
            app_base_url: app_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn send_email(
        &self,
        to_email: &str,
        to_name: Option<&str>,
        subject: &str,
        html_body: &str,
        text_body: Option<&str>,
    ) -> Result<(), EmailError> {
        let from = format!("{} <{}>", self.from_name, self.from_email).parse::<Mailbox>()?;

        let to = if let Some(name) = to_name {
            format!("{} <{}>", name, to_email).parse::<Mailbox>()?
        } else {
            to_email.parse::<Mailbox>()?
        };

        let message_builder = Message::builder().from(from).to(to).subject(subject);

        let message = if let Some(text) = text_body {
            message_builder.multipart(
                lettre::message::MultiPart::alternative()
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text.to_string()),
                    )
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?
        } else {
            message_builder.body(html_body.to_string())?
        };

        match self.transport.send(message).await {
            Ok(_) => {
                info!("Email sent successfully to {}", to_email);
                Ok(())
            }
            Err(e) => {
                error!("Failed to send email to {}: {}", to_email, e);
                Err(e.into())
            }
        }
    }

    /// Template for overdue payment reminders
    pub fn reminder_template(&self, reminder: &ReminderEmail) -> EmailTemplate {
        let subject = format!(
            "Payment Reminder: Invoice #{} is overdue",
            reminder.invoice_number
        );

        let now = Utc::now();
        let due_date_str = reminder
            .due_date
            .map(|d| d.format("%B %d, %Y").to_string())
            .unwrap_or_else(|| "-".to_string());
        let days = reminder
            .due_date
            .map(|d| days_overdue(d, now))
            .unwrap_or(0);
        let invoice_url = format!("{}/invoices/{}", self.app_base_url, reminder.invoice_id);

        let html_body = format!(
            r#"
            <h2>Payment Reminder</h2>
            <p>This is a friendly reminder that Invoice #{} is now overdue.</p>
            <p><strong>Amount Due:</strong> {}</p>
            <p><strong>Due Date:</strong> {}</p>
            <p><strong>Days Overdue:</strong> {}</p>
            <p>Please submit payment at your earliest convenience.</p>
            <a href="{}">View Invoice</a>
            "#,
            reminder.invoice_number, reminder.total, due_date_str, days, invoice_url
        );

        let text_body = format!(
            "Payment Reminder\n\n\
            This is a friendly reminder that Invoice #{} is now overdue.\n\n\
            Amount Due: {}\n\
            Due Date: {}\n\
            Days Overdue: {}\n\n\
            Please submit payment at your earliest convenience.\n\
            View the invoice at: {}",
            reminder.invoice_number, reminder.total, due_date_str, days, invoice_url
        );

        EmailTemplate {
            subject,
            html_body,
            text_body: Some(text_body),
        }
    }
}

#[async_trait]
impl ReminderMailer for EmailService {
    async fn send_reminder(&self, reminder: &ReminderEmail) -> Result<(), EmailError> {
        let template = self.reminder_template(reminder);
        self.send_email(
            &reminder.customer_email,
            None,
            &template.subject,
            &template.html_body,
            template.text_body.as_deref(),
        )
        .await
    }
}

/// Whole days elapsed since the due date.
pub fn days_overdue(due_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - due_date).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn smtp_config() -> SmtpConfig {
        SmtpConfig {
            host: "localhost".to_string(),
            port: 2525,
            username: "user".to_string(),
            password: "pass".to_string(),
            from_email: "invoices@example.com".to_string(),
            from_name: "Billing".to_string(),
            use_tls: false,
        }
    }

    fn sample_reminder() -> ReminderEmail {
        ReminderEmail {
            invoice_id: Uuid::new_v4(),
            invoice_number: "INV-001042".to_string(),
            customer_email: "customer@example.com".to_string(),
            total: "$500.00".to_string(),
            due_date: Some(Utc::now() - Duration::days(10)),
            reminder_count: 0,
        }
    }

    #[tokio::test]
    async fn reminder_template_contains_invoice_details() {
        let service = EmailService::new(&smtp_config(), "https://app.example.com")
            .await
            .unwrap();
        let reminder = sample_reminder();
        let template = service.reminder_template(&reminder);

        assert_eq!(
            template.subject,
            "Payment Reminder: Invoice #INV-001042 is overdue"
        );
        assert!(template.html_body.contains("$500.00"));
        assert!(template.html_body.contains(&format!(
            "https://app.example.com/invoices/{}",
            reminder.invoice_id
        )));
        let text = template.text_body.unwrap();
        assert!(text.contains("Days Overdue: 10"));
    }

    #[tokio::test]
    async fn base_url_trailing_slash_is_normalized() {
        let service = EmailService::new(&smtp_config(), "https://app.example.com/")
            .await
            .unwrap();
        let template = service.reminder_template(&sample_reminder());
        assert!(!template.html_body.contains("example.com//invoices"));
    }

    #[test]
    fn days_overdue_counts_whole_days() {
        let now = Utc::now();
        assert_eq!(days_overdue(now - Duration::days(4), now), 4);
        assert_eq!(days_overdue(now - Duration::hours(36), now), 1);
        assert_eq!(days_overdue(now, now), 0);
    }
}
