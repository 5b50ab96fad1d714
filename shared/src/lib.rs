use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle states an invoice can be stored in.
///
/// `Sent` and `Overdue` are the only states the reminder job touches;
/// `Draft` and `Paid` are owned by the invoicing flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "sent" => Some(Self::Sent),
            "paid" => Some(Self::Paid),
            "overdue" => Some(Self::Overdue),
            _ => None,
        }
    }

    pub const ALL: [&'static str; 4] = ["draft", "sent", "paid", "overdue"];
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The status an invoice should be presented with, derived from its stored
/// status and due date. A past-due unpaid invoice reads as "overdue" even
/// before the batch job has persisted the transition; a sent invoice that is
/// not yet due reads as "due".
pub fn effective_status<'a>(
    status: &'a str,
    due_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> &'a str {
    match status {
        "paid" | "draft" => status,
        _ => {
            if due_date.is_some_and(|due| due < now) {
                "overdue"
            } else if status == "sent" {
                "due"
            } else {
                status
            }
        }
    }
}

/// Resolve the name a customer should be displayed under: the registered
/// business name for business customers, "first last" for individuals.
pub fn display_name(
    customer_type: &str,
    first_name: Option<&str>,
    last_name: Option<&str>,
    business_name: Option<&str>,
) -> String {
    if customer_type == "business" {
        business_name.unwrap_or_default().to_string()
    } else {
        format!(
            "{} {}",
            first_name.unwrap_or_default(),
            last_name.unwrap_or_default()
        )
        .trim()
        .to_string()
    }
}

#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    /// "individual" or "business"
    pub customer_type: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub business_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub id_number: Option<String>,
    pub registration_number: Option<String>,
    pub vat_number: Option<String>,
    pub tax_number: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn display_name(&self) -> String {
        display_name(
            &self.customer_type,
            self.first_name.as_deref(),
            self.last_name.as_deref(),
            self.business_name.as_deref(),
        )
    }
}

#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub customer_id: Uuid,
    pub status: String,
    pub priority: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Integer minor units (cents)
    pub budget: Option<i64>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub customer_id: Uuid,
    pub project_id: Option<Uuid>,
    /// Integer minor units (cents)
    pub amount: i64,
    pub status: String,
    pub issue_date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub last_reminder_sent: Option<DateTime<Utc>>,
    pub reminder_count: i32,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only audit record of a dispatched payment reminder.
///
/// Deduplication reads `invoices.last_reminder_sent`, not this table.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderLogEntry {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub sent_at: DateTime<Utc>,
    pub reminder_type: String,
}
