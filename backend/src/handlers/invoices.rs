use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, patch},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiResult, AppError};
use crate::AppState;
use ledgerdesk_shared::{display_name, effective_status, Invoice, InvoiceStatus, ReminderLogEntry};

#[derive(Debug, Serialize, Deserialize)]
pub struct InvoiceCreate {
    pub invoice_number: Option<String>,
    pub customer_id: Uuid,
    pub project_id: Option<Uuid>,
    /// Integer minor units (cents)
    pub amount: i64,
    pub status: Option<String>,
    pub issue_date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvoiceUpdate {
    pub amount: Option<i64>,
    pub status: Option<String>,
    pub issue_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvoiceQuery {
    pub status: Option<String>,
    pub customer_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, FromRow)]
struct InvoiceRow {
    id: Uuid,
    invoice_number: String,
    customer_id: Uuid,
    project_id: Option<Uuid>,
    amount: i64,
    status: String,
    issue_date: DateTime<Utc>,
    due_date: Option<DateTime<Utc>>,
    description: Option<String>,
    notes: Option<String>,
    last_reminder_sent: Option<DateTime<Utc>>,
    reminder_count: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    customer_type: Option<String>,
    customer_first_name: Option<String>,
    customer_last_name: Option<String>,
    customer_business_name: Option<String>,
    customer_email: Option<String>,
    project_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InvoiceWithDetails {
    pub id: Uuid,
    pub invoice_number: String,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub project_id: Option<Uuid>,
    pub project_name: Option<String>,
    pub amount: i64,
    /// Stored lifecycle status
    pub status: String,
    /// Presentation status derived from the due date ("due"/"overdue")
    pub display_status: String,
    pub issue_date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub last_reminder_sent: Option<DateTime<Utc>>,
    pub reminder_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InvoiceRow {
    fn into_details(self, now: DateTime<Utc>) -> InvoiceWithDetails {
        let customer_name = display_name(
            self.customer_type.as_deref().unwrap_or("individual"),
            self.customer_first_name.as_deref(),
            self.customer_last_name.as_deref(),
            self.customer_business_name.as_deref(),
        );
        let display_status = effective_status(&self.status, self.due_date, now).to_string();
        InvoiceWithDetails {
            id: self.id,
            invoice_number: self.invoice_number,
            customer_id: self.customer_id,
            customer_name,
            customer_email: self.customer_email,
            project_id: self.project_id,
            project_name: self.project_name,
            amount: self.amount,
            status: self.status,
            display_status,
            issue_date: self.issue_date,
            due_date: self.due_date,
            description: self.description,
            notes: self.notes,
            last_reminder_sent: self.last_reminder_sent,
            reminder_count: self.reminder_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const INVOICE_ROW_COLUMNS: &str = "i.id, i.invoice_number, i.customer_id, i.project_id, \
     i.amount, i.status, i.issue_date, i.due_date, i.description, i.notes, \
     i.last_reminder_sent, i.reminder_count, i.created_at, i.updated_at, \
     c.customer_type as customer_type, c.first_name as customer_first_name, \
     c.last_name as customer_last_name, c.business_name as customer_business_name, \
     c.email as customer_email, p.name as project_name";

const INVOICE_COLUMNS: &str = "id, invoice_number, customer_id, project_id, amount, status, \
     issue_date, due_date, description, notes, last_reminder_sent, reminder_count, created_by, \
     created_at, updated_at";

pub fn invoice_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_invoices).post(create_invoice))
        .route(
            "/:id",
            get(get_invoice).put(update_invoice).delete(delete_invoice),
        )
        .route("/:id/send", patch(send_invoice))
        .route("/:id/reminders", get(get_invoice_reminders))
}

fn validate_status(status: &str) -> ApiResult<()> {
    if InvoiceStatus::parse(status).is_none() {
        return Err(AppError::validation_single(
            "status",
            format!("Status must be one of: {}", InvoiceStatus::ALL.join(", ")),
        ));
    }
    Ok(())
}

async fn list_invoices(
    State(state): State<Arc<AppState>>,
    Query(params): Query<InvoiceQuery>,
) -> ApiResult<Json<Vec<InvoiceWithDetails>>> {
    let limit = params.limit.unwrap_or(50);
    let offset = params.offset.unwrap_or(0);

    let rows = if let Some(customer_id) = params.customer_id {
        sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {INVOICE_ROW_COLUMNS}
             FROM invoices i
             LEFT JOIN customers c ON i.customer_id = c.id
             LEFT JOIN projects p ON i.project_id = p.id
             WHERE i.customer_id = $1
             ORDER BY i.created_at DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(customer_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.db_pool)
        .await?
    } else if let Some(status) = params.status {
        sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {INVOICE_ROW_COLUMNS}
             FROM invoices i
             LEFT JOIN customers c ON i.customer_id = c.id
             LEFT JOIN projects p ON i.project_id = p.id
             WHERE i.status = $1
             ORDER BY i.created_at DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.db_pool)
        .await?
    } else {
        sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {INVOICE_ROW_COLUMNS}
             FROM invoices i
             LEFT JOIN customers c ON i.customer_id = c.id
             LEFT JOIN projects p ON i.project_id = p.id
             ORDER BY i.created_at DESC
             LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.db_pool)
        .await?
    };

    let now = Utc::now();
    Ok(Json(
        rows.into_iter().map(|r| r.into_details(now)).collect(),
    ))
}

async fn create_invoice(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<InvoiceCreate>,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    if let Some(status) = &payload.status {
        validate_status(status)?;
    }

    let invoice_number = payload
        .invoice_number
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| format!("INV-{}", Utc::now().timestamp_millis()));

    let invoice = sqlx::query_as::<_, Invoice>(&format!(
        "INSERT INTO invoices
         (id, invoice_number, customer_id, project_id, amount, status, issue_date, due_date,
          description, notes)
         VALUES ($1, $2, $3, $4, $5, COALESCE($6, 'draft'), $7, $8, $9, $10)
         RETURNING {INVOICE_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(&invoice_number)
    .bind(payload.customer_id)
    .bind(payload.project_id)
    .bind(payload.amount)
    .bind(&payload.status)
    .bind(payload.issue_date)
    .bind(payload.due_date)
    .bind(&payload.description)
    .bind(&payload.notes)
    .fetch_one(&state.db_pool)
    .await?;

    Ok((StatusCode::CREATED, Json(invoice)))
}

async fn get_invoice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<InvoiceWithDetails>> {
    let row = sqlx::query_as::<_, InvoiceRow>(&format!(
        "SELECT {INVOICE_ROW_COLUMNS}
         FROM invoices i
         LEFT JOIN customers c ON i.customer_id = c.id
         LEFT JOIN projects p ON i.project_id = p.id
         WHERE i.id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Invoice".to_string()))?;

    Ok(Json(row.into_details(Utc::now())))
}

async fn update_invoice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<InvoiceUpdate>,
) -> ApiResult<Json<Invoice>> {
    if let Some(status) = &payload.status {
        validate_status(status)?;
    }

    let invoice = sqlx::query_as::<_, Invoice>(&format!(
        "UPDATE invoices SET
         amount = COALESCE($2, amount),
         status = COALESCE($3, status),
         issue_date = COALESCE($4, issue_date),
         due_date = COALESCE($5, due_date),
         description = COALESCE($6, description),
         notes = COALESCE($7, notes),
         updated_at = NOW()
         WHERE id = $1
         RETURNING {INVOICE_COLUMNS}"
    ))
    .bind(id)
    .bind(payload.amount)
    .bind(&payload.status)
    .bind(payload.issue_date)
    .bind(payload.due_date)
    .bind(&payload.description)
    .bind(&payload.notes)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Invoice".to_string()))?;

    Ok(Json(invoice))
}

/// Mark a draft invoice as sent. The reminder job picks it up once the due
/// date passes.
async fn send_invoice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Invoice>> {
    let status: Option<String> = sqlx::query_scalar("SELECT status FROM invoices WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db_pool)
        .await?;

    let status = status.ok_or_else(|| AppError::NotFound("Invoice".to_string()))?;
    if status != InvoiceStatus::Draft.as_str() {
        return Err(AppError::BadRequest(format!(
            "Invoice in status '{}' cannot be sent",
            status
        )));
    }

    let invoice = sqlx::query_as::<_, Invoice>(&format!(
        "UPDATE invoices SET status = 'sent', updated_at = NOW()
         WHERE id = $1
         RETURNING {INVOICE_COLUMNS}"
    ))
    .bind(id)
    .fetch_one(&state.db_pool)
    .await?;

    Ok(Json(invoice))
}

async fn get_invoice_reminders(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<ReminderLogEntry>>> {
    let entries = sqlx::query_as::<_, ReminderLogEntry>(
        "SELECT id, invoice_id, sent_at, reminder_type
         FROM reminder_log
         WHERE invoice_id = $1
         ORDER BY sent_at DESC",
    )
    .bind(id)
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(entries))
}

async fn delete_invoice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let result = sqlx::query("DELETE FROM invoices WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Invoice".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
