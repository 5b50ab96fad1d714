use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiResult, AppError};
use crate::AppState;
use ledgerdesk_shared::Customer;

#[derive(Debug, Serialize, Deserialize)]
pub struct CustomerCreate {
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
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CustomerUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub business_name: Option<String>,
    pub email: Option<String>,
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
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CustomerQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

const CUSTOMER_COLUMNS: &str = "id, customer_type, first_name, last_name, business_name, email, \
     phone, address_line1, address_line2, city, province, postal_code, country, id_number, \
     registration_number, vat_number, tax_number, status, notes, created_by, created_at, updated_at";

pub fn customer_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_customers).post(create_customer))
        .route(
            "/:id",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
}

async fn list_customers(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CustomerQuery>,
) -> ApiResult<Json<Vec<Customer>>> {
    let limit = params.limit.unwrap_or(50);
    let offset = params.offset.unwrap_or(0);

    let customers = if let Some(status) = params.status {
        sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers
             WHERE status = $1
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.db_pool)
        .await?
    } else {
        sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers
             ORDER BY created_at DESC
             LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.db_pool)
        .await?
    };

    Ok(Json(customers))
}

async fn create_customer(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CustomerCreate>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    if payload.email.trim().is_empty() {
        return Err(AppError::validation_single("email", "Email is required"));
    }

    let customer = sqlx::query_as::<_, Customer>(&format!(
        "INSERT INTO customers
         (id, customer_type, first_name, last_name, business_name, email, phone,
          address_line1, address_line2, city, province, postal_code, country,
          id_number, registration_number, vat_number, tax_number, status, notes)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                 COALESCE($13, 'South Africa'), $14, $15, $16, $17,
                 COALESCE($18, 'active'), $19)
         RETURNING {CUSTOMER_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(&payload.customer_type)
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&payload.business_name)
    .bind(&payload.email)
    .bind(&payload.phone)
    .bind(&payload.address_line1)
    .bind(&payload.address_line2)
    .bind(&payload.city)
    .bind(&payload.province)
    .bind(&payload.postal_code)
    .bind(&payload.country)
    .bind(&payload.id_number)
    .bind(&payload.registration_number)
    .bind(&payload.vat_number)
    .bind(&payload.tax_number)
    .bind(&payload.status)
    .bind(&payload.notes)
    .fetch_one(&state.db_pool)
    .await?;

    Ok((StatusCode::CREATED, Json(customer)))
}

async fn get_customer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(&format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Customer".to_string()))?;

    Ok(Json(customer))
}

async fn update_customer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CustomerUpdate>,
) -> ApiResult<Json<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(&format!(
        "UPDATE customers SET
         first_name = COALESCE($2, first_name),
         last_name = COALESCE($3, last_name),
         business_name = COALESCE($4, business_name),
         email = COALESCE($5, email),
         phone = COALESCE($6, phone),
         address_line1 = COALESCE($7, address_line1),
         address_line2 = COALESCE($8, address_line2),
         city = COALESCE($9, city),
         province = COALESCE($10, province),
         postal_code = COALESCE($11, postal_code),
         country = COALESCE($12, country),
         id_number = COALESCE($13, id_number),
         registration_number = COALESCE($14, registration_number),
         vat_number = COALESCE($15, vat_number),
         tax_number = COALESCE($16, tax_number),
         status = COALESCE($17, status),
         notes = COALESCE($18, notes),
         updated_at = NOW()
         WHERE id = $1
         RETURNING {CUSTOMER_COLUMNS}"
    ))
    .bind(id)
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&payload.business_name)
    .bind(&payload.email)
    .bind(&payload.phone)
    .bind(&payload.address_line1)
    .bind(&payload.address_line2)
    .bind(&payload.city)
    .bind(&payload.province)
    .bind(&payload.postal_code)
    .bind(&payload.country)
    .bind(&payload.id_number)
    .bind(&payload.registration_number)
    .bind(&payload.vat_number)
    .bind(&payload.tax_number)
    .bind(&payload.status)
    .bind(&payload.notes)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Customer".to_string()))?;

    Ok(Json(customer))
}

async fn delete_customer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let result = sqlx::query("DELETE FROM customers WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Customer".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
