use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiResult, AppError};
use crate::AppState;
use ledgerdesk_shared::{display_name, Project};

#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectCreate {
    pub name: String,
    pub description: Option<String>,
    pub customer_id: Uuid,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Integer minor units (cents)
    pub budget: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub budget: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectQuery {
    pub status: Option<String>,
    pub customer_id: Option<Uuid>,
}

#[derive(Debug, FromRow)]
struct ProjectRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    customer_id: Uuid,
    status: String,
    priority: Option<String>,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    budget: Option<i64>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    customer_type: Option<String>,
    customer_first_name: Option<String>,
    customer_last_name: Option<String>,
    customer_business_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProjectWithCustomer {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub status: String,
    pub priority: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub budget: Option<i64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProjectRow> for ProjectWithCustomer {
    fn from(row: ProjectRow) -> Self {
        let customer_name = display_name(
            row.customer_type.as_deref().unwrap_or("individual"),
            row.customer_first_name.as_deref(),
            row.customer_last_name.as_deref(),
            row.customer_business_name.as_deref(),
        );
        ProjectWithCustomer {
            id: row.id,
            name: row.name,
            description: row.description,
            customer_id: row.customer_id,
            customer_name,
            status: row.status,
            priority: row.priority,
            start_date: row.start_date,
            end_date: row.end_date,
            budget: row.budget,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const PROJECT_ROW_COLUMNS: &str = "p.id, p.name, p.description, p.customer_id, p.status, \
     p.priority, p.start_date, p.end_date, p.budget, p.notes, p.created_at, p.updated_at, \
     c.customer_type as customer_type, c.first_name as customer_first_name, \
     c.last_name as customer_last_name, c.business_name as customer_business_name";

pub fn project_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route(
            "/:id",
            get(get_project).put(update_project).delete(delete_project),
        )
}

async fn list_projects(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProjectQuery>,
) -> ApiResult<Json<Vec<ProjectWithCustomer>>> {
    let rows = if let Some(customer_id) = params.customer_id {
        sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {PROJECT_ROW_COLUMNS}
             FROM projects p
             LEFT JOIN customers c ON p.customer_id = c.id
             WHERE p.customer_id = $1
             ORDER BY p.created_at DESC"
        ))
        .bind(customer_id)
        .fetch_all(&state.db_pool)
        .await?
    } else if let Some(status) = params.status {
        sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {PROJECT_ROW_COLUMNS}
             FROM projects p
             LEFT JOIN customers c ON p.customer_id = c.id
             WHERE p.status = $1
             ORDER BY p.created_at DESC"
        ))
        .bind(status)
        .fetch_all(&state.db_pool)
        .await?
    } else {
        sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {PROJECT_ROW_COLUMNS}
             FROM projects p
             LEFT JOIN customers c ON p.customer_id = c.id
             ORDER BY p.created_at DESC"
        ))
        .fetch_all(&state.db_pool)
        .await?
    };

    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

async fn create_project(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ProjectCreate>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    if payload.name.trim().is_empty() {
        return Err(AppError::validation_single("name", "Name is required"));
    }

    let project = sqlx::query_as::<_, Project>(
        "INSERT INTO projects
         (id, name, description, customer_id, status, priority, start_date, end_date, budget, notes)
         VALUES ($1, $2, $3, $4, COALESCE($5, 'active'), COALESCE($6, 'medium'), $7, $8, $9, $10)
         RETURNING id, name, description, customer_id, status, priority, start_date, end_date,
                   budget, notes, created_by, created_at, updated_at",
    )
    .bind(Uuid::new_v4())
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(payload.customer_id)
    .bind(&payload.status)
    .bind(&payload.priority)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.budget)
    .bind(&payload.notes)
    .fetch_one(&state.db_pool)
    .await?;

    Ok((StatusCode::CREATED, Json(project)))
}

async fn get_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProjectWithCustomer>> {
    let row = sqlx::query_as::<_, ProjectRow>(&format!(
        "SELECT {PROJECT_ROW_COLUMNS}
         FROM projects p
         LEFT JOIN customers c ON p.customer_id = c.id
         WHERE p.id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Project".to_string()))?;

    Ok(Json(row.into()))
}

async fn update_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProjectUpdate>,
) -> ApiResult<Json<Project>> {
    let project = sqlx::query_as::<_, Project>(
        "UPDATE projects SET
         name = COALESCE($2, name),
         description = COALESCE($3, description),
         status = COALESCE($4, status),
         priority = COALESCE($5, priority),
         start_date = COALESCE($6, start_date),
         end_date = COALESCE($7, end_date),
         budget = COALESCE($8, budget),
         notes = COALESCE($9, notes),
         updated_at = NOW()
         WHERE id = $1
         RETURNING id, name, description, customer_id, status, priority, start_date, end_date,
                   budget, notes, created_by, created_at, updated_at",
    )
    .bind(id)
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(&payload.status)
    .bind(&payload.priority)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.budget)
    .bind(&payload.notes)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Project".to_string()))?;

    Ok(Json(project))
}

async fn delete_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let result = sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Project".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
