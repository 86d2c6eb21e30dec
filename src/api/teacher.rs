use crate::{
    auth::auth::AuthUser,
    error::ApiError,
    model::teacher::Teacher,
    models::MessageResponse,
    utils::{
        db_utils::{BindValues, Filters, build_update_sql, execute_update},
        pagination::Page,
    },
};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{MySqlConnection, MySqlPool};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

const UPDATABLE_COLUMNS: &[&str] = &["first_name", "last_name", "date_of_admission", "subject_id"];

const TEACHER_SELECT: &str = r#"
    SELECT t.id, t.first_name, t.last_name, t.date_of_admission, t.subject_id, s.subject_name
    FROM teachers t
    LEFT JOIN subjects s ON s.id = t.subject_id
"#;

#[derive(Deserialize, ToSchema)]
pub struct CreateTeacher {
    #[schema(example = "Grace")]
    pub first_name: String,
    #[schema(example = "Otieno")]
    pub last_name: String,
    #[schema(example = "2020-01-06", format = "date", value_type = String)]
    pub date_of_admission: NaiveDate,
    #[schema(example = 2)]
    pub subject_id: Option<u64>,
}

#[derive(Deserialize, Serialize, ToSchema)]
pub struct UpdateTeacher {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[schema(format = "date", value_type = Option<String>)]
    pub date_of_admission: Option<NaiveDate>,
    pub subject_id: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TeacherQuery {
    /// Page number, starting at 1
    pub page: Option<u32>,
    /// Items per page (1-100)
    pub per_page: Option<u32>,
    /// Only teachers of this subject
    pub subject_id: Option<u64>,
    /// Substring of the first or last name
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct TeacherListResponse {
    pub data: Vec<Teacher>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub pages: i64,
}

#[derive(Serialize, ToSchema)]
pub struct TeacherDetail {
    #[serde(flatten)]
    pub teacher: Teacher,
    /// Classes this teacher is assigned to
    #[schema(example = json!([3, 4]))]
    pub class_ids: Vec<u64>,
}

async fn fetch_teacher(conn: &mut MySqlConnection, teacher_id: u64) -> Result<Teacher, ApiError> {
    let sql = format!("{} WHERE t.id = ?", TEACHER_SELECT);
    sqlx::query_as::<_, Teacher>(&sql)
        .bind(teacher_id)
        .fetch_optional(conn)
        .await?
        .ok_or(ApiError::NotFound("Teacher"))
}

/// Create Teacher
#[utoipa::path(
    post,
    path = "/api/teachers",
    request_body = CreateTeacher,
    responses(
        (status = 201, description = "Teacher created", body = Teacher),
        (status = 400, description = "Invalid payload or unknown subject", body = MessageResponse)
    ),
    tag = "Teacher",
    security(("bearer_auth" = []))
)]
pub async fn create_teacher(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateTeacher>,
) -> Result<HttpResponse, ApiError> {
    if payload.first_name.trim().is_empty() || payload.last_name.trim().is_empty() {
        return Err(ApiError::bad_request("first_name and last_name are required"));
    }

    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "INSERT INTO teachers (first_name, last_name, date_of_admission, subject_id) VALUES (?, ?, ?, ?)",
    )
    .bind(payload.first_name.trim())
    .bind(payload.last_name.trim())
    .bind(payload.date_of_admission)
    .bind(payload.subject_id)
    .execute(&mut *tx)
    .await?;

    let teacher = fetch_teacher(&mut tx, result.last_insert_id()).await?;
    tx.commit().await?;

    info!(teacher_id = teacher.id, "Teacher created");
    Ok(HttpResponse::Created().json(teacher))
}

/// List Teachers
#[utoipa::path(
    get,
    path = "/api/teachers",
    params(TeacherQuery),
    responses((status = 200, description = "Paginated teacher list", body = TeacherListResponse)),
    tag = "Teacher",
    security(("bearer_auth" = []))
)]
pub async fn list_teachers(
    pool: web::Data<MySqlPool>,
    query: web::Query<TeacherQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = Page::new(query.page, query.per_page);

    let mut filters = Filters::new();
    if let Some(subject_id) = query.subject_id {
        filters.eq("t.subject_id = ?", subject_id);
    }
    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        filters.like("(t.first_name LIKE ? OR t.last_name LIKE ?)", search, 2);
    }
    let where_clause = filters.where_clause();

    let total = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM teachers t {}",
        where_clause
    ))
    .bind_values(filters.values())
    .fetch_one(pool.get_ref())
    .await?;

    let data_sql = format!("{} {} ORDER BY t.id LIMIT ? OFFSET ?", TEACHER_SELECT, where_clause);
    let data = sqlx::query_as::<_, Teacher>(&data_sql)
        .bind_values(filters.values())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(TeacherListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
        pages: page.total_pages(total),
    }))
}

/// Get Teacher by ID
#[utoipa::path(
    get,
    path = "/api/teachers/{teacher_id}",
    params(("teacher_id" = u64, Path, description = "Teacher ID")),
    responses(
        (status = 200, description = "Teacher found", body = TeacherDetail),
        (status = 404, description = "Teacher not found", body = MessageResponse)
    ),
    tag = "Teacher",
    security(("bearer_auth" = []))
)]
pub async fn get_teacher(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let teacher_id = path.into_inner();
    let mut conn = pool.acquire().await?;

    let teacher = fetch_teacher(&mut conn, teacher_id).await?;
    let class_ids = sqlx::query_scalar::<_, u64>(
        "SELECT id FROM classes WHERE teacher_id = ? ORDER BY id",
    )
    .bind(teacher_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(HttpResponse::Ok().json(TeacherDetail { teacher, class_ids }))
}

/// Update Teacher
#[utoipa::path(
    put,
    path = "/api/teachers/{teacher_id}",
    params(("teacher_id" = u64, Path, description = "Teacher ID")),
    request_body = UpdateTeacher,
    responses(
        (status = 200, description = "Teacher updated", body = Teacher),
        (status = 400, description = "Unknown field or invalid value", body = MessageResponse),
        (status = 404, description = "Teacher not found", body = MessageResponse)
    ),
    tag = "Teacher",
    security(("bearer_auth" = []))
)]
pub async fn update_teacher(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let teacher_id = path.into_inner();
    let update = build_update_sql::<UpdateTeacher>(
        "teachers",
        &body,
        UPDATABLE_COLUMNS,
        "id",
        teacher_id,
    )?;

    let mut tx = pool.begin().await?;
    fetch_teacher(&mut tx, teacher_id).await?;
    execute_update(&mut *tx, update).await?;
    let teacher = fetch_teacher(&mut tx, teacher_id).await?;
    tx.commit().await?;

    Ok(HttpResponse::Ok().json(teacher))
}

/// Delete Teacher. Their classes are kept, without a teacher.
#[utoipa::path(
    delete,
    path = "/api/teachers/{teacher_id}",
    params(("teacher_id" = u64, Path, description = "Teacher ID")),
    responses(
        (status = 200, description = "Teacher deleted", body = MessageResponse),
        (status = 403, description = "Admin only", body = MessageResponse),
        (status = 404, description = "Teacher not found", body = MessageResponse)
    ),
    tag = "Teacher",
    security(("bearer_auth" = []))
)]
pub async fn delete_teacher(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let teacher_id = path.into_inner();
    let result = sqlx::query("DELETE FROM teachers WHERE id = ?")
        .bind(teacher_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Teacher"));
    }

    info!(teacher_id, by = %auth.username, "Teacher deleted");
    Ok(HttpResponse::Ok().json(MessageResponse::new("Teacher deleted successfully")))
}
