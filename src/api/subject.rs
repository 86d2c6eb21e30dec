use crate::{
    auth::auth::AuthUser,
    error::ApiError,
    model::{subject::Subject, teacher::TeacherSummary},
    models::MessageResponse,
    utils::pagination::{Page, PageParams},
};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use sqlx::{MySqlConnection, MySqlPool};
use tracing::info;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct SubjectPayload {
    #[schema(example = "Mathematics")]
    pub subject_name: String,
}

#[derive(Serialize, ToSchema)]
pub struct SubjectListResponse {
    pub data: Vec<Subject>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub pages: i64,
}

#[derive(Serialize, ToSchema)]
pub struct SubjectDetail {
    #[serde(flatten)]
    pub subject: Subject,
    pub teachers: Vec<TeacherSummary>,
}

async fn fetch_subject(conn: &mut MySqlConnection, subject_id: u64) -> Result<Subject, ApiError> {
    sqlx::query_as::<_, Subject>("SELECT id, subject_name FROM subjects WHERE id = ?")
        .bind(subject_id)
        .fetch_optional(conn)
        .await?
        .ok_or(ApiError::NotFound("Subject"))
}

fn validated_name(payload: &SubjectPayload) -> Result<&str, ApiError> {
    let name = payload.subject_name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("subject_name must not be empty"));
    }
    Ok(name)
}

/// Create Subject
#[utoipa::path(
    post,
    path = "/api/subjects",
    request_body = SubjectPayload,
    responses(
        (status = 201, description = "Subject created", body = Subject),
        (status = 409, description = "Subject name already in use", body = MessageResponse)
    ),
    tag = "Subject",
    security(("bearer_auth" = []))
)]
pub async fn create_subject(
    pool: web::Data<MySqlPool>,
    payload: web::Json<SubjectPayload>,
) -> Result<HttpResponse, ApiError> {
    let name = validated_name(&payload)?;

    let result = sqlx::query("INSERT INTO subjects (subject_name) VALUES (?)")
        .bind(name)
        .execute(pool.get_ref())
        .await?;

    let subject = Subject {
        id: result.last_insert_id(),
        subject_name: name.to_string(),
    };

    info!(subject_id = subject.id, "Subject created");
    Ok(HttpResponse::Created().json(subject))
}

/// List Subjects
#[utoipa::path(
    get,
    path = "/api/subjects",
    params(PageParams),
    responses((status = 200, description = "Paginated subject list", body = SubjectListResponse)),
    tag = "Subject",
    security(("bearer_auth" = []))
)]
pub async fn list_subjects(
    pool: web::Data<MySqlPool>,
    query: web::Query<PageParams>,
) -> Result<HttpResponse, ApiError> {
    let page = Page::from(query.into_inner());

    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM subjects")
        .fetch_one(pool.get_ref())
        .await?;

    let data = sqlx::query_as::<_, Subject>(
        "SELECT id, subject_name FROM subjects ORDER BY subject_name LIMIT ? OFFSET ?",
    )
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(SubjectListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
        pages: page.total_pages(total),
    }))
}

/// Get Subject by ID, with the teachers who teach it
#[utoipa::path(
    get,
    path = "/api/subjects/{subject_id}",
    params(("subject_id" = u64, Path, description = "Subject ID")),
    responses(
        (status = 200, description = "Subject found", body = SubjectDetail),
        (status = 404, description = "Subject not found", body = MessageResponse)
    ),
    tag = "Subject",
    security(("bearer_auth" = []))
)]
pub async fn get_subject(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let subject_id = path.into_inner();
    let mut conn = pool.acquire().await?;

    let subject = fetch_subject(&mut conn, subject_id).await?;
    let teachers = sqlx::query_as::<_, TeacherSummary>(
        "SELECT id, first_name, last_name FROM teachers WHERE subject_id = ? ORDER BY id",
    )
    .bind(subject_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(HttpResponse::Ok().json(SubjectDetail { subject, teachers }))
}

/// Rename Subject
#[utoipa::path(
    put,
    path = "/api/subjects/{subject_id}",
    params(("subject_id" = u64, Path, description = "Subject ID")),
    request_body = SubjectPayload,
    responses(
        (status = 200, description = "Subject updated", body = Subject),
        (status = 404, description = "Subject not found", body = MessageResponse),
        (status = 409, description = "Subject name already in use", body = MessageResponse)
    ),
    tag = "Subject",
    security(("bearer_auth" = []))
)]
pub async fn update_subject(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<SubjectPayload>,
) -> Result<HttpResponse, ApiError> {
    let subject_id = path.into_inner();
    let name = validated_name(&payload)?;

    let mut tx = pool.begin().await?;
    fetch_subject(&mut tx, subject_id).await?;

    sqlx::query("UPDATE subjects SET subject_name = ? WHERE id = ?")
        .bind(name)
        .bind(subject_id)
        .execute(&mut *tx)
        .await?;

    let subject = fetch_subject(&mut tx, subject_id).await?;
    tx.commit().await?;

    Ok(HttpResponse::Ok().json(subject))
}

/// Delete Subject, together with the scores recorded for it
#[utoipa::path(
    delete,
    path = "/api/subjects/{subject_id}",
    params(("subject_id" = u64, Path, description = "Subject ID")),
    responses(
        (status = 200, description = "Subject deleted", body = MessageResponse),
        (status = 403, description = "Admin only", body = MessageResponse),
        (status = 404, description = "Subject not found", body = MessageResponse)
    ),
    tag = "Subject",
    security(("bearer_auth" = []))
)]
pub async fn delete_subject(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let subject_id = path.into_inner();
    let result = sqlx::query("DELETE FROM subjects WHERE id = ?")
        .bind(subject_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Subject"));
    }

    info!(subject_id, by = %auth.username, "Subject deleted");
    Ok(HttpResponse::Ok().json(MessageResponse::new("Subject deleted successfully")))
}
