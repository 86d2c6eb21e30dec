use crate::{
    auth::auth::AuthUser,
    error::ApiError,
    model::{
        class::{Class, ClassRow},
        student::StudentSummary,
    },
    models::MessageResponse,
    utils::{
        db_utils::{build_update_sql, execute_update},
        pagination::Page,
    },
};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{MySqlConnection, MySqlPool};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

const UPDATABLE_COLUMNS: &[&str] = &["class_name", "teacher_id"];

const CLASS_SELECT: &str = r#"
    SELECT c.id, c.class_name, c.teacher_id,
           t.first_name AS teacher_first_name, t.last_name AS teacher_last_name
    FROM classes c
    LEFT JOIN teachers t ON t.id = c.teacher_id
"#;

#[derive(Deserialize, ToSchema)]
pub struct CreateClass {
    #[schema(example = "Grade 4")]
    pub class_name: String,
    #[schema(example = 1)]
    pub teacher_id: Option<u64>,
}

#[derive(Deserialize, Serialize, ToSchema)]
pub struct UpdateClass {
    pub class_name: Option<String>,
    pub teacher_id: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ClassQuery {
    /// Page number, starting at 1
    pub page: Option<u32>,
    /// Items per page (1-100)
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct ClassListResponse {
    pub data: Vec<Class>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub pages: i64,
}

#[derive(Serialize, ToSchema)]
pub struct ClassDetail {
    #[serde(flatten)]
    pub class: Class,
    pub students: Vec<StudentSummary>,
}

async fn fetch_class(conn: &mut MySqlConnection, class_id: u64) -> Result<Class, ApiError> {
    let sql = format!("{} WHERE c.id = ?", CLASS_SELECT);
    sqlx::query_as::<_, ClassRow>(&sql)
        .bind(class_id)
        .fetch_optional(conn)
        .await?
        .map(Class::from)
        .ok_or(ApiError::NotFound("Class"))
}

/// Create Class
#[utoipa::path(
    post,
    path = "/api/classes",
    request_body = CreateClass,
    responses(
        (status = 201, description = "Class created", body = Class),
        (status = 400, description = "Invalid payload or unknown teacher", body = MessageResponse),
        (status = 409, description = "Class name already in use", body = MessageResponse)
    ),
    tag = "Class",
    security(("bearer_auth" = []))
)]
pub async fn create_class(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateClass>,
) -> Result<HttpResponse, ApiError> {
    let class_name = payload.class_name.trim();
    if class_name.is_empty() {
        return Err(ApiError::bad_request("class_name must not be empty"));
    }

    let mut tx = pool.begin().await?;

    let result = sqlx::query("INSERT INTO classes (class_name, teacher_id) VALUES (?, ?)")
        .bind(class_name)
        .bind(payload.teacher_id)
        .execute(&mut *tx)
        .await?;

    let class = fetch_class(&mut tx, result.last_insert_id()).await?;
    tx.commit().await?;

    info!(class_id = class.id, class_name = %class.class_name, "Class created");
    Ok(HttpResponse::Created().json(class))
}

/// List Classes
#[utoipa::path(
    get,
    path = "/api/classes",
    params(ClassQuery),
    responses((status = 200, description = "Paginated class list", body = ClassListResponse)),
    tag = "Class",
    security(("bearer_auth" = []))
)]
pub async fn list_classes(
    pool: web::Data<MySqlPool>,
    query: web::Query<ClassQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = Page::new(query.page, query.per_page);

    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM classes")
        .fetch_one(pool.get_ref())
        .await?;

    let data_sql = format!("{} ORDER BY c.id LIMIT ? OFFSET ?", CLASS_SELECT);
    let data = sqlx::query_as::<_, ClassRow>(&data_sql)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool.get_ref())
        .await?
        .into_iter()
        .map(Class::from)
        .collect();

    Ok(HttpResponse::Ok().json(ClassListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
        pages: page.total_pages(total),
    }))
}

/// Get Class by ID, with its students
#[utoipa::path(
    get,
    path = "/api/classes/{class_id}",
    params(("class_id" = u64, Path, description = "Class ID")),
    responses(
        (status = 200, description = "Class found", body = ClassDetail),
        (status = 404, description = "Class not found", body = MessageResponse)
    ),
    tag = "Class",
    security(("bearer_auth" = []))
)]
pub async fn get_class(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let class_id = path.into_inner();
    let mut conn = pool.acquire().await?;

    let class = fetch_class(&mut conn, class_id).await?;
    let students = sqlx::query_as::<_, StudentSummary>(
        "SELECT id, name FROM students WHERE class_id = ? ORDER BY name",
    )
    .bind(class_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(HttpResponse::Ok().json(ClassDetail { class, students }))
}

/// Update Class
#[utoipa::path(
    put,
    path = "/api/classes/{class_id}",
    params(("class_id" = u64, Path, description = "Class ID")),
    request_body = UpdateClass,
    responses(
        (status = 200, description = "Class updated", body = Class),
        (status = 400, description = "Unknown field or invalid value", body = MessageResponse),
        (status = 404, description = "Class not found", body = MessageResponse),
        (status = 409, description = "Class name already in use", body = MessageResponse)
    ),
    tag = "Class",
    security(("bearer_auth" = []))
)]
pub async fn update_class(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let class_id = path.into_inner();
    let update =
        build_update_sql::<UpdateClass>("classes", &body, UPDATABLE_COLUMNS, "id", class_id)?;

    let mut tx = pool.begin().await?;
    fetch_class(&mut tx, class_id).await?;
    execute_update(&mut *tx, update).await?;
    let class = fetch_class(&mut tx, class_id).await?;
    tx.commit().await?;

    Ok(HttpResponse::Ok().json(class))
}

/// Delete Class. Its students, their scores and payments and the class fee
/// structure go with it.
#[utoipa::path(
    delete,
    path = "/api/classes/{class_id}",
    params(("class_id" = u64, Path, description = "Class ID")),
    responses(
        (status = 200, description = "Class deleted", body = MessageResponse),
        (status = 403, description = "Admin only", body = MessageResponse),
        (status = 404, description = "Class not found", body = MessageResponse)
    ),
    tag = "Class",
    security(("bearer_auth" = []))
)]
pub async fn delete_class(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let class_id = path.into_inner();
    let result = sqlx::query("DELETE FROM classes WHERE id = ?")
        .bind(class_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Class"));
    }

    info!(class_id, by = %auth.username, "Class deleted");
    Ok(HttpResponse::Ok().json(MessageResponse::new("Class deleted successfully")))
}
