use crate::{
    error::ApiError,
    model::test::Test,
    models::MessageResponse,
    utils::{
        db_utils::{BindValues, Filters, build_update_sql, execute_update},
        pagination::Page,
    },
};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{MySqlConnection, MySqlPool};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

const UPDATABLE_COLUMNS: &[&str] = &["name", "term", "year"];

#[derive(Deserialize, ToSchema)]
pub struct CreateTest {
    #[schema(example = "Mid-term exam")]
    pub name: String,
    #[schema(example = "Term 1")]
    pub term: String,
    #[schema(example = 2026)]
    pub year: i32,
}

#[derive(Deserialize, Serialize, ToSchema)]
pub struct UpdateTest {
    pub name: Option<String>,
    pub term: Option<String>,
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TestQuery {
    /// Page number, starting at 1
    pub page: Option<u32>,
    /// Items per page (1-100)
    pub per_page: Option<u32>,
    pub term: Option<String>,
    pub year: Option<i32>,
}

#[derive(Serialize, ToSchema)]
pub struct TestListResponse {
    pub data: Vec<Test>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub pages: i64,
}

async fn fetch_test(conn: &mut MySqlConnection, test_id: u64) -> Result<Test, ApiError> {
    sqlx::query_as::<_, Test>("SELECT id, name, term, year FROM tests WHERE id = ?")
        .bind(test_id)
        .fetch_optional(conn)
        .await?
        .ok_or(ApiError::NotFound("Test"))
}

/// Create Test
#[utoipa::path(
    post,
    path = "/api/tests",
    request_body = CreateTest,
    responses(
        (status = 201, description = "Test created", body = Test),
        (status = 400, description = "Invalid payload", body = MessageResponse)
    ),
    tag = "Test",
    security(("bearer_auth" = []))
)]
pub async fn create_test(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateTest>,
) -> Result<HttpResponse, ApiError> {
    if payload.name.trim().is_empty() || payload.term.trim().is_empty() {
        return Err(ApiError::bad_request("name and term are required"));
    }

    let result = sqlx::query("INSERT INTO tests (name, term, year) VALUES (?, ?, ?)")
        .bind(payload.name.trim())
        .bind(payload.term.trim())
        .bind(payload.year)
        .execute(pool.get_ref())
        .await?;

    let test = Test {
        id: result.last_insert_id(),
        name: payload.name.trim().to_string(),
        term: payload.term.trim().to_string(),
        year: payload.year,
    };

    info!(test_id = test.id, term = %test.term, year = test.year, "Test created");
    Ok(HttpResponse::Created().json(test))
}

/// List Tests
#[utoipa::path(
    get,
    path = "/api/tests",
    params(TestQuery),
    responses((status = 200, description = "Paginated test list", body = TestListResponse)),
    tag = "Test",
    security(("bearer_auth" = []))
)]
pub async fn list_tests(
    pool: web::Data<MySqlPool>,
    query: web::Query<TestQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = Page::new(query.page, query.per_page);

    let mut filters = Filters::new();
    if let Some(term) = query.term.as_deref() {
        filters.eq("term = ?", term);
    }
    if let Some(year) = query.year {
        filters.eq("year = ?", year);
    }
    let where_clause = filters.where_clause();

    let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM tests {}", where_clause))
        .bind_values(filters.values())
        .fetch_one(pool.get_ref())
        .await?;

    let data_sql = format!(
        "SELECT id, name, term, year FROM tests {} ORDER BY year DESC, id DESC LIMIT ? OFFSET ?",
        where_clause
    );
    let data = sqlx::query_as::<_, Test>(&data_sql)
        .bind_values(filters.values())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(TestListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
        pages: page.total_pages(total),
    }))
}

/// Get Test by ID
#[utoipa::path(
    get,
    path = "/api/tests/{test_id}",
    params(("test_id" = u64, Path, description = "Test ID")),
    responses(
        (status = 200, description = "Test found", body = Test),
        (status = 404, description = "Test not found", body = MessageResponse)
    ),
    tag = "Test",
    security(("bearer_auth" = []))
)]
pub async fn get_test(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let mut conn = pool.acquire().await?;
    let test = fetch_test(&mut conn, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(test))
}

/// Update Test
#[utoipa::path(
    put,
    path = "/api/tests/{test_id}",
    params(("test_id" = u64, Path, description = "Test ID")),
    request_body = UpdateTest,
    responses(
        (status = 200, description = "Test updated", body = Test),
        (status = 400, description = "Unknown field or invalid value", body = MessageResponse),
        (status = 404, description = "Test not found", body = MessageResponse)
    ),
    tag = "Test",
    security(("bearer_auth" = []))
)]
pub async fn update_test(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let test_id = path.into_inner();
    let update =
        build_update_sql::<UpdateTest>("tests", &body, UPDATABLE_COLUMNS, "id", test_id)?;

    let mut tx = pool.begin().await?;
    fetch_test(&mut tx, test_id).await?;
    execute_update(&mut *tx, update).await?;
    let test = fetch_test(&mut tx, test_id).await?;
    tx.commit().await?;

    Ok(HttpResponse::Ok().json(test))
}

/// Delete Test, together with the scores recorded against it
#[utoipa::path(
    delete,
    path = "/api/tests/{test_id}",
    params(("test_id" = u64, Path, description = "Test ID")),
    responses(
        (status = 200, description = "Test deleted", body = MessageResponse),
        (status = 404, description = "Test not found", body = MessageResponse)
    ),
    tag = "Test",
    security(("bearer_auth" = []))
)]
pub async fn delete_test(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let test_id = path.into_inner();
    let result = sqlx::query("DELETE FROM tests WHERE id = ?")
        .bind(test_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Test"));
    }

    info!(test_id, "Test deleted");
    Ok(HttpResponse::Ok().json(MessageResponse::new("Test deleted successfully")))
}
