use crate::{
    error::ApiError,
    model::score_grade::{ScoreGrade, ScoreGradeRow},
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
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

const DEFAULT_MAX_SCORE: f64 = 100.0;

const UPDATABLE_COLUMNS: &[&str] = &[
    "student_id",
    "subject_id",
    "test_id",
    "score",
    "max_score",
    "term",
    "year",
];

/// Score rows joined to student and subject names; append WHERE/ORDER.
pub(crate) const SCORE_GRADE_SELECT: &str = r#"
    SELECT sg.id, sg.student_id, st.name AS student_name, sg.subject_id, sb.subject_name,
           sg.test_id, sg.score, sg.max_score, sg.term, sg.year
    FROM score_grades sg
    JOIN students st ON st.id = sg.student_id
    JOIN subjects sb ON sb.id = sg.subject_id
"#;

#[derive(Deserialize, ToSchema)]
pub struct CreateScoreGrade {
    #[schema(example = 7)]
    pub student_id: u64,
    #[schema(example = 2)]
    pub subject_id: u64,
    #[schema(example = 1)]
    pub test_id: Option<u64>,
    #[schema(example = 78.0)]
    pub score: Option<f64>,
    /// Defaults to 100
    #[schema(example = 100.0)]
    pub max_score: Option<f64>,
    #[schema(example = "Term 1")]
    pub term: Option<String>,
    #[schema(example = 2026)]
    pub year: Option<i32>,
}

#[derive(Deserialize, Serialize, ToSchema)]
pub struct UpdateScoreGrade {
    pub student_id: Option<u64>,
    pub subject_id: Option<u64>,
    pub test_id: Option<u64>,
    pub score: Option<f64>,
    pub max_score: Option<f64>,
    pub term: Option<String>,
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ScoreGradeQuery {
    /// Page number, starting at 1
    pub page: Option<u32>,
    /// Items per page (1-100)
    pub per_page: Option<u32>,
    pub student_id: Option<u64>,
    pub subject_id: Option<u64>,
    pub term: Option<String>,
    pub year: Option<i32>,
}

#[derive(Serialize, ToSchema)]
pub struct ScoreGradeListResponse {
    pub data: Vec<ScoreGrade>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub pages: i64,
}

fn check_score(score: Option<f64>, max_score: f64) -> Result<(), ApiError> {
    if !max_score.is_finite() || max_score < 0.0 {
        return Err(ApiError::bad_request("max_score must be a non-negative number"));
    }
    if score.is_some_and(|s| !s.is_finite()) {
        return Err(ApiError::bad_request("score must be a number"));
    }
    Ok(())
}

async fn fetch_score_grade(
    conn: &mut MySqlConnection,
    score_grade_id: u64,
) -> Result<ScoreGrade, ApiError> {
    let sql = format!("{} WHERE sg.id = ?", SCORE_GRADE_SELECT);
    sqlx::query_as::<_, ScoreGradeRow>(&sql)
        .bind(score_grade_id)
        .fetch_optional(conn)
        .await?
        .map(ScoreGrade::from)
        .ok_or(ApiError::NotFound("Score grade"))
}

/// Record a score
#[utoipa::path(
    post,
    path = "/api/score-grades",
    request_body = CreateScoreGrade,
    responses(
        (status = 201, description = "Score recorded", body = ScoreGrade),
        (status = 400, description = "Invalid score or unknown student/subject/test", body = MessageResponse)
    ),
    tag = "ScoreGrade",
    security(("bearer_auth" = []))
)]
pub async fn create_score_grade(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateScoreGrade>,
) -> Result<HttpResponse, ApiError> {
    let max_score = payload.max_score.unwrap_or(DEFAULT_MAX_SCORE);
    check_score(payload.score, max_score)?;

    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        INSERT INTO score_grades (student_id, subject_id, test_id, score, max_score, term, year)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.student_id)
    .bind(payload.subject_id)
    .bind(payload.test_id)
    .bind(payload.score)
    .bind(max_score)
    .bind(payload.term.as_deref())
    .bind(payload.year)
    .execute(&mut *tx)
    .await?;

    let score_grade = fetch_score_grade(&mut tx, result.last_insert_id()).await?;
    tx.commit().await?;

    info!(
        score_grade_id = score_grade.id,
        student_id = score_grade.student_id,
        subject_id = score_grade.subject_id,
        "Score recorded"
    );
    Ok(HttpResponse::Created().json(score_grade))
}

/// List Scores
#[utoipa::path(
    get,
    path = "/api/score-grades",
    params(ScoreGradeQuery),
    responses((status = 200, description = "Paginated score list", body = ScoreGradeListResponse)),
    tag = "ScoreGrade",
    security(("bearer_auth" = []))
)]
pub async fn list_score_grades(
    pool: web::Data<MySqlPool>,
    query: web::Query<ScoreGradeQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = Page::new(query.page, query.per_page);

    let mut filters = Filters::new();
    if let Some(student_id) = query.student_id {
        filters.eq("sg.student_id = ?", student_id);
    }
    if let Some(subject_id) = query.subject_id {
        filters.eq("sg.subject_id = ?", subject_id);
    }
    if let Some(term) = query.term.as_deref() {
        filters.eq("sg.term = ?", term);
    }
    if let Some(year) = query.year {
        filters.eq("sg.year = ?", year);
    }
    let where_clause = filters.where_clause();

    let total = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM score_grades sg {}",
        where_clause
    ))
    .bind_values(filters.values())
    .fetch_one(pool.get_ref())
    .await?;

    let data_sql = format!(
        "{} {} ORDER BY sg.id DESC LIMIT ? OFFSET ?",
        SCORE_GRADE_SELECT, where_clause
    );
    debug!(sql = %data_sql, "Fetching score grades");

    let data = sqlx::query_as::<_, ScoreGradeRow>(&data_sql)
        .bind_values(filters.values())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool.get_ref())
        .await?
        .into_iter()
        .map(ScoreGrade::from)
        .collect();

    Ok(HttpResponse::Ok().json(ScoreGradeListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
        pages: page.total_pages(total),
    }))
}

/// Get Score by ID
#[utoipa::path(
    get,
    path = "/api/score-grades/{score_grade_id}",
    params(("score_grade_id" = u64, Path, description = "Score grade ID")),
    responses(
        (status = 200, description = "Score found", body = ScoreGrade),
        (status = 404, description = "Score grade not found", body = MessageResponse)
    ),
    tag = "ScoreGrade",
    security(("bearer_auth" = []))
)]
pub async fn get_score_grade(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let mut conn = pool.acquire().await?;
    let score_grade = fetch_score_grade(&mut conn, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(score_grade))
}

/// Update Score
#[utoipa::path(
    put,
    path = "/api/score-grades/{score_grade_id}",
    params(("score_grade_id" = u64, Path, description = "Score grade ID")),
    request_body = UpdateScoreGrade,
    responses(
        (status = 200, description = "Score updated", body = ScoreGrade),
        (status = 400, description = "Unknown field or invalid value", body = MessageResponse),
        (status = 404, description = "Score grade not found", body = MessageResponse)
    ),
    tag = "ScoreGrade",
    security(("bearer_auth" = []))
)]
pub async fn update_score_grade(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let score_grade_id = path.into_inner();

    if let Some(max_score) = body.get("max_score") {
        let max_score = max_score
            .as_f64()
            .ok_or_else(|| ApiError::bad_request("max_score must be a number"))?;
        check_score(None, max_score)?;
    }

    let update = build_update_sql::<UpdateScoreGrade>(
        "score_grades",
        &body,
        UPDATABLE_COLUMNS,
        "id",
        score_grade_id,
    )?;

    let mut tx = pool.begin().await?;
    fetch_score_grade(&mut tx, score_grade_id).await?;
    execute_update(&mut *tx, update).await?;
    let score_grade = fetch_score_grade(&mut tx, score_grade_id).await?;
    tx.commit().await?;

    Ok(HttpResponse::Ok().json(score_grade))
}

/// Delete Score
#[utoipa::path(
    delete,
    path = "/api/score-grades/{score_grade_id}",
    params(("score_grade_id" = u64, Path, description = "Score grade ID")),
    responses(
        (status = 200, description = "Score deleted", body = MessageResponse),
        (status = 404, description = "Score grade not found", body = MessageResponse)
    ),
    tag = "ScoreGrade",
    security(("bearer_auth" = []))
)]
pub async fn delete_score_grade(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let score_grade_id = path.into_inner();
    let result = sqlx::query("DELETE FROM score_grades WHERE id = ?")
        .bind(score_grade_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Score grade"));
    }

    Ok(HttpResponse::Ok().json(MessageResponse::new("Score grade deleted successfully")))
}
