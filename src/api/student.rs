use crate::{
    api::score_grade::SCORE_GRADE_SELECT,
    auth::auth::AuthUser,
    engine::fees,
    error::ApiError,
    model::{
        pickup_location::PickupLocation,
        score_grade::{ScoreGrade, ScoreGradeRow},
        student::{Student, StudentListItem},
    },
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
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

const UPDATABLE_COLUMNS: &[&str] = &[
    "name",
    "date_of_birth",
    "gender",
    "date_of_admission",
    "class_id",
    "nemis_no",
    "assessment_no",
    "pickup_location_id",
];

#[derive(Deserialize, ToSchema)]
pub struct CreateStudent {
    #[schema(example = "Amina Wanjiru")]
    pub name: String,
    #[schema(example = "2015-04-02", format = "date", value_type = String)]
    pub date_of_birth: NaiveDate,
    #[schema(example = "female")]
    pub gender: String,
    #[schema(example = "2024-01-08", format = "date", value_type = String)]
    pub date_of_admission: NaiveDate,
    #[schema(example = 3)]
    pub class_id: u64,
    #[schema(example = 12345678)]
    pub nemis_no: Option<i64>,
    #[schema(example = 987654)]
    pub assessment_no: Option<i64>,
    #[schema(example = 2)]
    pub pickup_location_id: Option<u64>,
}

/// Partial update; only the listed keys are accepted.
#[derive(Deserialize, Serialize, ToSchema)]
pub struct UpdateStudent {
    pub name: Option<String>,
    #[schema(format = "date", value_type = Option<String>)]
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    #[schema(format = "date", value_type = Option<String>)]
    pub date_of_admission: Option<NaiveDate>,
    pub class_id: Option<u64>,
    pub nemis_no: Option<i64>,
    pub assessment_no: Option<i64>,
    pub pickup_location_id: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StudentQuery {
    /// Page number, starting at 1
    pub page: Option<u32>,
    /// Items per page (1-100)
    pub per_page: Option<u32>,
    /// Only students of this class
    pub class_id: Option<u64>,
    /// Substring of the student's name
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct StudentListResponse {
    pub data: Vec<StudentListItem>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
    #[schema(example = 5)]
    pub pages: i64,
}

#[derive(Serialize, ToSchema)]
pub struct StudentDetail {
    #[serde(flatten)]
    pub student: Student,
    #[schema(example = "Grade 4")]
    pub class_name: String,
    pub pickup_location: Option<PickupLocation>,
    pub scores: Vec<ScoreGrade>,
}

pub(crate) async fn fetch_student(
    conn: &mut MySqlConnection,
    student_id: u64,
) -> Result<Student, ApiError> {
    sqlx::query_as::<_, Student>(
        r#"
        SELECT id, name, date_of_birth, gender, date_of_admission, class_id,
               nemis_no, assessment_no, pickup_location_id
        FROM students
        WHERE id = ?
        "#,
    )
    .bind(student_id)
    .fetch_optional(conn)
    .await?
    .ok_or(ApiError::NotFound("Student"))
}

/// Create Student
#[utoipa::path(
    post,
    path = "/api/students",
    request_body = CreateStudent,
    responses(
        (status = 201, description = "Student created", body = Student),
        (status = 400, description = "Invalid payload or unknown class/pickup location", body = MessageResponse)
    ),
    tag = "Student",
    security(("bearer_auth" = []))
)]
pub async fn create_student(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateStudent>,
) -> Result<HttpResponse, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::bad_request("name must not be empty"));
    }

    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        INSERT INTO students
        (name, date_of_birth, gender, date_of_admission, class_id, nemis_no, assessment_no, pickup_location_id)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.name.trim())
    .bind(payload.date_of_birth)
    .bind(&payload.gender)
    .bind(payload.date_of_admission)
    .bind(payload.class_id)
    .bind(payload.nemis_no)
    .bind(payload.assessment_no)
    .bind(payload.pickup_location_id)
    .execute(&mut *tx)
    .await?;

    let student = fetch_student(&mut tx, result.last_insert_id()).await?;
    tx.commit().await?;

    info!(student_id = student.id, class_id = student.class_id, "Student created");
    Ok(HttpResponse::Created().json(student))
}

/// List Students
#[utoipa::path(
    get,
    path = "/api/students",
    params(StudentQuery),
    responses(
        (status = 200, description = "Paginated student list", body = StudentListResponse)
    ),
    tag = "Student",
    security(("bearer_auth" = []))
)]
pub async fn list_students(
    pool: web::Data<MySqlPool>,
    query: web::Query<StudentQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = Page::new(query.page, query.per_page);

    let mut filters = Filters::new();
    if let Some(class_id) = query.class_id {
        filters.eq("s.class_id = ?", class_id);
    }
    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        filters.like("s.name LIKE ?", search, 1);
    }
    let where_clause = filters.where_clause();

    let count_sql = format!("SELECT COUNT(*) FROM students s {}", where_clause);
    let total = sqlx::query_scalar::<_, i64>(&count_sql)
        .bind_values(filters.values())
        .fetch_one(pool.get_ref())
        .await?;

    let data_sql = format!(
        r#"
        SELECT s.id, s.name, s.date_of_birth, s.gender, s.date_of_admission, s.class_id,
               c.class_name, s.nemis_no, s.assessment_no, s.pickup_location_id
        FROM students s
        JOIN classes c ON c.id = s.class_id
        {}
        ORDER BY s.id
        LIMIT ? OFFSET ?
        "#,
        where_clause
    );
    debug!(sql = %data_sql, page = page.page, per_page = page.per_page, "Fetching students");

    let data = sqlx::query_as::<_, StudentListItem>(&data_sql)
        .bind_values(filters.values())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(StudentListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
        pages: page.total_pages(total),
    }))
}

/// Get Student by ID, with class, pickup location and recorded scores
#[utoipa::path(
    get,
    path = "/api/students/{student_id}",
    params(("student_id" = u64, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student found", body = StudentDetail),
        (status = 404, description = "Student not found", body = MessageResponse)
    ),
    tag = "Student",
    security(("bearer_auth" = []))
)]
pub async fn get_student(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let student_id = path.into_inner();
    let mut conn = pool.acquire().await?;

    let student = fetch_student(&mut conn, student_id).await?;

    let class_name = sqlx::query_scalar::<_, String>("SELECT class_name FROM classes WHERE id = ?")
        .bind(student.class_id)
        .fetch_one(&mut *conn)
        .await?;

    let pickup_location = match student.pickup_location_id {
        Some(location_id) => {
            sqlx::query_as::<_, PickupLocation>(
                "SELECT id, location_name, transport_fee FROM pickup_locations WHERE id = ?",
            )
            .bind(location_id)
            .fetch_optional(&mut *conn)
            .await?
        }
        None => None,
    };

    let scores_sql = format!("{} WHERE sg.student_id = ? ORDER BY sg.id", SCORE_GRADE_SELECT);
    let scores = sqlx::query_as::<_, ScoreGradeRow>(&scores_sql)
        .bind(student_id)
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(ScoreGrade::from)
        .collect();

    Ok(HttpResponse::Ok().json(StudentDetail {
        student,
        class_name,
        pickup_location,
        scores,
    }))
}

/// Update Student
#[utoipa::path(
    put,
    path = "/api/students/{student_id}",
    params(("student_id" = u64, Path, description = "Student ID")),
    request_body = UpdateStudent,
    responses(
        (status = 200, description = "Student updated", body = Student),
        (status = 400, description = "Unknown field or invalid value", body = MessageResponse),
        (status = 404, description = "Student not found", body = MessageResponse)
    ),
    tag = "Student",
    security(("bearer_auth" = []))
)]
pub async fn update_student(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let student_id = path.into_inner();
    let update = build_update_sql::<UpdateStudent>(
        "students",
        &body,
        UPDATABLE_COLUMNS,
        "id",
        student_id,
    )?;

    let mut tx = pool.begin().await?;
    fetch_student(&mut tx, student_id).await?;
    execute_update(&mut *tx, update).await?;
    let student = fetch_student(&mut tx, student_id).await?;
    tx.commit().await?;

    Ok(HttpResponse::Ok().json(student))
}

/// Delete Student, together with its scores and fee payments
#[utoipa::path(
    delete,
    path = "/api/students/{student_id}",
    params(("student_id" = u64, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student deleted", body = MessageResponse),
        (status = 403, description = "Admin only", body = MessageResponse),
        (status = 404, description = "Student not found", body = MessageResponse)
    ),
    tag = "Student",
    security(("bearer_auth" = []))
)]
pub async fn delete_student(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let student_id = path.into_inner();
    let result = sqlx::query("DELETE FROM students WHERE id = ?")
        .bind(student_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Student"));
    }

    info!(student_id, by = %auth.username, "Student deleted");
    Ok(HttpResponse::Ok().json(MessageResponse::new("Student deleted successfully")))
}

/// Current fee position of a student: what they owe, have paid, and still owe
#[utoipa::path(
    get,
    path = "/api/students/{student_id}/balance",
    params(("student_id" = u64, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Fee statement", body = crate::engine::fees::FeeStatement),
        (status = 400, description = "No fee structure for the student's class", body = MessageResponse),
        (status = 404, description = "Student not found", body = MessageResponse)
    ),
    tag = "Student",
    security(("bearer_auth" = []))
)]
pub async fn student_balance(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let student_id = path.into_inner();
    let mut conn = pool.acquire().await?;

    let account = fees::load_account(&mut conn, student_id)
        .await?
        .ok_or(ApiError::NotFound("Student"))?;

    let statement = fees::statement(&mut conn, &account).await?;
    Ok(HttpResponse::Ok().json(statement))
}
