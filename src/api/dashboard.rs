use crate::{error::ApiError, model::student::StudentSummary};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{FromRow, MySqlPool};
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct DashboardSummary {
    #[schema(example = 420)]
    pub students: i64,
    #[schema(example = 18)]
    pub teachers: i64,
    #[schema(example = 9)]
    pub classes: i64,
    #[schema(example = 11)]
    pub subjects: i64,
}

#[derive(Serialize, FromRow, ToSchema)]
pub struct RecentAdmission {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub student: StudentSummary,
    #[schema(example = "2026-01-08", value_type = String, format = "date")]
    pub date_of_admission: NaiveDate,
    #[schema(example = "Grade 4")]
    pub class_name: String,
}

#[derive(Serialize, ToSchema)]
pub struct Notifications {
    pub recent_admissions: Vec<RecentAdmission>,
}

#[derive(Serialize, FromRow, ToSchema)]
pub struct EnrollmentPoint {
    #[schema(example = "2026-01")]
    pub month: String,
    #[schema(example = 14)]
    pub admissions: i64,
}

#[derive(Serialize, FromRow, ToSchema)]
pub struct SubjectPopularity {
    #[schema(example = "Mathematics")]
    pub subject_name: String,
    #[schema(example = 312)]
    pub score_count: i64,
}

#[derive(Serialize, ToSchema)]
pub struct QuickLink {
    #[schema(example = "Add student", value_type = String)]
    pub label: &'static str,
    #[schema(example = "/api/students", value_type = String)]
    pub href: &'static str,
}

const QUICK_LINKS: [QuickLink; 5] = [
    QuickLink { label: "Add student", href: "/api/students" },
    QuickLink { label: "Record score", href: "/api/score-grades" },
    QuickLink { label: "Record fee payment", href: "/api/fee-payments" },
    QuickLink { label: "Fee structures", href: "/api/fee-structures" },
    QuickLink { label: "Classes", href: "/api/classes" },
];

/// Entity counts
#[utoipa::path(
    get,
    path = "/api/dashboard/summary",
    responses((status = 200, description = "Counts per entity", body = DashboardSummary)),
    tag = "Dashboard",
    security(("bearer_auth" = []))
)]
pub async fn summary(pool: web::Data<MySqlPool>) -> Result<HttpResponse, ApiError> {
    let (students, teachers, classes, subjects) = sqlx::query_as::<_, (i64, i64, i64, i64)>(
        r#"
        SELECT (SELECT COUNT(*) FROM students),
               (SELECT COUNT(*) FROM teachers),
               (SELECT COUNT(*) FROM classes),
               (SELECT COUNT(*) FROM subjects)
        "#,
    )
    .fetch_one(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(DashboardSummary {
        students,
        teachers,
        classes,
        subjects,
    }))
}

/// The five most recently admitted students
#[utoipa::path(
    get,
    path = "/api/dashboard/notifications",
    responses((status = 200, description = "Recent admissions", body = Notifications)),
    tag = "Dashboard",
    security(("bearer_auth" = []))
)]
pub async fn notifications(pool: web::Data<MySqlPool>) -> Result<HttpResponse, ApiError> {
    let recent_admissions = sqlx::query_as::<_, RecentAdmission>(
        r#"
        SELECT s.id, s.name, s.date_of_admission, c.class_name
        FROM students s
        JOIN classes c ON c.id = s.class_id
        ORDER BY s.date_of_admission DESC, s.id DESC
        LIMIT 5
        "#,
    )
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(Notifications { recent_admissions }))
}

/// Admissions per month over the last year
#[utoipa::path(
    get,
    path = "/api/dashboard/chart/enrollment",
    responses((status = 200, description = "Admissions per YYYY-MM", body = [EnrollmentPoint])),
    tag = "Dashboard",
    security(("bearer_auth" = []))
)]
pub async fn enrollment_chart(pool: web::Data<MySqlPool>) -> Result<HttpResponse, ApiError> {
    let points = sqlx::query_as::<_, EnrollmentPoint>(
        r#"
        SELECT DATE_FORMAT(date_of_admission, '%Y-%m') AS month, COUNT(*) AS admissions
        FROM students
        WHERE date_of_admission >= CURDATE() - INTERVAL 365 DAY
        GROUP BY month
        ORDER BY month
        "#,
    )
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(points))
}

/// Subjects ranked by number of recorded scores
#[utoipa::path(
    get,
    path = "/api/dashboard/chart/subject-popularity",
    responses((status = 200, description = "Score counts per subject", body = [SubjectPopularity])),
    tag = "Dashboard",
    security(("bearer_auth" = []))
)]
pub async fn subject_popularity(pool: web::Data<MySqlPool>) -> Result<HttpResponse, ApiError> {
    let ranking = sqlx::query_as::<_, SubjectPopularity>(
        r#"
        SELECT sb.subject_name, COUNT(sg.id) AS score_count
        FROM subjects sb
        LEFT JOIN score_grades sg ON sg.subject_id = sb.id
        GROUP BY sb.id, sb.subject_name
        ORDER BY score_count DESC, sb.subject_name
        "#,
    )
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(ranking))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/quick-links",
    responses((status = 200, description = "Shortcuts for the dashboard", body = [QuickLink])),
    tag = "Dashboard",
    security(("bearer_auth" = []))
)]
pub async fn quick_links() -> HttpResponse {
    HttpResponse::Ok().json(QUICK_LINKS)
}
