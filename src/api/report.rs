use crate::{
    engine::grading::{ReportLine, build_report},
    error::ApiError,
};
use actix_web::{HttpResponse, web};
use sqlx::MySqlPool;
use tracing::debug;

/// Term report for one student: every score of the term with its grade and
/// the average over the gradable ones.
#[utoipa::path(
    get,
    path = "/api/report/{student_id}/{term}/{year}",
    params(
        ("student_id" = u64, Path, description = "Student ID"),
        ("term" = String, Path, description = "Term, e.g. Term 1"),
        ("year" = i32, Path, description = "Academic year")
    ),
    responses(
        (status = 200, description = "Report", body = crate::engine::grading::StudentReport),
        (status = 404, description = "No scores found for the specified criteria", body = crate::models::MessageResponse)
    ),
    tag = "Report",
    security(("bearer_auth" = []))
)]
pub async fn student_report(
    pool: web::Data<MySqlPool>,
    path: web::Path<(u64, String, i32)>,
) -> Result<HttpResponse, ApiError> {
    let (student_id, term, year) = path.into_inner();

    let lines = sqlx::query_as::<_, ReportLine>(
        r#"
        SELECT sb.subject_name, sg.score, sg.max_score
        FROM score_grades sg
        JOIN subjects sb ON sb.id = sg.subject_id
        WHERE sg.student_id = ? AND sg.term = ? AND sg.year = ?
        ORDER BY sb.subject_name, sg.id
        "#,
    )
    .bind(student_id)
    .bind(&term)
    .bind(year)
    .fetch_all(pool.get_ref())
    .await?;

    debug!(student_id, %term, year, rows = lines.len(), "Building report");

    let report = build_report(student_id, &term, year, lines)
        .map_err(|_| ApiError::NoMatch("No scores found for the specified criteria"))?;

    Ok(HttpResponse::Ok().json(report))
}
