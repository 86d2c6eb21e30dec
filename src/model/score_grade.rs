use serde::Serialize;
use utoipa::ToSchema;

use crate::engine::grading::{LetterGrade, calculate_grade, percentage_of};

/// Score row joined to its student and subject names.
#[derive(Debug, sqlx::FromRow)]
pub struct ScoreGradeRow {
    pub id: u64,
    pub student_id: u64,
    pub student_name: String,
    pub subject_id: u64,
    pub subject_name: String,
    pub test_id: Option<u64>,
    pub score: Option<f64>,
    pub max_score: f64,
    pub term: Option<String>,
    pub year: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScoreGrade {
    #[schema(example = 11)]
    pub id: u64,
    #[schema(example = 7)]
    pub student_id: u64,
    #[schema(example = "Amina Wanjiru")]
    pub student_name: String,
    #[schema(example = 2)]
    pub subject_id: u64,
    #[schema(example = "Mathematics")]
    pub subject_name: String,
    #[schema(example = 1, nullable = true)]
    pub test_id: Option<u64>,
    #[schema(example = 78.0, nullable = true)]
    pub score: Option<f64>,
    #[schema(example = 100.0)]
    pub max_score: f64,
    #[schema(example = "Term 1", nullable = true)]
    pub term: Option<String>,
    #[schema(example = 2026, nullable = true)]
    pub year: Option<i32>,
    #[schema(example = 78.0, nullable = true)]
    pub percentage: Option<f64>,
    pub grade: Option<LetterGrade>,
}

impl From<ScoreGradeRow> for ScoreGrade {
    fn from(row: ScoreGradeRow) -> Self {
        let percentage = percentage_of(row.score, row.max_score);

        ScoreGrade {
            id: row.id,
            student_id: row.student_id,
            student_name: row.student_name,
            subject_id: row.subject_id,
            subject_name: row.subject_name,
            test_id: row.test_id,
            score: row.score,
            max_score: row.max_score,
            term: row.term,
            year: row.year,
            percentage,
            grade: calculate_grade(percentage),
        }
    }
}
