use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use utoipa::ToSchema;

/// Letter bands, declared worst to best so `Ord` follows grade quality.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display, AsRefStr,
    ToSchema,
)]
pub enum LetterGrade {
    #[serde(rename = "E")]
    #[strum(serialize = "E")]
    E,
    #[serde(rename = "D-")]
    #[strum(serialize = "D-")]
    DMinus,
    #[serde(rename = "D")]
    #[strum(serialize = "D")]
    D,
    #[serde(rename = "D+")]
    #[strum(serialize = "D+")]
    DPlus,
    #[serde(rename = "C-")]
    #[strum(serialize = "C-")]
    CMinus,
    #[serde(rename = "C")]
    #[strum(serialize = "C")]
    C,
    #[serde(rename = "C+")]
    #[strum(serialize = "C+")]
    CPlus,
    #[serde(rename = "B-")]
    #[strum(serialize = "B-")]
    BMinus,
    #[serde(rename = "B")]
    #[strum(serialize = "B")]
    B,
    #[serde(rename = "B+")]
    #[strum(serialize = "B+")]
    BPlus,
    #[serde(rename = "A-")]
    #[strum(serialize = "A-")]
    AMinus,
    #[serde(rename = "A")]
    #[strum(serialize = "A")]
    A,
}

/// Lower bound (inclusive) of each band, highest first. Anything below the
/// last threshold is an E.
const BANDS: [(f64, LetterGrade); 11] = [
    (80.0, LetterGrade::A),
    (75.0, LetterGrade::AMinus),
    (70.0, LetterGrade::BPlus),
    (65.0, LetterGrade::B),
    (60.0, LetterGrade::BMinus),
    (55.0, LetterGrade::CPlus),
    (50.0, LetterGrade::C),
    (45.0, LetterGrade::CMinus),
    (40.0, LetterGrade::DPlus),
    (35.0, LetterGrade::D),
    (30.0, LetterGrade::DMinus),
];

/// Maps a percentage onto its letter band. Percentages are not clamped.
pub fn calculate_grade(percentage: Option<f64>) -> Option<LetterGrade> {
    let percentage = percentage?;

    let grade = BANDS
        .iter()
        .find(|(threshold, _)| percentage >= *threshold)
        .map(|(_, grade)| *grade)
        .unwrap_or(LetterGrade::E);

    Some(grade)
}

/// `100 * score / max_score`, defined only for a recorded score over a
/// positive maximum.
pub fn percentage_of(score: Option<f64>, max_score: f64) -> Option<f64> {
    match score {
        Some(score) if max_score > 0.0 => Some(score / max_score * 100.0),
        _ => None,
    }
}

/// One score row for the report, already joined to its subject.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReportLine {
    pub subject_name: String,
    pub score: Option<f64>,
    pub max_score: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubjectResult {
    #[schema(example = "Mathematics")]
    pub subject_name: String,
    #[schema(example = 78.0)]
    pub score: Option<f64>,
    #[schema(example = 100.0)]
    pub max_score: f64,
    pub grade: Option<LetterGrade>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentReport {
    #[schema(example = 1)]
    pub student_id: u64,
    #[schema(example = "Term 1")]
    pub term: String,
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = 65.0)]
    pub average_percentage: Option<f64>,
    pub average_grade: Option<LetterGrade>,
    pub subjects: Vec<SubjectResult>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct NoScores;

/// Builds a term report. Rows without a usable percentage are listed with no
/// grade and left out of the average.
pub fn build_report(
    student_id: u64,
    term: &str,
    year: i32,
    lines: Vec<ReportLine>,
) -> Result<StudentReport, NoScores> {
    if lines.is_empty() {
        return Err(NoScores);
    }

    let mut total_percentage = 0.0;
    let mut count = 0usize;
    let mut subjects = Vec::with_capacity(lines.len());

    for line in lines {
        let percentage = percentage_of(line.score, line.max_score);
        if let Some(p) = percentage {
            total_percentage += p;
            count += 1;
        }

        subjects.push(SubjectResult {
            subject_name: line.subject_name,
            score: line.score,
            max_score: line.max_score,
            grade: calculate_grade(percentage),
        });
    }

    let average_percentage = (count > 0).then(|| total_percentage / count as f64);

    Ok(StudentReport {
        student_id,
        term: term.to_string(),
        year,
        average_percentage,
        average_grade: calculate_grade(average_percentage),
        subjects,
    })
}
