use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::teacher::TeacherSummary;

/// Class row with its assigned teacher's name columns (LEFT JOIN).
#[derive(Debug, sqlx::FromRow)]
pub struct ClassRow {
    pub id: u64,
    pub class_name: String,
    pub teacher_id: Option<u64>,
    pub teacher_first_name: Option<String>,
    pub teacher_last_name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Class {
    #[schema(example = 3)]
    pub id: u64,
    #[schema(example = "Grade 4")]
    pub class_name: String,
    #[schema(example = 1, nullable = true)]
    pub teacher_id: Option<u64>,
    pub teacher: Option<TeacherSummary>,
}

impl From<ClassRow> for Class {
    fn from(row: ClassRow) -> Self {
        let teacher = match (row.teacher_id, row.teacher_first_name, row.teacher_last_name) {
            (Some(id), Some(first_name), Some(last_name)) => Some(TeacherSummary {
                id,
                first_name,
                last_name,
            }),
            _ => None,
        };

        Class {
            id: row.id,
            class_name: row.class_name,
            teacher_id: row.teacher_id,
            teacher,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct ClassSummary {
    #[schema(example = 3)]
    pub id: u64,
    #[schema(example = "Grade 4")]
    pub class_name: String,
}
