use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A teacher row joined to the name of the subject they teach.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Teacher {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Grace")]
    pub first_name: String,

    #[schema(example = "Otieno")]
    pub last_name: String,

    #[schema(example = "2020-01-06", value_type = String, format = "date")]
    pub date_of_admission: NaiveDate,

    #[schema(example = 2, nullable = true)]
    pub subject_id: Option<u64>,

    #[schema(example = "Mathematics", nullable = true)]
    pub subject_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct TeacherSummary {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
}
