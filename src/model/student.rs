use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Student {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Amina Wanjiru")]
    pub name: String,

    #[schema(example = "2015-04-02", value_type = String, format = "date")]
    pub date_of_birth: NaiveDate,

    #[schema(example = "female")]
    pub gender: String,

    #[schema(example = "2024-01-08", value_type = String, format = "date")]
    pub date_of_admission: NaiveDate,

    #[schema(example = 3)]
    pub class_id: u64,

    #[schema(example = 12345678, nullable = true)]
    pub nemis_no: Option<i64>,

    #[schema(example = 987654, nullable = true)]
    pub assessment_no: Option<i64>,

    #[schema(example = 2, nullable = true)]
    pub pickup_location_id: Option<u64>,
}

/// A student row joined to the name of its class.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct StudentListItem {
    pub id: u64,
    pub name: String,
    #[schema(value_type = String, format = "date")]
    pub date_of_birth: NaiveDate,
    pub gender: String,
    #[schema(value_type = String, format = "date")]
    pub date_of_admission: NaiveDate,
    pub class_id: u64,
    #[schema(example = "Grade 4")]
    pub class_name: String,
    pub nemis_no: Option<i64>,
    pub assessment_no: Option<i64>,
    pub pickup_location_id: Option<u64>,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct StudentSummary {
    pub id: u64,
    pub name: String,
}
