use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Subject {
    #[schema(example = 2)]
    pub id: u64,
    #[schema(example = "Mathematics")]
    pub subject_name: String,
}
