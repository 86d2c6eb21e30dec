use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// An examination sitting that score grades can be recorded against.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Test {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Mid-term exam")]
    pub name: String,
    #[schema(example = "Term 1")]
    pub term: String,
    #[schema(example = 2026)]
    pub year: i32,
}
