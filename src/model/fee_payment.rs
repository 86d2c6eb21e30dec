use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One payment event. `balance` is what the student still owed right after
/// this payment was recorded.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct FeePayment {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 7)]
    pub student_id: u64,
    #[schema(example = 3000.0)]
    pub amount: f64,
    #[schema(example = "2026-01-15", value_type = String, format = "date")]
    pub payment_date: NaiveDate,
    #[schema(example = "Term 1")]
    pub term: String,
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = "mpesa")]
    pub method: String,
    #[schema(example = 7000.0)]
    pub balance: f64,
}
