use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct PickupLocation {
    #[schema(example = 2)]
    pub id: u64,
    #[schema(example = "Kilimani stage")]
    pub location_name: String,
    #[schema(example = 500.0)]
    pub transport_fee: f64,
}
