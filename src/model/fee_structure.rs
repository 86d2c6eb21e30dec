use serde::Serialize;
use utoipa::ToSchema;

use crate::engine::fees::FeeComponents;
use crate::model::class::ClassSummary;

/// Fee structure row joined to its class name.
#[derive(Debug, sqlx::FromRow)]
pub struct FeeStructureRow {
    pub id: u64,
    pub class_id: u64,
    pub class_name: Option<String>,
    #[sqlx(flatten)]
    pub components: FeeComponents,
    pub total_fee: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FeeStructure {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 3)]
    pub class_id: u64,
    pub class_details: Option<ClassSummary>,
    #[serde(flatten)]
    pub components: FeeComponents,
    #[schema(example = 10000.0)]
    pub total_fee: f64,
}

impl From<FeeStructureRow> for FeeStructure {
    fn from(row: FeeStructureRow) -> Self {
        FeeStructure {
            id: row.id,
            class_id: row.class_id,
            class_details: row.class_name.map(|class_name| ClassSummary {
                id: row.class_id,
                class_name,
            }),
            components: row.components,
            total_fee: row.total_fee,
        }
    }
}
