use crate::{
    engine::fees::{FeeComponents, FeeComponentsInput, compute_total_fee},
    error::ApiError,
    model::fee_structure::{FeeStructure, FeeStructureRow},
    models::MessageResponse,
    utils::pagination::Page,
};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use sqlx::{MySqlConnection, MySqlPool};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

const FEE_STRUCTURE_SELECT: &str = r#"
    SELECT f.id, f.class_id, c.class_name,
           f.tuition_fee, f.books_fee, f.miscellaneous_fee, f.boarding_fee,
           f.prize_giving_fee, f.exam_fee, f.total_fee
    FROM fee_structures f
    LEFT JOIN classes c ON c.id = f.class_id
"#;

#[derive(Deserialize, ToSchema)]
pub struct CreateFeeStructure {
    #[schema(example = 3)]
    pub class_id: u64,
    #[serde(flatten)]
    pub components: FeeComponentsInput,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateFeeStructure {
    pub class_id: Option<u64>,
    #[serde(flatten)]
    pub components: FeeComponentsInput,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FeeStructureQuery {
    /// Page number, starting at 1
    pub page: Option<u32>,
    /// Items per page (1-100)
    pub per_page: Option<u32>,
    pub class_id: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct FeeStructureListResponse {
    pub data: Vec<FeeStructure>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub pages: i64,
}

async fn fetch_fee_structure(
    conn: &mut MySqlConnection,
    fee_structure_id: u64,
) -> Result<FeeStructure, ApiError> {
    let sql = format!("{} WHERE f.id = ?", FEE_STRUCTURE_SELECT);
    sqlx::query_as::<_, FeeStructureRow>(&sql)
        .bind(fee_structure_id)
        .fetch_optional(conn)
        .await?
        .map(FeeStructure::from)
        .ok_or(ApiError::NotFound("Fee structure"))
}

fn duplicate_class(e: sqlx::Error) -> ApiError {
    match ApiError::from(e) {
        ApiError::Conflict(_) => {
            ApiError::Conflict("A fee structure already exists for this class".to_string())
        }
        other => other,
    }
}

/// Create a class fee structure. `total_fee` is the sum of the components.
#[utoipa::path(
    post,
    path = "/api/fee-structures",
    request_body = CreateFeeStructure,
    responses(
        (status = 201, description = "Fee structure created", body = FeeStructure),
        (status = 400, description = "Negative component or unknown class", body = MessageResponse),
        (status = 409, description = "Class already has a fee structure", body = MessageResponse)
    ),
    tag = "FeeStructure",
    security(("bearer_auth" = []))
)]
pub async fn create_fee_structure(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateFeeStructure>,
) -> Result<HttpResponse, ApiError> {
    payload.components.validate()?;
    let components = FeeComponents::from(&payload.components);
    let total_fee = compute_total_fee(&components);

    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        INSERT INTO fee_structures
        (class_id, tuition_fee, books_fee, miscellaneous_fee, boarding_fee, prize_giving_fee, exam_fee, total_fee)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.class_id)
    .bind(components.tuition_fee)
    .bind(components.books_fee)
    .bind(components.miscellaneous_fee)
    .bind(components.boarding_fee)
    .bind(components.prize_giving_fee)
    .bind(components.exam_fee)
    .bind(total_fee)
    .execute(&mut *tx)
    .await
    .map_err(duplicate_class)?;

    let fee_structure = fetch_fee_structure(&mut tx, result.last_insert_id()).await?;
    tx.commit().await?;

    info!(
        fee_structure_id = fee_structure.id,
        class_id = fee_structure.class_id,
        total_fee,
        "Fee structure created"
    );
    Ok(HttpResponse::Created().json(fee_structure))
}

/// List Fee Structures
#[utoipa::path(
    get,
    path = "/api/fee-structures",
    params(FeeStructureQuery),
    responses((status = 200, description = "Paginated fee structure list", body = FeeStructureListResponse)),
    tag = "FeeStructure",
    security(("bearer_auth" = []))
)]
pub async fn list_fee_structures(
    pool: web::Data<MySqlPool>,
    query: web::Query<FeeStructureQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = Page::new(query.page, query.per_page);

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM fee_structures WHERE (? IS NULL OR class_id = ?)",
    )
    .bind(query.class_id)
    .bind(query.class_id)
    .fetch_one(pool.get_ref())
    .await?;

    let data_sql = format!(
        "{} WHERE (? IS NULL OR f.class_id = ?) ORDER BY f.id LIMIT ? OFFSET ?",
        FEE_STRUCTURE_SELECT
    );
    let data = sqlx::query_as::<_, FeeStructureRow>(&data_sql)
        .bind(query.class_id)
        .bind(query.class_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool.get_ref())
        .await?
        .into_iter()
        .map(FeeStructure::from)
        .collect();

    Ok(HttpResponse::Ok().json(FeeStructureListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
        pages: page.total_pages(total),
    }))
}

/// Get Fee Structure by ID
#[utoipa::path(
    get,
    path = "/api/fee-structures/{fee_structure_id}",
    params(("fee_structure_id" = u64, Path, description = "Fee structure ID")),
    responses(
        (status = 200, description = "Fee structure found", body = FeeStructure),
        (status = 404, description = "Fee structure not found", body = MessageResponse)
    ),
    tag = "FeeStructure",
    security(("bearer_auth" = []))
)]
pub async fn get_fee_structure(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let mut conn = pool.acquire().await?;
    let fee_structure = fetch_fee_structure(&mut conn, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(fee_structure))
}

/// Update Fee Structure. Omitted components keep their stored value and
/// `total_fee` is recomputed from the result.
#[utoipa::path(
    put,
    path = "/api/fee-structures/{fee_structure_id}",
    params(("fee_structure_id" = u64, Path, description = "Fee structure ID")),
    request_body = UpdateFeeStructure,
    responses(
        (status = 200, description = "Fee structure updated", body = FeeStructure),
        (status = 400, description = "Negative component or unknown class", body = MessageResponse),
        (status = 404, description = "Fee structure not found", body = MessageResponse),
        (status = 409, description = "Target class already has a fee structure", body = MessageResponse)
    ),
    tag = "FeeStructure",
    security(("bearer_auth" = []))
)]
pub async fn update_fee_structure(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateFeeStructure>,
) -> Result<HttpResponse, ApiError> {
    let fee_structure_id = path.into_inner();
    payload.components.validate()?;

    let mut tx = pool.begin().await?;

    let (class_id, stored) = sqlx::query_as::<_, (u64, f64, f64, f64, f64, f64, f64)>(
        r#"
        SELECT class_id, tuition_fee, books_fee, miscellaneous_fee, boarding_fee,
               prize_giving_fee, exam_fee
        FROM fee_structures
        WHERE id = ?
        FOR UPDATE
        "#,
    )
    .bind(fee_structure_id)
    .fetch_optional(&mut *tx)
    .await?
    .map(|(class_id, tuition, books, misc, boarding, prize, exam)| {
        (
            class_id,
            FeeComponents {
                tuition_fee: tuition,
                books_fee: books,
                miscellaneous_fee: misc,
                boarding_fee: boarding,
                prize_giving_fee: prize,
                exam_fee: exam,
            },
        )
    })
    .ok_or(ApiError::NotFound("Fee structure"))?;

    let components = payload.components.apply_to(stored);
    let total_fee = compute_total_fee(&components);

    sqlx::query(
        r#"
        UPDATE fee_structures
        SET class_id = ?, tuition_fee = ?, books_fee = ?, miscellaneous_fee = ?,
            boarding_fee = ?, prize_giving_fee = ?, exam_fee = ?, total_fee = ?
        WHERE id = ?
        "#,
    )
    .bind(payload.class_id.unwrap_or(class_id))
    .bind(components.tuition_fee)
    .bind(components.books_fee)
    .bind(components.miscellaneous_fee)
    .bind(components.boarding_fee)
    .bind(components.prize_giving_fee)
    .bind(components.exam_fee)
    .bind(total_fee)
    .bind(fee_structure_id)
    .execute(&mut *tx)
    .await
    .map_err(duplicate_class)?;

    let fee_structure = fetch_fee_structure(&mut tx, fee_structure_id).await?;
    tx.commit().await?;

    info!(fee_structure_id, total_fee, "Fee structure updated");
    Ok(HttpResponse::Ok().json(fee_structure))
}

/// Delete Fee Structure
#[utoipa::path(
    delete,
    path = "/api/fee-structures/{fee_structure_id}",
    params(("fee_structure_id" = u64, Path, description = "Fee structure ID")),
    responses(
        (status = 200, description = "Fee structure deleted", body = MessageResponse),
        (status = 404, description = "Fee structure not found", body = MessageResponse)
    ),
    tag = "FeeStructure",
    security(("bearer_auth" = []))
)]
pub async fn delete_fee_structure(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let fee_structure_id = path.into_inner();
    let result = sqlx::query("DELETE FROM fee_structures WHERE id = ?")
        .bind(fee_structure_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Fee structure"));
    }

    info!(fee_structure_id, "Fee structure deleted");
    Ok(HttpResponse::Ok().json(MessageResponse::new("Fee structure deleted successfully")))
}
