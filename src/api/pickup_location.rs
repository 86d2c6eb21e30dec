use crate::{
    error::ApiError,
    model::pickup_location::PickupLocation,
    models::MessageResponse,
    utils::pagination::{Page, PageParams},
};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use sqlx::{MySqlConnection, MySqlPool};
use tracing::info;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreatePickupLocation {
    #[schema(example = "Kilimani stage")]
    pub location_name: String,
    /// Defaults to 0
    #[schema(example = 500.0)]
    pub transport_fee: Option<f64>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdatePickupLocation {
    pub location_name: Option<String>,
    pub transport_fee: Option<f64>,
}

#[derive(Serialize, ToSchema)]
pub struct PickupLocationListResponse {
    pub data: Vec<PickupLocation>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub pages: i64,
}

async fn fetch_location(
    conn: &mut MySqlConnection,
    location_id: u64,
) -> Result<PickupLocation, ApiError> {
    sqlx::query_as::<_, PickupLocation>(
        "SELECT id, location_name, transport_fee FROM pickup_locations WHERE id = ?",
    )
    .bind(location_id)
    .fetch_optional(conn)
    .await?
    .ok_or(ApiError::NotFound("Pickup location"))
}

fn check_fee(fee: f64) -> Result<f64, ApiError> {
    if !fee.is_finite() || fee < 0.0 {
        return Err(ApiError::bad_request("transport_fee must be a non-negative number"));
    }
    Ok(fee)
}

/// Create Pickup Location
#[utoipa::path(
    post,
    path = "/api/pickup-locations",
    request_body = CreatePickupLocation,
    responses(
        (status = 201, description = "Pickup location created", body = PickupLocation),
        (status = 400, description = "Invalid payload", body = MessageResponse)
    ),
    tag = "PickupLocation",
    security(("bearer_auth" = []))
)]
pub async fn create_pickup_location(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreatePickupLocation>,
) -> Result<HttpResponse, ApiError> {
    let location_name = payload.location_name.trim();
    if location_name.is_empty() {
        return Err(ApiError::bad_request("location_name must not be empty"));
    }
    let transport_fee = check_fee(payload.transport_fee.unwrap_or(0.0))?;

    let result =
        sqlx::query("INSERT INTO pickup_locations (location_name, transport_fee) VALUES (?, ?)")
            .bind(location_name)
            .bind(transport_fee)
            .execute(pool.get_ref())
            .await?;

    let location = PickupLocation {
        id: result.last_insert_id(),
        location_name: location_name.to_string(),
        transport_fee,
    };

    info!(location_id = location.id, transport_fee, "Pickup location created");
    Ok(HttpResponse::Created().json(location))
}

/// List Pickup Locations
#[utoipa::path(
    get,
    path = "/api/pickup-locations",
    params(PageParams),
    responses((status = 200, description = "Paginated pickup location list", body = PickupLocationListResponse)),
    tag = "PickupLocation",
    security(("bearer_auth" = []))
)]
pub async fn list_pickup_locations(
    pool: web::Data<MySqlPool>,
    query: web::Query<PageParams>,
) -> Result<HttpResponse, ApiError> {
    let page = Page::from(query.into_inner());

    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM pickup_locations")
        .fetch_one(pool.get_ref())
        .await?;

    let data = sqlx::query_as::<_, PickupLocation>(
        "SELECT id, location_name, transport_fee FROM pickup_locations ORDER BY location_name LIMIT ? OFFSET ?",
    )
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(PickupLocationListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
        pages: page.total_pages(total),
    }))
}

/// Get Pickup Location by ID
#[utoipa::path(
    get,
    path = "/api/pickup-locations/{location_id}",
    params(("location_id" = u64, Path, description = "Pickup location ID")),
    responses(
        (status = 200, description = "Pickup location found", body = PickupLocation),
        (status = 404, description = "Pickup location not found", body = MessageResponse)
    ),
    tag = "PickupLocation",
    security(("bearer_auth" = []))
)]
pub async fn get_pickup_location(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let mut conn = pool.acquire().await?;
    let location = fetch_location(&mut conn, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(location))
}

/// Update Pickup Location
#[utoipa::path(
    put,
    path = "/api/pickup-locations/{location_id}",
    params(("location_id" = u64, Path, description = "Pickup location ID")),
    request_body = UpdatePickupLocation,
    responses(
        (status = 200, description = "Pickup location updated", body = PickupLocation),
        (status = 400, description = "Invalid payload", body = MessageResponse),
        (status = 404, description = "Pickup location not found", body = MessageResponse)
    ),
    tag = "PickupLocation",
    security(("bearer_auth" = []))
)]
pub async fn update_pickup_location(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdatePickupLocation>,
) -> Result<HttpResponse, ApiError> {
    let location_id = path.into_inner();

    let mut tx = pool.begin().await?;
    let current = fetch_location(&mut tx, location_id).await?;

    let location_name = match payload.location_name.as_deref().map(str::trim) {
        Some("") => return Err(ApiError::bad_request("location_name must not be empty")),
        Some(name) => name.to_string(),
        None => current.location_name,
    };
    let transport_fee = match payload.transport_fee {
        Some(fee) => check_fee(fee)?,
        None => current.transport_fee,
    };

    sqlx::query("UPDATE pickup_locations SET location_name = ?, transport_fee = ? WHERE id = ?")
        .bind(&location_name)
        .bind(transport_fee)
        .bind(location_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().json(PickupLocation {
        id: location_id,
        location_name,
        transport_fee,
    }))
}

/// Delete Pickup Location. Students using it keep their records, without
/// transport.
#[utoipa::path(
    delete,
    path = "/api/pickup-locations/{location_id}",
    params(("location_id" = u64, Path, description = "Pickup location ID")),
    responses(
        (status = 200, description = "Pickup location deleted", body = MessageResponse),
        (status = 404, description = "Pickup location not found", body = MessageResponse)
    ),
    tag = "PickupLocation",
    security(("bearer_auth" = []))
)]
pub async fn delete_pickup_location(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let location_id = path.into_inner();
    let result = sqlx::query("DELETE FROM pickup_locations WHERE id = ?")
        .bind(location_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Pickup location"));
    }

    info!(location_id, "Pickup location deleted");
    Ok(HttpResponse::Ok().json(MessageResponse::new("Pickup location deleted successfully")))
}
