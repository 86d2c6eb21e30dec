use crate::{
    engine::fees::{self, StudentAccount, compute_balance},
    error::ApiError,
    model::fee_payment::FeePayment,
    utils::{
        db_utils::{BindValues, Filters},
        pagination::Page,
    },
};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{MySqlConnection, MySqlPool};
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

const PAYMENT_COLUMNS: &str =
    "id, student_id, amount, payment_date, term, year, method, balance";

#[derive(Deserialize, ToSchema)]
pub struct CreateFeePayment {
    #[schema(example = 7)]
    pub student_id: u64,
    #[schema(example = 3000.0)]
    pub amount: f64,
    #[schema(example = "2026-01-15", format = "date", value_type = String)]
    pub payment_date: NaiveDate,
    #[schema(example = "Term 1")]
    pub term: String,
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = "mpesa")]
    pub method: String,
}

/// Omitted fields keep their stored value. The balance snapshot is always
/// recomputed.
#[derive(Deserialize, ToSchema)]
pub struct UpdateFeePayment {
    pub amount: Option<f64>,
    #[schema(format = "date", value_type = Option<String>)]
    pub payment_date: Option<NaiveDate>,
    pub term: Option<String>,
    pub year: Option<i32>,
    pub method: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FeePaymentQuery {
    /// Page number, starting at 1
    pub page: Option<u32>,
    /// Items per page (1-100)
    pub per_page: Option<u32>,
    pub student_id: Option<u64>,
    pub term: Option<String>,
    pub year: Option<i32>,
}

#[derive(Serialize, ToSchema)]
pub struct FeePaymentListResponse {
    pub data: Vec<FeePayment>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub pages: i64,
}

#[derive(Serialize, ToSchema)]
pub struct PaymentDeleted {
    #[schema(example = "Fee payment deleted successfully")]
    pub message: String,
    /// What the student owes once this payment is gone
    #[schema(example = 7000.0)]
    pub balance: f64,
}

fn check_amount(amount: f64) -> Result<f64, ApiError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ApiError::bad_request("amount must be greater than zero"));
    }
    Ok(amount)
}

async fn fetch_payment(
    conn: &mut MySqlConnection,
    payment_id: u64,
    for_update: bool,
) -> Result<FeePayment, ApiError> {
    let sql = format!(
        "SELECT {} FROM fee_payments WHERE id = ?{}",
        PAYMENT_COLUMNS,
        if for_update { " FOR UPDATE" } else { "" }
    );
    sqlx::query_as::<_, FeePayment>(&sql)
        .bind(payment_id)
        .fetch_optional(conn)
        .await?
        .ok_or(ApiError::NotFound("Fee payment"))
}

async fn account_of(conn: &mut MySqlConnection, student_id: u64) -> Result<StudentAccount, ApiError> {
    fees::load_account(conn, student_id)
        .await?
        .ok_or(ApiError::NotFound("Student"))
}

/// Record a payment. The response carries the balance the student owed
/// right after it.
#[utoipa::path(
    post,
    path = "/api/fee-payments",
    request_body = CreateFeePayment,
    responses(
        (status = 201, description = "Payment recorded", body = FeePayment),
        (status = 400, description = "Non-positive amount or no fee structure for the student's class", body = crate::models::MessageResponse),
        (status = 404, description = "Student not found", body = crate::models::MessageResponse)
    ),
    tag = "FeePayment",
    security(("bearer_auth" = []))
)]
pub async fn create_fee_payment(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateFeePayment>,
) -> Result<HttpResponse, ApiError> {
    let amount = check_amount(payload.amount)?;

    let mut tx = pool.begin().await?;

    let account = account_of(&mut tx, payload.student_id).await?;
    let balance = fees::balance_after(&mut tx, &account, amount, None).await?;

    let result = sqlx::query(
        r#"
        INSERT INTO fee_payments (student_id, amount, payment_date, term, year, method, balance)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.student_id)
    .bind(amount)
    .bind(payload.payment_date)
    .bind(&payload.term)
    .bind(payload.year)
    .bind(&payload.method)
    .bind(balance)
    .execute(&mut *tx)
    .await?;

    let payment = fetch_payment(&mut tx, result.last_insert_id(), false).await?;
    tx.commit().await?;

    info!(
        payment_id = payment.id,
        student_id = payment.student_id,
        amount,
        balance,
        "Fee payment recorded"
    );
    Ok(HttpResponse::Created().json(payment))
}

/// List Payments
#[utoipa::path(
    get,
    path = "/api/fee-payments",
    params(FeePaymentQuery),
    responses((status = 200, description = "Paginated payment list", body = FeePaymentListResponse)),
    tag = "FeePayment",
    security(("bearer_auth" = []))
)]
pub async fn list_fee_payments(
    pool: web::Data<MySqlPool>,
    query: web::Query<FeePaymentQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = Page::new(query.page, query.per_page);

    let mut filters = Filters::new();
    if let Some(student_id) = query.student_id {
        filters.eq("student_id = ?", student_id);
    }
    if let Some(term) = query.term.as_deref() {
        filters.eq("term = ?", term);
    }
    if let Some(year) = query.year {
        filters.eq("year = ?", year);
    }
    let where_clause = filters.where_clause();

    let total = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM fee_payments {}",
        where_clause
    ))
    .bind_values(filters.values())
    .fetch_one(pool.get_ref())
    .await?;

    let data_sql = format!(
        "SELECT {} FROM fee_payments {} ORDER BY payment_date DESC, id DESC LIMIT ? OFFSET ?",
        PAYMENT_COLUMNS, where_clause
    );
    let data = sqlx::query_as::<_, FeePayment>(&data_sql)
        .bind_values(filters.values())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(FeePaymentListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
        pages: page.total_pages(total),
    }))
}

/// Get Payment by ID
#[utoipa::path(
    get,
    path = "/api/fee-payments/{payment_id}",
    params(("payment_id" = u64, Path, description = "Fee payment ID")),
    responses(
        (status = 200, description = "Payment found", body = FeePayment),
        (status = 404, description = "Fee payment not found", body = crate::models::MessageResponse)
    ),
    tag = "FeePayment",
    security(("bearer_auth" = []))
)]
pub async fn get_fee_payment(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let mut conn = pool.acquire().await?;
    let payment = fetch_payment(&mut conn, path.into_inner(), false).await?;
    Ok(HttpResponse::Ok().json(payment))
}

/// Update Payment. The row's snapshot becomes the balance after the other
/// payments of the student plus this row's new amount; other rows keep
/// theirs.
#[utoipa::path(
    put,
    path = "/api/fee-payments/{payment_id}",
    params(("payment_id" = u64, Path, description = "Fee payment ID")),
    request_body = UpdateFeePayment,
    responses(
        (status = 200, description = "Payment updated", body = FeePayment),
        (status = 400, description = "Non-positive amount or no fee structure for the student's class", body = crate::models::MessageResponse),
        (status = 404, description = "Fee payment not found", body = crate::models::MessageResponse)
    ),
    tag = "FeePayment",
    security(("bearer_auth" = []))
)]
pub async fn update_fee_payment(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateFeePayment>,
) -> Result<HttpResponse, ApiError> {
    let payment_id = path.into_inner();
    if let Some(amount) = payload.amount {
        check_amount(amount)?;
    }

    let mut tx = pool.begin().await?;

    let current = fetch_payment(&mut tx, payment_id, true).await?;
    let amount = payload.amount.unwrap_or(current.amount);

    let account = account_of(&mut tx, current.student_id).await?;
    let balance = fees::balance_after(&mut tx, &account, amount, Some(payment_id)).await?;

    sqlx::query(
        r#"
        UPDATE fee_payments
        SET amount = ?, payment_date = ?, term = ?, year = ?, method = ?, balance = ?
        WHERE id = ?
        "#,
    )
    .bind(amount)
    .bind(payload.payment_date.unwrap_or(current.payment_date))
    .bind(payload.term.as_deref().unwrap_or(&current.term))
    .bind(payload.year.unwrap_or(current.year))
    .bind(payload.method.as_deref().unwrap_or(&current.method))
    .bind(balance)
    .bind(payment_id)
    .execute(&mut *tx)
    .await?;

    let payment = fetch_payment(&mut tx, payment_id, false).await?;
    tx.commit().await?;

    info!(payment_id, amount, balance, "Fee payment updated");
    Ok(HttpResponse::Ok().json(payment))
}

/// Delete Payment and report what the student owes without it
#[utoipa::path(
    delete,
    path = "/api/fee-payments/{payment_id}",
    params(("payment_id" = u64, Path, description = "Fee payment ID")),
    responses(
        (status = 200, description = "Payment deleted", body = PaymentDeleted),
        (status = 400, description = "No fee structure for the student's class; nothing deleted", body = crate::models::MessageResponse),
        (status = 404, description = "Fee payment not found", body = crate::models::MessageResponse)
    ),
    tag = "FeePayment",
    security(("bearer_auth" = []))
)]
pub async fn delete_fee_payment(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let payment_id = path.into_inner();

    let mut tx = pool.begin().await?;

    let payment = fetch_payment(&mut tx, payment_id, true).await?;

    sqlx::query("DELETE FROM fee_payments WHERE id = ?")
        .bind(payment_id)
        .execute(&mut *tx)
        .await?;

    let account = account_of(&mut tx, payment.student_id).await?;
    let grand_total = fees::grand_total(&mut tx, &account).await.map_err(|e| {
        error!(payment_id, student_id = payment.student_id, error = %e, "Balance unavailable, delete rolled back");
        e
    })?;
    let paid = fees::total_paid(&mut tx, payment.student_id, None).await?;
    let balance = compute_balance(grand_total, paid, 0.0);

    tx.commit().await?;

    info!(payment_id, student_id = payment.student_id, balance, "Fee payment deleted");
    Ok(HttpResponse::Ok().json(PaymentDeleted {
        message: "Fee payment deleted successfully".to_string(),
        balance,
    }))
}
