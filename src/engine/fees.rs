use derive_more::Display;
use serde::{Deserialize, Serialize};
use sqlx::MySqlConnection;
use tracing::debug;
use utoipa::ToSchema;

use crate::error::ApiError;

#[derive(Debug, Display, PartialEq, Eq)]
pub enum FeeError {
    #[display(fmt = "Fee structure not found for the student's class.")]
    NoFeeStructure { class_id: u64 },
}

impl std::error::Error for FeeError {}

/// The six charges that make up a class fee schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct FeeComponents {
    #[schema(example = 6000.0)]
    pub tuition_fee: f64,
    #[schema(example = 1500.0)]
    pub books_fee: f64,
    #[schema(example = 500.0)]
    pub miscellaneous_fee: f64,
    #[schema(example = 1000.0)]
    pub boarding_fee: f64,
    #[schema(example = 500.0)]
    pub prize_giving_fee: f64,
    #[schema(example = 500.0)]
    pub exam_fee: f64,
}

impl FeeComponents {
    pub fn total(&self) -> f64 {
        compute_total_fee(self)
    }
}

/// Request-side components; absent charges count as zero on create and keep
/// their stored value on update.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct FeeComponentsInput {
    pub tuition_fee: Option<f64>,
    pub books_fee: Option<f64>,
    pub miscellaneous_fee: Option<f64>,
    pub boarding_fee: Option<f64>,
    pub prize_giving_fee: Option<f64>,
    pub exam_fee: Option<f64>,
}

impl FeeComponentsInput {
    pub fn apply_to(&self, base: FeeComponents) -> FeeComponents {
        FeeComponents {
            tuition_fee: self.tuition_fee.unwrap_or(base.tuition_fee),
            books_fee: self.books_fee.unwrap_or(base.books_fee),
            miscellaneous_fee: self.miscellaneous_fee.unwrap_or(base.miscellaneous_fee),
            boarding_fee: self.boarding_fee.unwrap_or(base.boarding_fee),
            prize_giving_fee: self.prize_giving_fee.unwrap_or(base.prize_giving_fee),
            exam_fee: self.exam_fee.unwrap_or(base.exam_fee),
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        let values = [
            ("tuition_fee", self.tuition_fee),
            ("books_fee", self.books_fee),
            ("miscellaneous_fee", self.miscellaneous_fee),
            ("boarding_fee", self.boarding_fee),
            ("prize_giving_fee", self.prize_giving_fee),
            ("exam_fee", self.exam_fee),
        ];

        for (name, value) in values {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(ApiError::bad_request(format!(
                        "{name} must be a non-negative number"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl From<&FeeComponentsInput> for FeeComponents {
    fn from(input: &FeeComponentsInput) -> Self {
        input.apply_to(FeeComponents::default())
    }
}

pub fn compute_total_fee(components: &FeeComponents) -> f64 {
    [
        components.tuition_fee,
        components.books_fee,
        components.miscellaneous_fee,
        components.boarding_fee,
        components.prize_giving_fee,
        components.exam_fee,
    ]
    .iter()
    .sum()
}

/// What a student owes in total: their class schedule plus any transport
/// surcharge. A class without a schedule is an error, never zero.
pub fn compute_grand_total(
    class_id: u64,
    structure: Option<&FeeComponents>,
    transport_fee: Option<f64>,
) -> Result<f64, FeeError> {
    let structure = structure.ok_or(FeeError::NoFeeStructure { class_id })?;
    Ok(structure.total() + transport_fee.unwrap_or(0.0))
}

pub fn compute_balance(grand_total: f64, paid_so_far: f64, new_payment_amount: f64) -> f64 {
    grand_total - (paid_so_far + new_payment_amount)
}

/// The fields of a student the ledger needs.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StudentAccount {
    pub student_id: u64,
    pub class_id: u64,
    pub pickup_location_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FeeStatement {
    #[schema(example = 1)]
    pub student_id: u64,
    #[schema(example = 10500.0)]
    pub grand_total: f64,
    #[schema(example = 6000.0)]
    pub total_paid: f64,
    #[schema(example = 4500.0)]
    pub balance: f64,
}

pub async fn load_account(
    conn: &mut MySqlConnection,
    student_id: u64,
) -> Result<Option<StudentAccount>, sqlx::Error> {
    sqlx::query_as::<_, StudentAccount>(
        "SELECT id AS student_id, class_id, pickup_location_id FROM students WHERE id = ?",
    )
    .bind(student_id)
    .fetch_optional(conn)
    .await
}

pub async fn grand_total(
    conn: &mut MySqlConnection,
    account: &StudentAccount,
) -> Result<f64, ApiError> {
    let structure = sqlx::query_as::<_, FeeComponents>(
        r#"
        SELECT tuition_fee, books_fee, miscellaneous_fee, boarding_fee, prize_giving_fee, exam_fee
        FROM fee_structures
        WHERE class_id = ?
        "#,
    )
    .bind(account.class_id)
    .fetch_optional(&mut *conn)
    .await?;

    let transport_fee = match account.pickup_location_id {
        Some(location_id) => {
            sqlx::query_scalar::<_, f64>("SELECT transport_fee FROM pickup_locations WHERE id = ?")
                .bind(location_id)
                .fetch_optional(&mut *conn)
                .await?
        }
        None => None,
    };

    let total = compute_grand_total(account.class_id, structure.as_ref(), transport_fee)?;
    debug!(student_id = account.student_id, total, "Computed grand total");
    Ok(total)
}

/// Sum of a student's recorded payments, optionally leaving one row out.
pub async fn total_paid(
    conn: &mut MySqlConnection,
    student_id: u64,
    excluding_payment: Option<u64>,
) -> Result<f64, sqlx::Error> {
    sqlx::query_scalar::<_, f64>(
        r#"
        SELECT COALESCE(SUM(amount), 0)
        FROM fee_payments
        WHERE student_id = ? AND (? IS NULL OR id <> ?)
        "#,
    )
    .bind(student_id)
    .bind(excluding_payment)
    .bind(excluding_payment)
    .fetch_one(conn)
    .await
}

/// Balance after `new_payment_amount`, counting every other payment of the
/// student. `excluding_payment` is the row being rewritten, if any.
pub async fn balance_after(
    conn: &mut MySqlConnection,
    account: &StudentAccount,
    new_payment_amount: f64,
    excluding_payment: Option<u64>,
) -> Result<f64, ApiError> {
    let grand_total = grand_total(&mut *conn, account).await?;
    let paid = total_paid(&mut *conn, account.student_id, excluding_payment).await?;
    Ok(compute_balance(grand_total, paid, new_payment_amount))
}

pub async fn statement(
    conn: &mut MySqlConnection,
    account: &StudentAccount,
) -> Result<FeeStatement, ApiError> {
    let grand_total = grand_total(&mut *conn, account).await?;
    let total_paid = total_paid(&mut *conn, account.student_id, None).await?;

    Ok(FeeStatement {
        student_id: account.student_id,
        grand_total,
        total_paid,
        balance: compute_balance(grand_total, total_paid, 0.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule() -> FeeComponents {
        FeeComponents {
            tuition_fee: 6000.0,
            books_fee: 1500.0,
            miscellaneous_fee: 500.0,
            boarding_fee: 1000.0,
            prize_giving_fee: 500.0,
            exam_fee: 500.0,
        }
    }

    #[test]
    fn empty_schedule_totals_zero() {
        assert_eq!(compute_total_fee(&FeeComponents::default()), 0.0);
        let from_empty_input = FeeComponents::from(&FeeComponentsInput::default());
        assert_eq!(from_empty_input.total(), 0.0);
    }

    #[test]
    fn total_is_sum_of_components() {
        assert_eq!(schedule().total(), 10_000.0);
    }

    #[test]
    fn missing_components_count_as_zero() {
        let input = FeeComponentsInput {
            tuition_fee: Some(4000.0),
            exam_fee: Some(250.0),
            ..Default::default()
        };
        assert_eq!(FeeComponents::from(&input).total(), 4250.0);
    }

    #[test]
    fn partial_input_keeps_stored_components() {
        let input = FeeComponentsInput {
            books_fee: Some(2500.0),
            ..Default::default()
        };
        let updated = input.apply_to(schedule());
        assert_eq!(updated.tuition_fee, 6000.0);
        assert_eq!(updated.books_fee, 2500.0);
        assert_eq!(updated.total(), 11_000.0);
    }

    #[test]
    fn negative_components_are_rejected() {
        let input = FeeComponentsInput {
            boarding_fee: Some(-1.0),
            ..Default::default()
        };
        assert!(input.validate().is_err());
        assert!(FeeComponentsInput::default().validate().is_ok());
    }

    #[test]
    fn grand_total_without_transport() {
        let s = schedule();
        assert_eq!(compute_grand_total(3, Some(&s), None), Ok(10_000.0));
    }

    #[test]
    fn grand_total_adds_transport_fee() {
        let s = schedule();
        assert_eq!(compute_grand_total(3, Some(&s), Some(500.0)), Ok(10_500.0));
    }

    #[test]
    fn grand_total_requires_a_schedule() {
        assert_eq!(
            compute_grand_total(3, None, Some(500.0)),
            Err(FeeError::NoFeeStructure { class_id: 3 })
        );
    }

    #[test]
    fn balance_without_payments_is_grand_total() {
        assert_eq!(compute_balance(10_000.0, 0.0, 0.0), 10_000.0);
    }

    #[test]
    fn balance_snapshots_follow_payment_sequence() {
        let grand_total = schedule().total();
        let first = compute_balance(grand_total, 0.0, 3000.0);
        assert_eq!(first, 7000.0);

        let second = compute_balance(grand_total, 3000.0, 3000.0);
        assert_eq!(second, 4000.0);
    }

    #[test]
    fn rewriting_a_payment_excludes_its_old_amount() {
        // Two payments of 3000; the second is corrected to 2000.
        let grand_total = schedule().total();
        let others = 3000.0;
        assert_eq!(compute_balance(grand_total, others, 2000.0), 5000.0);
    }
}
