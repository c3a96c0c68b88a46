//! Loan lifecycle: origination, schedule queries and installment payments.

use std::sync::Arc;

use bankcore_shared::types::{CustomerId, LoanId, LoanPaymentId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;

use super::amortization::build_schedule;
use super::types::{
    CreateLoanInput, Loan, LoanPayment, LoanStatus, LoanWithSchedule, NewLoan, NewLoanPayment,
    PaymentReceipt, PaymentStatus,
};
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::types::NewTransaction;
use crate::store::{self, LedgerStore, LoanPaymentStore, LoanStore, LockMode, UnitOfWork};

/// Fractional digits kept by stored amounts and rates.
pub const STORED_SCALE: u32 = 4;

/// Originates loans and takes installment payments.
pub struct LoanService<S: LedgerStore> {
    store: Arc<S>,
    rounding_scale: u32,
}

impl<S: LedgerStore> LoanService<S> {
    /// Create a new loan service.
    ///
    /// `rounding_scale` is the number of decimal places installments are
    /// rounded to.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if `rounding_scale` exceeds [`STORED_SCALE`].
    pub fn new(store: Arc<S>, rounding_scale: u32) -> LedgerResult<Self> {
        if rounding_scale > STORED_SCALE {
            return Err(LedgerError::invalid_request(format!(
                "rounding scale {rounding_scale} exceeds the stored scale of {STORED_SCALE}"
            )));
        }
        Ok(Self {
            store,
            rounding_scale,
        })
    }

    /// Approve a loan and persist it with its full payment schedule.
    ///
    /// The loan starts now. Installment `k` is due `k` calendar months later.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if:
    /// - Principal is not positive or is finer than the rounding scale
    /// - Rate is negative or has more than [`STORED_SCALE`] decimal places
    /// - Term is not positive
    /// - The installment rounds to zero
    ///
    /// Any store error rolls back the loan and every installment.
    pub async fn create_loan(&self, input: CreateLoanInput) -> LedgerResult<LoanWithSchedule> {
        if input.principal <= Decimal::ZERO {
            return Err(LedgerError::invalid_request("principal must be positive"));
        }
        if input.principal.normalize().scale() > self.rounding_scale {
            return Err(LedgerError::invalid_request(format!(
                "principal allows at most {} decimal places",
                self.rounding_scale
            )));
        }
        if input.annual_rate < Decimal::ZERO {
            return Err(LedgerError::invalid_request("rate must not be negative"));
        }
        if input.annual_rate.normalize().scale() > STORED_SCALE {
            return Err(LedgerError::invalid_request(format!(
                "rate allows at most {STORED_SCALE} decimal places"
            )));
        }
        let term_months = u32::try_from(input.term_months)
            .ok()
            .filter(|&term| term > 0)
            .ok_or_else(|| LedgerError::invalid_request("term must be at least one month"))?;

        let start_date = Utc::now();
        let schedule = build_schedule(
            input.principal,
            input.annual_rate,
            term_months,
            start_date,
            self.rounding_scale,
        )?;

        let new_loan = NewLoan {
            customer_id: input.customer_id,
            branch_id: input.branch_id,
            principal: input.principal,
            annual_rate: input.annual_rate,
            term_months,
            installment: schedule.installment,
            total_payable: schedule.total_payable,
            start_date,
            end_date: schedule.end_date,
        };

        let mut unit = self.store.begin().await?;
        let result = create_in(&mut unit, new_loan, &schedule.due_dates).await;
        let created = store::finish(unit, result).await?;

        info!(
            loan_id = %created.loan.id,
            customer_id = %created.loan.customer_id,
            principal = %created.loan.principal,
            installment = %created.loan.installment,
            term_months,
            "Loan approved"
        );
        Ok(created)
    }

    /// List a customer's loans in the order they were created.
    ///
    /// # Errors
    ///
    /// Returns a store error if the read fails.
    pub async fn list_loans(&self, customer_id: CustomerId) -> LedgerResult<Vec<Loan>> {
        let mut unit = self.store.begin_read().await?;
        let result = unit
            .list_loans_by_customer(customer_id)
            .await
            .map_err(LedgerError::from);
        store::finish(unit, result).await
    }

    /// Fetch a loan with its payment schedule.
    ///
    /// # Errors
    ///
    /// Returns `LoanNotFound` if the loan does not exist.
    pub async fn get_loan(&self, loan_id: LoanId) -> LedgerResult<LoanWithSchedule> {
        let mut unit = self.store.begin_read().await?;
        let result = async {
            let loan = find_loan(&mut unit, loan_id, LockMode::Plain).await?;
            let payments = unit.list_payments_by_loan(loan_id).await?;
            Ok::<_, LedgerError>(LoanWithSchedule { loan, payments })
        }
        .await;
        store::finish(unit, result).await
    }

    /// List a loan's installments ordered by due date.
    ///
    /// # Errors
    ///
    /// Returns `LoanNotFound` if the loan does not exist.
    pub async fn list_payments(&self, loan_id: LoanId) -> LedgerResult<Vec<LoanPayment>> {
        let mut unit = self.store.begin_read().await?;
        let result = async {
            find_loan(&mut unit, loan_id, LockMode::Plain).await?;
            Ok::<_, LedgerError>(unit.list_payments_by_loan(loan_id).await?)
        }
        .await;
        store::finish(unit, result).await
    }

    /// Pay one installment of a loan.
    ///
    /// The payment is marked paid, a loan-payment ledger entry is appended,
    /// and the loan is closed once every installment is paid, all in one unit.
    /// The loan row is locked before the payment row, so concurrent payments
    /// against the same loan are serialized and exactly one of them closes it.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Payment does not exist (`PaymentNotFound`)
    /// - Payment belongs to another loan (`PaymentLoanMismatch`)
    /// - Loan does not exist (`LoanNotFound`)
    /// - Loan is already paid off (`LoanAlreadyClosed`)
    /// - Payment is already paid (`PaymentAlreadyPaid`)
    pub async fn make_payment(
        &self,
        payment_id: LoanPaymentId,
        loan_id: LoanId,
    ) -> LedgerResult<PaymentReceipt> {
        let mut unit = self.store.begin().await?;
        let result = pay_in(&mut unit, payment_id, loan_id).await;
        let receipt = store::finish(unit, result).await?;

        info!(
            loan_id = %loan_id,
            payment_id = %payment_id,
            amount = %receipt.payment.amount,
            loan_status = %receipt.loan.status,
            "Installment paid"
        );
        Ok(receipt)
    }
}

async fn find_loan<U: UnitOfWork>(
    unit: &mut U,
    loan_id: LoanId,
    lock: LockMode,
) -> LedgerResult<Loan> {
    unit.get_loan(loan_id, lock)
        .await?
        .ok_or(LedgerError::LoanNotFound(loan_id))
}

async fn find_payment<U: UnitOfWork>(
    unit: &mut U,
    payment_id: LoanPaymentId,
    lock: LockMode,
) -> LedgerResult<LoanPayment> {
    unit.get_payment(payment_id, lock)
        .await?
        .ok_or(LedgerError::PaymentNotFound(payment_id))
}

async fn create_in<U: UnitOfWork>(
    unit: &mut U,
    new_loan: NewLoan,
    due_dates: &[DateTime<Utc>],
) -> LedgerResult<LoanWithSchedule> {
    let loan = unit.create_loan(new_loan).await?;

    let mut payments = Vec::with_capacity(due_dates.len());
    for (installment_number, due_date) in (1..).zip(due_dates) {
        let payment = unit
            .create_payment(NewLoanPayment {
                loan_id: loan.id,
                installment_number,
                amount: loan.installment,
                due_date: *due_date,
            })
            .await?;
        payments.push(payment);
    }
    Ok(LoanWithSchedule { loan, payments })
}

async fn pay_in<U: UnitOfWork>(
    unit: &mut U,
    payment_id: LoanPaymentId,
    loan_id: LoanId,
) -> LedgerResult<PaymentReceipt> {
    let payment = find_payment(unit, payment_id, LockMode::Plain).await?;
    if payment.loan_id != loan_id {
        return Err(LedgerError::PaymentLoanMismatch {
            payment_id,
            requested: loan_id,
            actual: payment.loan_id,
        });
    }

    let mut loan = find_loan(unit, loan_id, LockMode::ForUpdate).await?;
    if !loan.status.accepts_payments() {
        return Err(LedgerError::LoanAlreadyClosed(loan_id));
    }

    let mut payment = find_payment(unit, payment_id, LockMode::ForUpdate).await?;
    if payment.is_paid() {
        return Err(LedgerError::PaymentAlreadyPaid(payment_id));
    }

    let paid_date = Utc::now();
    unit.update_payment_status(payment_id, PaymentStatus::Paid, Some(paid_date))
        .await?;
    payment.status = PaymentStatus::Paid;
    payment.paid_date = Some(paid_date);

    let transaction = unit
        .create_transaction(NewTransaction::loan_payment(payment_id, payment.amount))
        .await?;

    let paid = unit.count_paid_by_loan(loan_id).await?;
    if paid >= loan.term_months {
        unit.update_loan_status(loan_id, LoanStatus::PaidOff).await?;
        loan.status = LoanStatus::PaidOff;
    }

    Ok(PaymentReceipt {
        payment,
        loan,
        transaction,
    })
}
