//! Account and ledger-entry domain types.

use bankcore_shared::types::{
    AccountId, BeneficiaryId, BranchId, Currency, CustomerId, LoanPaymentId, TransactionId,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// A customer deposit account.
///
/// The balance is only ever changed through [`Account::debit`] and
/// [`Account::credit`] inside a unit of work, and never drops below zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account ID.
    pub id: AccountId,
    /// Owning customer.
    pub customer_id: CustomerId,
    /// Branch the account is booked at.
    pub branch_id: BranchId,
    /// Display name of the account holder.
    pub owner: String,
    /// Current balance.
    pub balance: Decimal,
    /// Account currency.
    pub currency: Currency,
    /// When the account was opened.
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Returns the balance after debiting `amount`.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientFunds` if the balance does not cover the amount.
    pub fn debit(&self, amount: Decimal) -> Result<Decimal, LedgerError> {
        if self.balance < amount {
            return Err(LedgerError::InsufficientFunds {
                account_id: self.id,
                balance: self.balance,
                requested: amount,
            });
        }
        Ok(self.balance - amount)
    }

    /// Returns the balance after crediting `amount`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` if the new balance would overflow.
    pub fn credit(&self, amount: Decimal) -> Result<Decimal, LedgerError> {
        self.balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::invalid_amount(amount, "balance overflow"))
    }

    /// Checks that `amount` is positive and fits the account currency.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` otherwise.
    pub fn check_amount(&self, amount: Decimal) -> Result<(), LedgerError> {
        ensure_positive(amount)?;
        if !self.currency.accepts(amount) {
            return Err(LedgerError::invalid_amount(
                amount,
                format!(
                    "{} allows at most {} decimal places",
                    self.currency,
                    self.currency.minor_units()
                ),
            ));
        }
        Ok(())
    }
}

/// Rejects zero and negative amounts.
pub(crate) fn ensure_positive(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::invalid_amount(amount, "must be positive"));
    }
    Ok(())
}

/// Input for opening an account. New accounts start with a zero balance.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Owning customer.
    pub customer_id: CustomerId,
    /// Branch the account is booked at.
    pub branch_id: BranchId,
    /// Display name of the account holder.
    pub owner: String,
    /// Account currency.
    pub currency: Currency,
}

/// What a ledger entry records. Exactly one kind applies per entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransactionKind {
    /// Value moved between two accounts.
    Transfer {
        /// Debited account.
        from: AccountId,
        /// Credited account.
        to: AccountId,
    },
    /// External value credited to an account.
    Deposit {
        /// Credited account.
        to: AccountId,
    },
    /// An installment of a loan was paid.
    LoanPayment {
        /// The paid installment.
        payment: LoanPaymentId,
    },
}

impl TransactionKind {
    /// Rebuilds the kind from the nullable reference columns of a stored entry.
    ///
    /// Returns `None` when the combination matches no kind.
    #[must_use]
    pub fn from_parts(
        from: Option<AccountId>,
        to: Option<AccountId>,
        payment: Option<LoanPaymentId>,
    ) -> Option<Self> {
        match (from, to, payment) {
            (Some(from), Some(to), None) => Some(Self::Transfer { from, to }),
            (None, Some(to), None) => Some(Self::Deposit { to }),
            (None, None, Some(payment)) => Some(Self::LoanPayment { payment }),
            _ => None,
        }
    }

    /// Debited account, if any.
    #[must_use]
    pub fn source(&self) -> Option<AccountId> {
        match self {
            Self::Transfer { from, .. } => Some(*from),
            Self::Deposit { .. } | Self::LoanPayment { .. } => None,
        }
    }

    /// Credited account, if any.
    #[must_use]
    pub fn destination(&self) -> Option<AccountId> {
        match self {
            Self::Transfer { to, .. } | Self::Deposit { to } => Some(*to),
            Self::LoanPayment { .. } => None,
        }
    }

    /// Paid installment, if any.
    #[must_use]
    pub fn loan_payment(&self) -> Option<LoanPaymentId> {
        match self {
            Self::LoanPayment { payment } => Some(*payment),
            Self::Transfer { .. } | Self::Deposit { .. } => None,
        }
    }

    /// Returns true if the entry debits or credits `account_id`.
    #[must_use]
    pub fn touches(&self, account_id: AccountId) -> bool {
        self.source() == Some(account_id) || self.destination() == Some(account_id)
    }
}

/// An immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction ID.
    pub id: TransactionId,
    /// What the entry records.
    #[serde(flatten)]
    pub kind: TransactionKind,
    /// External beneficiary, if the movement was addressed to one.
    pub beneficiary_id: Option<BeneficiaryId>,
    /// Amount moved. Always positive.
    pub amount: Decimal,
    /// When the entry was appended.
    pub created_at: DateTime<Utc>,
}

/// Input for appending a ledger entry.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    /// What the entry records.
    pub kind: TransactionKind,
    /// External beneficiary, if any.
    pub beneficiary_id: Option<BeneficiaryId>,
    /// Amount moved.
    pub amount: Decimal,
}

impl NewTransaction {
    /// A transfer entry between two accounts.
    #[must_use]
    pub fn transfer(from: AccountId, to: AccountId, amount: Decimal) -> Self {
        Self {
            kind: TransactionKind::Transfer { from, to },
            beneficiary_id: None,
            amount,
        }
    }

    /// A deposit entry into one account.
    #[must_use]
    pub fn deposit(to: AccountId, amount: Decimal) -> Self {
        Self {
            kind: TransactionKind::Deposit { to },
            beneficiary_id: None,
            amount,
        }
    }

    /// A loan repayment entry.
    #[must_use]
    pub fn loan_payment(payment: LoanPaymentId, amount: Decimal) -> Self {
        Self {
            kind: TransactionKind::LoanPayment { payment },
            beneficiary_id: None,
            amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn account(balance: Decimal, currency: Currency) -> Account {
        Account {
            id: AccountId::new(1),
            customer_id: CustomerId::new(1),
            branch_id: BranchId::new(1),
            owner: "Asha".to_string(),
            balance,
            currency,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_debit_within_balance() {
        assert_eq!(account(dec!(100), Currency::Usd).debit(dec!(40)).unwrap(), dec!(60));
        assert_eq!(account(dec!(40), Currency::Usd).debit(dec!(40)).unwrap(), dec!(0));
    }

    #[test]
    fn test_debit_beyond_balance_rejected() {
        let err = account(dec!(40), Currency::Usd).debit(dec!(50)).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                account_id: AccountId::new(1),
                balance: dec!(40),
                requested: dec!(50),
            }
        );
    }

    #[test]
    fn test_credit_overflow_rejected() {
        let err = account(Decimal::MAX, Currency::Usd).credit(dec!(1)).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount { .. }));
    }

    #[rstest]
    #[case(dec!(0))]
    #[case(dec!(-5))]
    #[case(dec!(1.005))]
    fn test_check_amount_rejects(#[case] amount: Decimal) {
        let err = account(dec!(0), Currency::Usd).check_amount(amount).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount { .. }));
    }

    #[test]
    fn test_check_amount_respects_currency_scale() {
        assert!(account(dec!(0), Currency::Usd).check_amount(dec!(0.01)).is_ok());
        assert!(account(dec!(0), Currency::Jpy).check_amount(dec!(0.5)).is_err());
        assert!(account(dec!(0), Currency::Jpy).check_amount(dec!(500)).is_ok());
    }

    #[test]
    fn test_kind_from_parts() {
        let a = AccountId::new(1);
        let b = AccountId::new(2);
        let p = LoanPaymentId::new(9);
        assert_eq!(
            TransactionKind::from_parts(Some(a), Some(b), None),
            Some(TransactionKind::Transfer { from: a, to: b })
        );
        assert_eq!(
            TransactionKind::from_parts(None, Some(b), None),
            Some(TransactionKind::Deposit { to: b })
        );
        assert_eq!(
            TransactionKind::from_parts(None, None, Some(p)),
            Some(TransactionKind::LoanPayment { payment: p })
        );
        assert_eq!(TransactionKind::from_parts(Some(a), None, None), None);
        assert_eq!(TransactionKind::from_parts(None, Some(b), Some(p)), None);
        assert_eq!(TransactionKind::from_parts(None, None, None), None);
    }

    #[test]
    fn test_kind_accessors() {
        let a = AccountId::new(1);
        let b = AccountId::new(2);
        let transfer = TransactionKind::Transfer { from: a, to: b };
        assert_eq!(transfer.source(), Some(a));
        assert_eq!(transfer.destination(), Some(b));
        assert!(transfer.touches(a) && transfer.touches(b));
        assert!(!transfer.touches(AccountId::new(3)));

        let deposit = TransactionKind::Deposit { to: b };
        assert_eq!(deposit.source(), None);
        assert!(deposit.touches(b));

        let repayment = TransactionKind::LoanPayment {
            payment: LoanPaymentId::new(4),
        };
        assert_eq!(repayment.loan_payment(), Some(LoanPaymentId::new(4)));
        assert!(!repayment.touches(a));
    }
}
