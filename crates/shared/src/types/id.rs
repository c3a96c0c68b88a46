//! Typed IDs for type-safe entity references.
//!
//! Every record is keyed by a store-assigned 64-bit integer. Wrapping it per
//! entity prevents passing a `LoanId` where a `LoanPaymentId` is expected.

use serde::{Deserialize, Serialize};

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Creates an ID from a raw store key.
            #[must_use]
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Returns the raw store key.
            #[must_use]
            pub const fn into_inner(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.trim().parse()?))
            }
        }
    };
}

typed_id!(CustomerId, "Identifier of the customer owning accounts and loans.");
typed_id!(BranchId, "Identifier of the branch an account or loan is booked at.");
typed_id!(AccountId, "Unique identifier for a deposit account.");
typed_id!(TransactionId, "Unique identifier for a ledger transaction.");
typed_id!(LoanId, "Unique identifier for a loan.");
typed_id!(LoanPaymentId, "Unique identifier for a scheduled loan installment.");
typed_id!(BeneficiaryId, "Identifier of an external transfer beneficiary.");
