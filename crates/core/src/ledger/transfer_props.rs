//! Property-based tests for the transfer engine.
//!
//! Runs random transfer sequences against the in-memory store.

use std::sync::Arc;

use bankcore_shared::types::{AccountId, BranchId, Currency, CustomerId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::transfer::TransferService;
use super::types::NewAccount;
use crate::error::LedgerError;
use crate::store::InMemoryStore;

const ACCOUNTS: usize = 3;

/// Strategy to generate transfer amounts (0.01 to 500.00).
fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..50_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a transfer between two distinct account slots.
fn transfer() -> impl Strategy<Value = (usize, usize, Decimal)> {
    (0..ACCOUNTS, 1..ACCOUNTS, amount())
        .prop_map(|(from, offset, amount)| (from, (from + offset) % ACCOUNTS, amount))
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

async fn setup(initial: &[Decimal]) -> (TransferService<InMemoryStore>, Vec<AccountId>) {
    let service = TransferService::new(Arc::new(InMemoryStore::new()));
    let mut ids = Vec::with_capacity(initial.len());
    for (i, funding) in initial.iter().enumerate() {
        let account = service
            .create_account(NewAccount {
                customer_id: CustomerId::new(1),
                branch_id: BranchId::new(1),
                owner: format!("holder-{i}"),
                currency: Currency::Inr,
            })
            .await
            .unwrap();
        if *funding > Decimal::ZERO {
            service.deposit(account.id, *funding).await.unwrap();
        }
        ids.push(account.id);
    }
    (service, ids)
}

async fn total(service: &TransferService<InMemoryStore>, ids: &[AccountId]) -> Decimal {
    let mut sum = Decimal::ZERO;
    for id in ids {
        sum += service.get_account(*id).await.unwrap().balance;
    }
    sum
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// The sum of all balances never changes, no balance goes negative, and
    /// the only way a well-formed transfer fails is insufficient funds.
    #[test]
    fn prop_transfers_conserve_value(
        initial in prop::collection::vec(0i64..100_000i64, ACCOUNTS),
        transfers in prop::collection::vec(transfer(), 1..30),
    ) {
        let initial: Vec<Decimal> = initial.into_iter().map(|c| Decimal::new(c, 2)).collect();
        let expected_total: Decimal = initial.iter().copied().sum();

        runtime().block_on(async {
            let (service, ids) = setup(&initial).await;

            for (from, to, amount) in transfers {
                let before = service.get_account(ids[from]).await.unwrap().balance;
                match service.transfer(ids[from], ids[to], amount).await {
                    Ok(entry) => prop_assert_eq!(entry.amount, amount),
                    Err(LedgerError::InsufficientFunds { .. }) => prop_assert!(before < amount),
                    Err(other) => prop_assert!(false, "unexpected error: {}", other),
                }

                prop_assert_eq!(total(&service, &ids).await, expected_total);
                for id in &ids {
                    prop_assert!(service.get_account(*id).await.unwrap().balance >= Decimal::ZERO);
                }
            }
            Ok(())
        })?;
    }
}
