use std::collections::HashMap;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::Date;

use crate::store::JsonStore;

pub const TRANSACTIONS: &str = "transactions";
pub const BUDGETS: &str = "budgets";

pub static DAY_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

time::serde::format_description!(day_format, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: f64,
    pub category: String,
    pub description: String,
    #[serde(with = "day_format")]
    pub date: Date,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: u64,
    pub category: String,
    pub limit: f64,
    pub month: String,
}

pub trait LedgerEntry {
    fn id(&self) -> u64;
}

impl LedgerEntry for Transaction {
    fn id(&self) -> u64 {
        self.id
    }
}

impl LedgerEntry for Budget {
    fn id(&self) -> u64 {
        self.id
    }
}

/// Per-user envelope. The counter only moves forward, so an id is never
/// handed out twice even after deletions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ledger<T> {
    pub next_id: u64,
    pub entries: Vec<T>,
}

impl<T> Default for Ledger<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            entries: Vec::new(),
        }
    }
}

pub async fn entries<T>(store: &JsonStore, collection: &str, email: &str) -> Vec<T>
where
    T: DeserializeOwned,
{
    let mut all: HashMap<String, Ledger<T>> = store.load(collection).await;
    all.remove(email).map(|l| l.entries).unwrap_or_default()
}

/// Appends one entry, assigning the next id under the collection guard.
pub async fn append<T, F>(
    store: &JsonStore,
    collection: &str,
    email: &str,
    make: F,
) -> anyhow::Result<T>
where
    T: Serialize + DeserializeOwned + Clone,
    F: FnOnce(u64) -> T,
{
    let _guard = store.guard(collection).await;
    let mut all: HashMap<String, Ledger<T>> = store.load(collection).await;
    let ledger = all.entry(email.to_string()).or_default();
    let entry = make(ledger.next_id);
    ledger.next_id += 1;
    ledger.entries.push(entry.clone());
    store.save(collection, &all).await?;
    Ok(entry)
}

/// Appends a budget unless one already targets the same (category, month).
/// Returns `None` for a duplicate; the check and the insert share one guard.
pub async fn append_budget(
    store: &JsonStore,
    email: &str,
    category: &str,
    limit: f64,
    month: &str,
) -> anyhow::Result<Option<Budget>> {
    let _guard = store.guard(BUDGETS).await;
    let mut all: HashMap<String, Ledger<Budget>> = store.load(BUDGETS).await;
    let ledger = all.entry(email.to_string()).or_default();
    if ledger
        .entries
        .iter()
        .any(|b| b.category == category && b.month == month)
    {
        return Ok(None);
    }
    let budget = Budget {
        id: ledger.next_id,
        category: category.to_string(),
        limit,
        month: month.to_string(),
    };
    ledger.next_id += 1;
    ledger.entries.push(budget.clone());
    store.save(BUDGETS, &all).await?;
    Ok(Some(budget))
}

/// Removes the entry with the given id. Persists only when something was
/// actually removed; returns whether it was.
pub async fn remove<T>(
    store: &JsonStore,
    collection: &str,
    email: &str,
    id: u64,
) -> anyhow::Result<bool>
where
    T: Serialize + DeserializeOwned + LedgerEntry,
{
    let _guard = store.guard(collection).await;
    let mut all: HashMap<String, Ledger<T>> = store.load(collection).await;
    let Some(ledger) = all.get_mut(email) else {
        return Ok(false);
    };
    let before = ledger.entries.len();
    ledger.entries.retain(|e| e.id() != id);
    if ledger.entries.len() == before {
        return Ok(false);
    }
    store.save(collection, &all).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn transaction(amount: f64) -> impl FnOnce(u64) -> Transaction {
        move |id| Transaction {
            id,
            kind: TransactionKind::Expense,
            amount,
            category: "food".into(),
            description: String::new(),
            date: date!(2026 - 08 - 05),
        }
    }

    async fn store() -> (tempfile::TempDir, JsonStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        store.init().await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn ids_are_sequential_from_one() {
        let (_dir, store) = store().await;
        let a = append(&store, TRANSACTIONS, "a@example.com", transaction(10.0))
            .await
            .unwrap();
        let b = append(&store, TRANSACTIONS, "a@example.com", transaction(20.0))
            .await
            .unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
    }

    #[tokio::test]
    async fn ids_are_scoped_per_user() {
        let (_dir, store) = store().await;
        let a = append(&store, TRANSACTIONS, "a@example.com", transaction(10.0))
            .await
            .unwrap();
        let b = append(&store, TRANSACTIONS, "b@example.com", transaction(20.0))
            .await
            .unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 1);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_deletion() {
        let (_dir, store) = store().await;
        for _ in 0..3 {
            append(&store, TRANSACTIONS, "a@example.com", transaction(10.0))
                .await
                .unwrap();
        }
        assert!(remove::<Transaction>(&store, TRANSACTIONS, "a@example.com", 2)
            .await
            .unwrap());

        let next = append(&store, TRANSACTIONS, "a@example.com", transaction(10.0))
            .await
            .unwrap();
        assert_eq!(next.id, 4);

        let ids: Vec<u64> = entries::<Transaction>(&store, TRANSACTIONS, "a@example.com")
            .await
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![1, 3, 4]);
    }

    #[tokio::test]
    async fn second_delete_reports_not_found_and_changes_nothing() {
        let (_dir, store) = store().await;
        append(&store, TRANSACTIONS, "a@example.com", transaction(10.0))
            .await
            .unwrap();
        assert!(remove::<Transaction>(&store, TRANSACTIONS, "a@example.com", 1)
            .await
            .unwrap());
        let len_after_first = entries::<Transaction>(&store, TRANSACTIONS, "a@example.com")
            .await
            .len();

        assert!(!remove::<Transaction>(&store, TRANSACTIONS, "a@example.com", 1)
            .await
            .unwrap());
        let len_after_second = entries::<Transaction>(&store, TRANSACTIONS, "a@example.com")
            .await
            .len();
        assert_eq!(len_after_first, len_after_second);
    }

    #[tokio::test]
    async fn duplicate_budget_for_category_and_month_is_rejected() {
        let (_dir, store) = store().await;
        let first = append_budget(&store, "a@example.com", "food", 200.0, "2026-08")
            .await
            .unwrap();
        assert!(first.is_some());

        let duplicate = append_budget(&store, "a@example.com", "food", 300.0, "2026-08")
            .await
            .unwrap();
        assert!(duplicate.is_none());

        let same_category_other_month =
            append_budget(&store, "a@example.com", "food", 300.0, "2026-09")
                .await
                .unwrap();
        assert!(same_category_other_month.is_some());
    }

    #[tokio::test]
    async fn transaction_dates_round_trip_as_calendar_days() {
        let (_dir, store) = store().await;
        append(&store, TRANSACTIONS, "a@example.com", transaction(10.0))
            .await
            .unwrap();
        let loaded = entries::<Transaction>(&store, TRANSACTIONS, "a@example.com").await;
        assert_eq!(loaded[0].date, date!(2026 - 08 - 05));
    }
}
