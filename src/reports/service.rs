use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use time::Date;

use crate::ledger::repo::{Budget, Transaction, TransactionKind};

#[derive(Debug, Default, PartialEq, Serialize)]
pub struct Summary {
    pub income: f64,
    pub expenses: f64,
    pub balance: f64,
    pub transaction_count: usize,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct BudgetStatus {
    pub id: u64,
    pub category: String,
    pub month: String,
    pub limit: f64,
    pub spent: f64,
    pub remaining: f64,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct MonthTrend {
    pub month: String,
    pub income: f64,
    pub expenses: f64,
}

/// Number of months covered by the trend series, current month included.
const TREND_MONTHS: u32 = 6;

pub fn summarize(transactions: &[Transaction]) -> Summary {
    let income: f64 = transactions
        .iter()
        .filter(|t| t.kind == TransactionKind::Income)
        .map(|t| t.amount)
        .sum();
    let expenses: f64 = transactions
        .iter()
        .filter(|t| t.kind == TransactionKind::Expense)
        .map(|t| t.amount)
        .sum();
    Summary {
        income,
        expenses,
        balance: income - expenses,
        transaction_count: transactions.len(),
    }
}

/// Spend and remaining headroom per budget. Spent sums expense amounts in
/// the budget's category whose date falls inside the budget's month.
/// Remaining goes negative when the budget is blown.
pub fn budget_status(budgets: &[Budget], transactions: &[Transaction]) -> Vec<BudgetStatus> {
    budgets
        .iter()
        .map(|b| {
            let spent: f64 = transactions
                .iter()
                .filter(|t| {
                    t.kind == TransactionKind::Expense
                        && t.category == b.category
                        && month_token(t.date) == b.month
                })
                .map(|t| t.amount)
                .sum();
            BudgetStatus {
                id: b.id,
                category: b.category.clone(),
                month: b.month.clone(),
                limit: b.limit,
                spent,
                remaining: b.limit - spent,
            }
        })
        .collect()
}

/// Expense totals grouped by category.
pub fn category_totals(transactions: &[Transaction]) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();
    for t in transactions {
        if t.kind == TransactionKind::Expense {
            *totals.entry(t.category.clone()).or_insert(0.0) += t.amount;
        }
    }
    totals
}

/// Trailing six-month income/expense series ending at `today`'s month.
/// Months with no transactions are present with zeros; order is oldest to
/// newest. Buckets step by calendar month, not fixed 30-day windows.
pub fn monthly_trend(transactions: &[Transaction], today: Date) -> Vec<MonthTrend> {
    let mut buckets: HashMap<String, (f64, f64)> = HashMap::new();
    for t in transactions {
        let bucket = buckets.entry(month_token(t.date)).or_insert((0.0, 0.0));
        match t.kind {
            TransactionKind::Income => bucket.0 += t.amount,
            TransactionKind::Expense => bucket.1 += t.amount,
        }
    }

    (0..TREND_MONTHS)
        .rev()
        .map(|back| {
            let (year, month) = months_back(today, back);
            let label = month_label(year, month);
            let (income, expenses) = buckets.get(&label).copied().unwrap_or((0.0, 0.0));
            MonthTrend {
                month: label,
                income,
                expenses,
            }
        })
        .collect()
}

/// `YYYY-MM` token for a calendar date.
pub fn month_token(date: Date) -> String {
    month_label(date.year(), u8::from(date.month()))
}

pub fn month_label(year: i32, month: u8) -> String {
    format!("{year:04}-{month:02}")
}

/// Calendar month subtraction: steps across year boundaries exactly.
fn months_back(date: Date, back: u32) -> (i32, u8) {
    let total = date.year() * 12 + i32::from(u8::from(date.month())) - 1 - back as i32;
    (total.div_euclid(12), (total.rem_euclid(12) + 1) as u8)
}

/// Validates a `YYYY-MM` month token.
pub fn parse_month_token(s: &str) -> Option<(i32, u8)> {
    let (year, month) = s.split_once('-')?;
    if year.len() != 4 || month.len() != 2 {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    let month: u8 = month.parse().ok()?;
    (1..=12).contains(&month).then_some((year, month))
}
