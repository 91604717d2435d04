//! Month-by-month aggregation of normalised transactions.

use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;

use viability_core::models::{Category, EntityId, NormalizedTransaction};

// ── MonthlySeries ─────────────────────────────────────────────────────────────

/// Twelve monthly values, January first. Months without data hold `0.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MonthlySeries([f64; 12]);

impl MonthlySeries {
    pub fn from_values(values: [f64; 12]) -> Self {
        Self(values)
    }

    /// Every month set to `value`.
    pub fn constant(value: f64) -> Self {
        Self([value; 12])
    }

    /// Value for a 1-based month; out-of-range months read as `0.0`.
    pub fn get(&self, month: u32) -> f64 {
        month
            .checked_sub(1)
            .and_then(|idx| self.0.get(idx as usize))
            .copied()
            .unwrap_or(0.0)
    }

    /// Add `amount` to a 1-based month. Out-of-range months are ignored.
    pub fn add(&mut self, month: u32, amount: f64) {
        if let Some(slot) = month.checked_sub(1).and_then(|idx| self.0.get_mut(idx as usize)) {
            *slot += amount;
        }
    }

    pub fn values(&self) -> &[f64; 12] {
        &self.0
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Annual total spread over twelve months.
    pub fn monthly_average(&self) -> f64 {
        self.total() / 12.0
    }

    /// Mean of the non-zero months, `0.0` when every month is zero.
    pub fn mean_of_nonzero(&self) -> f64 {
        let nonzero: Vec<f64> = self.0.iter().copied().filter(|v| *v != 0.0).collect();
        if nonzero.is_empty() {
            0.0
        } else {
            nonzero.iter().sum::<f64>() / nonzero.len() as f64
        }
    }

    /// Combine two series month by month.
    pub fn zip_with(&self, other: &MonthlySeries, f: impl Fn(f64, f64) -> f64) -> MonthlySeries {
        let mut out = [0.0; 12];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = f(self.0[i], other.0[i]);
        }
        MonthlySeries(out)
    }

    /// Apply `f` to every month.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> MonthlySeries {
        MonthlySeries(self.0.map(f))
    }
}

// ── TopClient ─────────────────────────────────────────────────────────────────

/// The client with the largest volume within a category.
#[derive(Debug, Clone, PartialEq)]
pub struct TopClient {
    pub client_id: EntityId,
    pub name: String,
    pub category: Category,
    pub total: f64,
}

// ── MonthlyAggregator ─────────────────────────────────────────────────────────

/// Stateless helper that groups transactions by calendar month.
pub struct MonthlyAggregator;

impl MonthlyAggregator {
    /// Sum of `value_fn` per month.
    pub fn sum_by_month<'a>(
        transactions: impl IntoIterator<Item = &'a NormalizedTransaction>,
        value_fn: impl Fn(&NormalizedTransaction) -> f64,
    ) -> MonthlySeries {
        let mut series = MonthlySeries::default();
        for tx in transactions {
            series.add(tx.month, value_fn(tx));
        }
        series
    }

    /// Transaction volume per month.
    pub fn volume_by_month<'a>(
        transactions: impl IntoIterator<Item = &'a NormalizedTransaction>,
    ) -> MonthlySeries {
        Self::sum_by_month(transactions, |tx| tx.value)
    }

    /// Transaction volume per month restricted to one category.
    pub fn volume_by_category(
        transactions: &[&NormalizedTransaction],
        category: Category,
    ) -> MonthlySeries {
        Self::volume_by_month(
            transactions
                .iter()
                .copied()
                .filter(|tx| tx.category == category),
        )
    }

    /// Number of transactions per month matching `predicate`.
    pub fn count_by_month(
        transactions: &[&NormalizedTransaction],
        predicate: impl Fn(&NormalizedTransaction) -> bool,
    ) -> MonthlySeries {
        Self::sum_by_month(
            transactions.iter().copied().filter(|tx| predicate(*tx)),
            |_| 1.0,
        )
    }

    /// Arithmetic mean of `value_fn` per month; months without data are `0.0`.
    pub fn mean_by_month(
        transactions: &[&NormalizedTransaction],
        value_fn: impl Fn(&NormalizedTransaction) -> f64,
    ) -> MonthlySeries {
        let sums = Self::sum_by_month(transactions.iter().copied(), &value_fn);
        let counts = Self::count_by_month(transactions, |_| true);
        sums.zip_with(&counts, |sum, count| if count > 0.0 { sum / count } else { 0.0 })
    }

    /// Number of distinct keys per month. Transactions whose key is `None`
    /// are not counted.
    pub fn distinct_by_month<K: Eq + Hash>(
        transactions: &[&NormalizedTransaction],
        key_fn: impl Fn(&NormalizedTransaction) -> Option<K>,
    ) -> MonthlySeries {
        let mut seen: [HashSet<K>; 12] = Default::default();
        for &tx in transactions {
            if let (Some(key), Some(set)) = (
                key_fn(tx),
                tx.month.checked_sub(1).and_then(|i| seen.get_mut(i as usize)),
            ) {
                set.insert(key);
            }
        }
        MonthlySeries(seen.map(|set| set.len() as f64))
    }

    /// The highest-volume client of `category`.
    ///
    /// Transactions are grouped by (client id, name, category); transactions
    /// without a client id are ignored. Ties keep the first group in key
    /// order, which compares ids as text (`"10"` before `"9"`).
    pub fn top_client(
        transactions: &[&NormalizedTransaction],
        category: Category,
    ) -> Option<TopClient> {
        let mut groups: BTreeMap<(&EntityId, &str), f64> = BTreeMap::new();
        for tx in transactions.iter().copied().filter(|tx| tx.category == category) {
            if let Some(id) = tx.client_id.as_ref() {
                *groups.entry((id, tx.client_name.as_str())).or_default() += tx.value;
            }
        }

        let mut best: Option<((&EntityId, &str), f64)> = None;
        for (key, total) in groups {
            if best.map(|(_, t)| total > t).unwrap_or(true) {
                best = Some((key, total));
            }
        }

        best.map(|((id, name), total)| TopClient {
            client_id: id.clone(),
            name: name.to_string(),
            category,
            total,
        })
    }

    /// Monthly volume of every transaction carrying `client_id`.
    pub fn client_volume(
        transactions: &[&NormalizedTransaction],
        client_id: &EntityId,
    ) -> MonthlySeries {
        Self::volume_by_month(
            transactions
                .iter()
                .copied()
                .filter(|tx| tx.client_id.as_ref() == Some(client_id)),
        )
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
