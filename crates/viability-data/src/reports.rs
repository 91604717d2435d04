//! Viability report tables for a selected year.
//!
//! Builds the three tables of the report (volumetry, operational detail and
//! revenue estimate) plus the two chart series from a loaded [`Dataset`].

use viability_core::error::{ReportError, Result};
use viability_core::formatting::safe_ratio;
use viability_core::models::{Category, NormalizedTransaction};

use crate::aggregator::{MonthlyAggregator, MonthlySeries, TopClient};
use crate::reader::Dataset;

// ── Fixed rates ───────────────────────────────────────────────────────────────

/// Average negative rate applied to public bodies.
pub const NEGATIVE_RATE_PUBLIC: f64 = -0.04;
/// Fee charged per PIX transaction.
pub const PIX_FEE: f64 = 5.00;
/// Cost incurred per PIX transaction.
pub const PIX_COST: f64 = 0.00;
/// Monthly POS rental per active accreditee.
pub const POS_RENTAL_FEE: f64 = 70.00;
/// Monthly subscription fee.
pub const MONTHLY_FEE: f64 = 50.00;
/// One-off adhesion fee.
pub const ADHESION_FEE: f64 = 120.00;

// ── Row labels ────────────────────────────────────────────────────────────────

pub const ROW_PUBLIC_TOTAL: &str = "Public clients (total)";
pub const ROW_PRIVATE_TOTAL: &str = "Private companies (total)";
pub const ROW_TOTAL_VOLUME: &str = "Total volume";

pub const ROW_VOLUME: &str = "Volume (accreditees/clients)";
pub const ROW_ACCREDITEES: &str = "Active accreditees";
pub const ROW_PUBLIC_BODIES: &str = "Public bodies";
pub const ROW_TRANSACTIONS: &str = "Transactions";
pub const ROW_PIX: &str = "PIX transactions";
pub const ROW_AVG_FEE: &str = "Average admin fee (%)";
pub const ROW_TX_PER_ACCREDITEE: &str = "Transactions per accreditee";
pub const ROW_TPV_PER_ACCREDITEE: &str = "Average TPV per accreditee";
pub const ROW_TPV_PER_PUBLIC_BODY: &str = "Average TPV per public body";

pub const ROW_ADMIN_REVENUE: &str = "Accreditee - admin fee";
pub const ROW_PIX_REVENUE: &str = "Accreditee - PIX fee";
pub const ROW_POS_REVENUE: &str = "Accreditee - POS rental";
pub const ROW_TOTAL_REVENUE: &str = "Total revenue";

// ── Types ─────────────────────────────────────────────────────────────────────

/// How cell values of a table are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellFormat {
    Currency,
    Number,
}

/// One labelled row: twelve months plus the table's summary columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub label: String,
    pub months: MonthlySeries,
    /// One value per entry of [`ReportTable::summary_headers`].
    pub summary: Vec<f64>,
    /// Rendered with the totals style.
    pub emphasized: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    pub title: String,
    pub summary_headers: Vec<String>,
    pub rows: Vec<ReportRow>,
    pub format: CellFormat,
}

impl ReportTable {
    pub fn row(&self, label: &str) -> Option<&ReportRow> {
        self.rows.iter().find(|r| r.label == label)
    }
}

/// The complete report for one year.
#[derive(Debug, Clone)]
pub struct ViabilityReport {
    pub year: i32,
    pub transaction_count: usize,
    pub top_public: Option<TopClient>,
    pub top_private: Option<TopClient>,
    pub volumetry: ReportTable,
    pub operational: ReportTable,
    pub revenue: ReportTable,
    /// Chart: monthly volume of public clients.
    pub public_volume: MonthlySeries,
    /// Chart: monthly volume of private companies.
    pub private_volume: MonthlySeries,
    /// Chart: estimated total revenue per month.
    pub revenue_trend: MonthlySeries,
}

// ── Year selection ────────────────────────────────────────────────────────────

/// Pick the report year: `requested` when it has data, else the latest year.
///
/// Fails with [`ReportError::NoData`] for an empty dataset and with
/// [`ReportError::YearNotFound`] when `requested` has no transactions.
pub fn select_year(dataset: &Dataset, requested: Option<i32>) -> Result<i32> {
    let years = dataset.available_years();
    let Some(&latest) = years.last() else {
        return Err(ReportError::NoData(dataset.data_dir.clone()));
    };

    match requested {
        None => Ok(latest),
        Some(year) if years.contains(&year) => Ok(year),
        Some(year) => Err(ReportError::YearNotFound {
            year,
            available: years
                .iter()
                .map(|y| y.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

// ── Builders ──────────────────────────────────────────────────────────────────

impl ViabilityReport {
    /// Build every table for `year`.
    pub fn build(dataset: &Dataset, year: i32) -> Result<Self> {
        let year = select_year(dataset, Some(year))?;
        let txs = dataset.for_year(year);
        tracing::debug!(year, transactions = txs.len(), "building viability report");

        let top_public = MonthlyAggregator::top_client(&txs, Category::Public);
        let top_private = MonthlyAggregator::top_client(&txs, Category::Private);
        let public_volume = MonthlyAggregator::volume_by_category(&txs, Category::Public);
        let private_volume = MonthlyAggregator::volume_by_category(&txs, Category::Private);

        let volumetry = volumetry_table(
            year,
            &txs,
            top_public.as_ref(),
            top_private.as_ref(),
            public_volume,
            private_volume,
        );
        let metrics = OperationalMetrics::compute(&txs);
        let operational = metrics.table();
        let revenue = metrics.revenue_table();
        let revenue_trend = revenue
            .row(ROW_TOTAL_REVENUE)
            .map(|r| r.months)
            .unwrap_or_default();

        Ok(Self {
            year,
            transaction_count: txs.len(),
            top_public,
            top_private,
            volumetry,
            operational,
            revenue,
            public_volume,
            private_volume,
            revenue_trend,
        })
    }
}

fn volumetry_table(
    year: i32,
    txs: &[&NormalizedTransaction],
    top_public: Option<&TopClient>,
    top_private: Option<&TopClient>,
    public_volume: MonthlySeries,
    private_volume: MonthlySeries,
) -> ReportTable {
    let top_row = |top: Option<&TopClient>, category: Category| {
        let (name, months) = match top {
            Some(t) => (t.name.clone(), MonthlyAggregator::client_volume(txs, &t.client_id)),
            None => ("None".to_string(), MonthlySeries::default()),
        };
        let label = format!("* {} (top {})", name, category.to_string().to_lowercase());
        volumetry_row(label, months, false)
    };

    ReportTable {
        title: format!("1. Overall volumetry ({})", year),
        summary_headers: vec!["Annual total".to_string(), "Monthly average".to_string()],
        rows: vec![
            top_row(top_public, Category::Public),
            volumetry_row(ROW_PUBLIC_TOTAL.to_string(), public_volume, false),
            top_row(top_private, Category::Private),
            volumetry_row(ROW_PRIVATE_TOTAL.to_string(), private_volume, false),
            volumetry_row(
                ROW_TOTAL_VOLUME.to_string(),
                MonthlyAggregator::volume_by_month(txs.iter().copied()),
                true,
            ),
        ],
        format: CellFormat::Currency,
    }
}

fn volumetry_row(label: String, months: MonthlySeries, emphasized: bool) -> ReportRow {
    ReportRow {
        label,
        summary: vec![months.total(), months.monthly_average()],
        months,
        emphasized,
    }
}

/// Per-month operational figures shared by the operational and revenue
/// tables.
#[derive(Debug, Clone)]
struct OperationalMetrics {
    volume: MonthlySeries,
    accreditees: MonthlySeries,
    public_bodies: MonthlySeries,
    transactions: MonthlySeries,
    pix: MonthlySeries,
    avg_fee: MonthlySeries,
}

impl OperationalMetrics {
    fn compute(txs: &[&NormalizedTransaction]) -> Self {
        let public: Vec<&NormalizedTransaction> = txs
            .iter()
            .copied()
            .filter(|tx| tx.category == Category::Public)
            .collect();

        Self {
            volume: MonthlyAggregator::volume_by_month(txs.iter().copied()),
            accreditees: MonthlyAggregator::distinct_by_month(txs, |tx| tx.accreditee_id.clone()),
            public_bodies: MonthlyAggregator::distinct_by_month(&public, |tx| tx.client_id.clone()),
            transactions: MonthlyAggregator::count_by_month(txs, |_| true),
            pix: MonthlyAggregator::count_by_month(txs, |tx| tx.is_pix),
            avg_fee: MonthlyAggregator::mean_by_month(txs, |tx| tx.admin_fee_pct),
        }
    }

    fn table(&self) -> ReportTable {
        let ratio = |a: &MonthlySeries, b: &MonthlySeries| a.zip_with(b, safe_ratio);

        let rows = vec![
            summed_row(ROW_VOLUME, self.volume, true),
            averaged_row(ROW_ACCREDITEES, self.accreditees),
            averaged_row(ROW_PUBLIC_BODIES, self.public_bodies),
            summed_row(ROW_TRANSACTIONS, self.transactions, false),
            summed_row(ROW_PIX, self.pix, false),
            averaged_row(ROW_AVG_FEE, self.avg_fee),
            averaged_row(
                ROW_TX_PER_ACCREDITEE,
                ratio(&self.transactions, &self.accreditees),
            ),
            averaged_row(ROW_TPV_PER_ACCREDITEE, ratio(&self.volume, &self.accreditees)),
            averaged_row(ROW_TPV_PER_PUBLIC_BODY, ratio(&self.volume, &self.public_bodies)),
            averaged_row(
                "Average negative rate (public bodies)",
                MonthlySeries::constant(NEGATIVE_RATE_PUBLIC),
            ),
            averaged_row("PIX fee", MonthlySeries::constant(PIX_FEE)),
            averaged_row("Cost per PIX", MonthlySeries::constant(PIX_COST)),
            averaged_row("Average POS rental", MonthlySeries::constant(POS_RENTAL_FEE)),
            averaged_row("Average monthly fee", MonthlySeries::constant(MONTHLY_FEE)),
            averaged_row("Adhesion fee", MonthlySeries::constant(ADHESION_FEE)),
        ];

        ReportTable {
            title: "2. Operational detail".to_string(),
            summary_headers: vec!["Total/Average".to_string()],
            rows,
            format: CellFormat::Number,
        }
    }

    fn revenue_table(&self) -> ReportTable {
        let admin = self.volume.zip_with(&self.avg_fee, |vol, fee| vol * (fee / 100.0));
        let pix = self.pix.map(|count| count * PIX_FEE);
        let pos = self.accreditees.map(|count| count * POS_RENTAL_FEE);
        let total = admin.zip_with(&pix, |a, b| a + b).zip_with(&pos, |a, b| a + b);

        ReportTable {
            title: "3. Revenue estimate".to_string(),
            summary_headers: vec!["Total".to_string()],
            rows: vec![
                summed_row(ROW_ADMIN_REVENUE, admin, false),
                summed_row(ROW_PIX_REVENUE, pix, false),
                summed_row(ROW_POS_REVENUE, pos, false),
                summed_row(ROW_TOTAL_REVENUE, total, true),
            ],
            format: CellFormat::Currency,
        }
    }
}

/// Row whose summary is the sum of its months.
fn summed_row(label: &str, months: MonthlySeries, emphasized: bool) -> ReportRow {
    ReportRow {
        label: label.to_string(),
        summary: vec![months.total()],
        months,
        emphasized,
    }
}

/// Row whose summary is the mean of its non-zero months.
fn averaged_row(label: &str, months: MonthlySeries) -> ReportRow {
    ReportRow {
        label: label.to_string(),
        summary: vec![months.mean_of_nonzero()],
        months,
        emphasized: false,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
