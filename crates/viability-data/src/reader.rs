//! Transaction export discovery and normalisation.
//!
//! Reads every `transacoes_*.json` file in the data directory, repairs it
//! through the [decode chain](crate::decode), joins each record against the
//! client registry and emits typed [`NormalizedTransaction`] rows.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};
use viability_core::data_processors::{Accessor, Field, TimestampProcessor};
use viability_core::error::{ReportError, Result};
use viability_core::models::{Category, ClientMap, EntityId, NormalizedTransaction};

use crate::clients::load_client_map;
use crate::decode::{decode_best_effort, read_export, SingleItem};

// ── Field accessors ───────────────────────────────────────────────────────────

const DATE: Field = Field::new(
    "date",
    &[Accessor::Key("data_cadastro"), Accessor::Key("data_transacao")],
);
const VALUE: Field = Field::new(
    "value",
    &[Accessor::Key("valor_bruto"), Accessor::Key("valor_total")],
);
const CLIENT_ID: Field = Field::new(
    "client_id",
    &[Accessor::Key("cliente_id"), Accessor::Nested("cliente", "id")],
);
const ACCREDITEE_ID: Field = Field::new("accreditee_id", &[Accessor::Key("credenciado_id")]);
const PAYMENT_METHOD: Field = Field::new("payment_method", &[Accessor::Key("forma_pagamento")]);
const ADMIN_FEE: Field = Field::new(
    "admin_fee_pct",
    &[Accessor::Key("taxa_administrativa_credenciado")],
);
const EMBEDDED_CLIENT_NAME: Field =
    Field::new("client_name", &[Accessor::Nested("cliente", "nome")]);

/// Name used when an embedded client object has no usable name.
const UNKNOWN_CLIENT_NAME: &str = "CLIENTE DESCONHECIDO";

// ── Public types ──────────────────────────────────────────────────────────────

/// Why a raw record did not become a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DropReason {
    /// The element is not a JSON object.
    NotAnObject,
    /// Neither date field is present.
    MissingDate,
    /// A date is present but no known format matches it.
    InvalidDate,
    /// The value is absent, non-numeric, zero or negative.
    NonPositiveValue,
}

/// Counters describing one load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Transaction files discovered.
    pub files_found: usize,
    /// Files that were read and decoded.
    pub files_read: usize,
    /// Files that contributed nothing because of an I/O or decode failure.
    pub files_failed: Vec<PathBuf>,
    /// Raw records examined across all files.
    pub records_seen: usize,
    /// Number of entries in the client registry.
    pub clients_loaded: usize,
    /// Dropped records by reason.
    pub dropped: BTreeMap<DropReason, usize>,
}

impl LoadReport {
    pub fn records_dropped(&self) -> usize {
        self.dropped.values().sum()
    }
}

/// Every transaction recovered from a data directory, in file order then
/// in-file order.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub data_dir: PathBuf,
    pub transactions: Vec<NormalizedTransaction>,
    pub report: LoadReport,
}

impl Dataset {
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Distinct years present, ascending.
    pub fn available_years(&self) -> Vec<i32> {
        self.transactions
            .iter()
            .map(|t| t.year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// The most recent year, or `None` for an empty dataset.
    pub fn latest_year(&self) -> Option<i32> {
        self.transactions.iter().map(|t| t.year).max()
    }

    /// Transactions of a single year, in load order.
    pub fn for_year(&self, year: i32) -> Vec<&NormalizedTransaction> {
        self.transactions.iter().filter(|t| t.year == year).collect()
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Find the transaction exports directly inside `data_dir`, sorted by name.
pub fn find_transaction_files(data_dir: &Path) -> Vec<PathBuf> {
    if !data_dir.exists() {
        warn!("Data path does not exist: {}", data_dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(data_dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .file_name()
                    .to_str()
                    .map(is_transaction_file_name)
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// `true` for names matching `transacoes_*.json`.
pub fn is_transaction_file_name(name: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^transacoes_.*\.json$").expect("regex is valid"))
        .is_match(name)
}

/// Load the client registry and every transaction export in `data_dir`.
///
/// Never fails; an empty [`Dataset`] signals that nothing was recoverable.
pub fn load_dataset(data_dir: &Path) -> Dataset {
    let clients = load_client_map(data_dir);
    let mut dataset = load_transactions(data_dir, &clients);
    dataset.report.clients_loaded = clients.len();
    dataset
}

/// Load every transaction export in `data_dir`, resolving clients via
/// `clients`.
pub fn load_transactions(data_dir: &Path, clients: &ClientMap) -> Dataset {
    let files = find_transaction_files(data_dir);
    let mut report = LoadReport {
        files_found: files.len(),
        ..LoadReport::default()
    };
    let mut transactions = Vec::new();

    for file_path in &files {
        match process_single_file(file_path, clients, &mut report) {
            Ok(rows) => {
                report.files_read += 1;
                transactions.extend(rows);
            }
            Err(e) => {
                warn!("Skipping {}: {}", file_path.display(), e);
                report.files_failed.push(file_path.clone());
            }
        }
    }

    info!(
        "Loaded {} transactions from {} files ({} records dropped, {} files skipped)",
        transactions.len(),
        report.files_found,
        report.records_dropped(),
        report.files_failed.len()
    );

    Dataset {
        data_dir: data_dir.to_path_buf(),
        transactions,
        report,
    }
}

/// Turn one raw record into a transaction.
pub fn normalize_record(
    record: &Value,
    clients: &ClientMap,
) -> std::result::Result<NormalizedTransaction, DropReason> {
    if !record.is_object() {
        return Err(DropReason::NotAnObject);
    }

    let raw_date = DATE.first_present(record).ok_or(DropReason::MissingDate)?;
    let value = VALUE.number_or_zero(record);
    if value <= 0.0 {
        return Err(DropReason::NonPositiveValue);
    }
    let date = TimestampProcessor::parse(raw_date).ok_or(DropReason::InvalidDate)?;

    let client_id = CLIENT_ID.first_present(record).and_then(EntityId::from_json);
    let known = client_id.as_ref().and_then(|id| clients.get(id));
    let category = known.map(|c| c.category).unwrap_or(Category::Public);
    let client_name = match known.map(|c| c.name.as_str()).filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None => fallback_client_name(record, client_id.as_ref()),
    };

    let accreditee_id = ACCREDITEE_ID.first_present(record).and_then(EntityId::from_json);
    let is_pix = PAYMENT_METHOD
        .first_present(record)
        .map(|v| match v {
            Value::String(s) => s.to_uppercase().contains("PIX"),
            other => other.to_string().to_uppercase().contains("PIX"),
        })
        .unwrap_or(false);
    let admin_fee_pct = ADMIN_FEE.number_or_zero(record);

    NormalizedTransaction::new(
        date,
        value,
        category,
        client_name,
        client_id,
        accreditee_id,
        is_pix,
        admin_fee_pct,
    )
    .ok_or(DropReason::NonPositiveValue)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Decode one export and normalise its records. A file from which no JSON at
/// all can be recovered is an error.
fn process_single_file(
    file_path: &Path,
    clients: &ClientMap,
    report: &mut LoadReport,
) -> Result<Vec<NormalizedTransaction>> {
    let text = read_export(file_path)?;
    let records = decode_best_effort(&text)
        .map_err(|e| ReportError::JsonParse {
            path: file_path.to_path_buf(),
            diagnostic: e.diagnostic,
        })?
        .into_records(SingleItem::Wrap);

    let mut rows = Vec::with_capacity(records.len());
    let mut dropped = 0usize;
    for record in &records {
        report.records_seen += 1;
        match normalize_record(record, clients) {
            Ok(tx) => rows.push(tx),
            Err(reason) => {
                dropped += 1;
                *report.dropped.entry(reason).or_default() += 1;
            }
        }
    }

    debug!(
        "File {}: {} records, {} kept, {} dropped",
        file_path.display(),
        records.len(),
        rows.len(),
        dropped
    );

    Ok(rows)
}

/// Name for a client missing from the registry: the embedded client's name,
/// else a placeholder built from the raw id.
fn fallback_client_name(record: &Value, client_id: Option<&EntityId>) -> String {
    if record.get("cliente").is_some_and(Value::is_object) {
        return EMBEDDED_CLIENT_NAME
            .upper_string(record)
            .unwrap_or_else(|| UNKNOWN_CLIENT_NAME.to_string());
    }
    match client_id {
        Some(id) => format!("Cliente {}", id),
        None => "Cliente Desconhecido".to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
