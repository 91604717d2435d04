//! Client registry loading.
//!
//! Builds the identifier → {category, name} lookup from `clientes.json`.
//! A missing or unreadable registry degrades to an empty map so transactions
//! simply fall back to "unknown client" handling.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};
use viability_core::models::{Category, ClientMap, ClientRecord, EntityId};

use crate::decode::{decode_best_effort, read_export, SingleItem};

/// File name of the client registry inside the data directory.
pub const CLIENT_REGISTRY_FILE: &str = "clientes.json";

/// Organisation id that marks a client as private. Only a JSON number
/// matches; the string `"4"` does not.
pub const PRIVATE_ORGANIZATION_ID: f64 = 4.0;

/// Load the client registry from `data_dir`.
///
/// Never fails: an absent file, an I/O error or undecodable content all yield
/// an empty map.
pub fn load_client_map(data_dir: &Path) -> ClientMap {
    let path = data_dir.join(CLIENT_REGISTRY_FILE);
    if !path.exists() {
        debug!("No client registry at {}", path.display());
        return ClientMap::new();
    }

    match read_export(&path) {
        Ok(text) => {
            let map = client_map_from_text(&text);
            debug!("Loaded {} clients from {}", map.len(), path.display());
            map
        }
        Err(e) => {
            warn!("Ignoring client registry: {}", e);
            ClientMap::new()
        }
    }
}

/// Build the client map from the raw registry text.
pub fn client_map_from_text(text: &str) -> ClientMap {
    let decoded = match decode_best_effort(text) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!("Client registry unreadable: {}", e);
            return ClientMap::new();
        }
    };

    decoded
        .into_records(SingleItem::Reject)
        .iter()
        .filter_map(client_record)
        .map(|record| (record.id.clone(), record))
        .collect()
}

/// Classify a registry entry: private iff `organizacao.id` is the sentinel.
pub fn categorize(entry: &Value) -> Category {
    let org_id = entry
        .get("organizacao")
        .and_then(Value::as_object)
        .and_then(|org| org.get("id"))
        .and_then(Value::as_f64);

    match org_id {
        Some(id) if id == PRIVATE_ORGANIZATION_ID => Category::Private,
        _ => Category::Public,
    }
}

fn client_record(entry: &Value) -> Option<ClientRecord> {
    let id = entry.get("id").and_then(EntityId::from_json)?;
    let name = entry
        .get("nome")
        .and_then(Value::as_str)
        .map(str::to_uppercase)
        .unwrap_or_default();

    Some(ClientRecord {
        id,
        category: categorize(entry),
        name,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_registry(dir: &Path, content: &str) {
        std::fs::write(dir.join(CLIENT_REGISTRY_FILE), content).unwrap();
    }

    #[test]
    fn test_missing_registry_yields_empty_map() {
        let dir = TempDir::new().unwrap();
        assert!(load_client_map(dir.path()).is_empty());
    }

    #[test]
    fn test_missing_directory_yields_empty_map() {
        let map = load_client_map(Path::new("/tmp/does-not-exist-viability-test-xyz"));
        assert!(map.is_empty());
    }

    #[test]
    fn test_unparseable_registry_yields_empty_map() {
        let dir = TempDir::new().unwrap();
        write_registry(dir.path(), "<<< definitely not json >>>");
        assert!(load_client_map(dir.path()).is_empty());
    }

    #[test]
    fn test_plain_list_registry() {
        let dir = TempDir::new().unwrap();
        write_registry(
            dir.path(),
            r#"[{"id": 1, "nome": "acme", "organizacao": {"id": 4}},
                {"id": 2, "nome": "Prefeitura", "organizacao": {"id": 7}}]"#,
        );

        let map = load_client_map(dir.path());
        assert_eq!(map.len(), 2);

        let acme = &map[&EntityId::new("1")];
        assert_eq!(acme.category, Category::Private);
        assert_eq!(acme.name, "ACME");

        let city = &map[&EntityId::new("2")];
        assert_eq!(city.category, Category::Public);
        assert_eq!(city.name, "PREFEITURA");
    }

    #[test]
    fn test_items_wrapper_registry() {
        let map = client_map_from_text(r#"{"items": [{"id": "c-1", "nome": "beta"}]}"#);
        assert_eq!(map[&EntityId::new("c-1")].name, "BETA");
    }

    #[test]
    fn test_single_items_object_registry_is_empty() {
        let map = client_map_from_text(r#"{"items": {"id": 1, "nome": "x"}}"#);
        assert!(map.is_empty());
    }

    #[test]
    fn test_concatenated_registry_pages() {
        let map = client_map_from_text(r#"[{"id": 1, "nome": "a"}][{"id": 2, "nome": "b"}]"#);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_entries_without_id_are_skipped() {
        let map = client_map_from_text(
            r#"[{"nome": "sem id"}, {"id": null, "nome": "nulo"}, {"id": 0}, {"id": 3}]"#,
        );
        assert_eq!(map.len(), 1);
        assert_eq!(map[&EntityId::new("3")].name, "");
    }

    #[test]
    fn test_categorize_sentinel() {
        assert_eq!(categorize(&json!({"organizacao": {"id": 4}})), Category::Private);
        assert_eq!(categorize(&json!({"organizacao": {"id": 4.0}})), Category::Private);
        assert_eq!(categorize(&json!({"organizacao": {"id": 5}})), Category::Public);
        assert_eq!(categorize(&json!({"organizacao": {"id": "4"}})), Category::Public);
        assert_eq!(categorize(&json!({"organizacao": {"id": true}})), Category::Public);
        assert_eq!(categorize(&json!({"organizacao": {}})), Category::Public);
        assert_eq!(categorize(&json!({"organizacao": 4})), Category::Public);
        assert_eq!(categorize(&json!({})), Category::Public);
    }

    #[test]
    fn test_non_string_name_defaults_to_empty() {
        let map = client_map_from_text(r#"[{"id": 5, "nome": 123}]"#);
        assert_eq!(map[&EntityId::new("5")].name, "");
    }
}
