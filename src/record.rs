use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One row as returned by the remote table: open schema, keyed by the
/// upstream column captions.
pub type RawRow = HashMap<String, Value>;

// ============================================================================
// UPSTREAM COLUMN CAPTIONS
// ============================================================================

pub const COL_ID: &str = "id";
pub const COL_PROCESS: &str = "PROCESSO";
pub const COL_ENTITY: &str = "ENTIDADE";
pub const COL_REGION: &str = "UF";
pub const COL_YEAR: &str = "ANO";
pub const COL_STATUS: &str = "SITUACIONAL";
/// The upstream sheet exposes the status column a second time with an
/// accidental trailing space; whichever is populated wins.
pub const COL_STATUS_ALIAS: &str = "SITUACIONAL ";
pub const COL_VALUE: &str = "VALOR REPASSE";

/// Captions consumed into canonical fields; everything else is passthrough.
pub const CANONICAL_COLUMNS: [&str; 8] = [
    COL_ID,
    COL_PROCESS,
    COL_ENTITY,
    COL_REGION,
    COL_YEAR,
    COL_STATUS,
    COL_STATUS_ALIAS,
    COL_VALUE,
];

// ============================================================================
// SENTINELS (substituted for missing/unparseable source data)
// ============================================================================

pub const PROCESS_SENTINEL: &str = "—";
pub const ENTITY_SENTINEL: &str = "DESCONHECIDA";
pub const REGION_SENTINEL: &str = "N/A";
pub const YEAR_SENTINEL: &str = "S/A";
pub const STATUS_SENTINEL: &str = "PENDENTE";

// ============================================================================
// CANONICAL RECORD
// ============================================================================

/// One normalized fund-transfer entry.
///
/// Core fields carry a fixed schema the engine understands; everything the
/// upstream table adds beyond that rides along in `extra` and is only used
/// for free-text search, export, and row-level edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,

    #[serde(rename = "processo")]
    pub process_number: String,

    #[serde(rename = "entidade")]
    pub entity: String,

    #[serde(rename = "uf")]
    pub region: String,

    #[serde(rename = "ano")]
    pub year: String,

    #[serde(rename = "situacao")]
    pub status: String,

    #[serde(rename = "valor")]
    pub transfer_value: f64,

    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl Record {
    /// Lower-cased concatenation of every field's string form, canonical and
    /// passthrough alike. Free-text search is "search everything".
    pub fn search_haystack(&self) -> String {
        let mut hay = String::new();
        let mut push = |part: &str| {
            hay.push_str(&part.to_lowercase());
            hay.push('\u{1}');
        };

        push(&self.id.to_string());
        push(&self.process_number);
        push(&self.entity);
        push(&self.region);
        push(&self.year);
        push(&self.status);
        push(&self.transfer_value.to_string());
        for value in self.extra.values() {
            push(&display_value(value));
        }

        hay
    }

    /// Canonical field values in `CANONICAL_EXPORT_COLUMNS` order, as display
    /// strings. Extra fields are exported separately by key.
    pub fn canonical_values(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.process_number.clone(),
            self.entity.clone(),
            self.region.clone(),
            self.year.clone(),
            self.status.clone(),
            self.transfer_value.to_string(),
        ]
    }

    /// Re-assemble the row shape the remote table uses, canonical fields under
    /// their upstream captions plus every passthrough column.
    pub fn to_raw(&self) -> RawRow {
        let mut raw: RawRow = self.extra.clone();
        raw.insert(COL_ID.to_string(), Value::from(self.id));
        raw.insert(COL_PROCESS.to_string(), Value::from(self.process_number.clone()));
        raw.insert(COL_ENTITY.to_string(), Value::from(self.entity.clone()));
        raw.insert(COL_REGION.to_string(), Value::from(self.region.clone()));
        raw.insert(COL_YEAR.to_string(), Value::from(self.year.clone()));
        raw.insert(COL_STATUS.to_string(), Value::from(self.status.clone()));
        raw.insert(COL_VALUE.to_string(), Value::from(self.transfer_value));
        raw
    }
}

/// Canonical column captions in export order (status exported once, under the
/// clean caption).
pub const CANONICAL_EXPORT_COLUMNS: [&str; 7] = [
    COL_ID,
    COL_PROCESS,
    COL_ENTITY,
    COL_REGION,
    COL_YEAR,
    COL_STATUS,
    COL_VALUE,
];

/// Display form of an arbitrary JSON value: bare strings stay bare, null is
/// empty, everything else renders as compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_record() -> Record {
        let mut extra = HashMap::new();
        extra.insert("CNPJ".to_string(), json!("12345678000199"));
        extra.insert("EQUIPE".to_string(), json!("EQUIPE 6"));
        Record {
            id: 42,
            process_number: "71000.012345/2023-11".to_string(),
            entity: "PREFEITURA DE SANTOS".to_string(),
            region: "SP".to_string(),
            year: "2023".to_string(),
            status: "SIM".to_string(),
            transfer_value: 1500.0,
            extra,
        }
    }

    #[test]
    fn test_haystack_covers_canonical_fields() {
        let hay = sample_record().search_haystack();
        assert!(hay.contains("prefeitura de santos"));
        assert!(hay.contains("sp"));
        assert!(hay.contains("2023"));
        assert!(hay.contains("1500"));
    }

    #[test]
    fn test_haystack_covers_extra_fields() {
        let hay = sample_record().search_haystack();
        assert!(hay.contains("12345678000199"));
        assert!(hay.contains("equipe 6"));
    }

    #[test]
    fn test_to_raw_round_trip_keys() {
        let raw = sample_record().to_raw();
        assert_eq!(raw.get(COL_REGION), Some(&json!("SP")));
        assert_eq!(raw.get(COL_VALUE), Some(&json!(1500.0)));
        assert_eq!(raw.get("CNPJ"), Some(&json!("12345678000199")));
    }

    #[test]
    fn test_display_value_forms() {
        assert_eq!(display_value(&json!("abc")), "abc");
        assert_eq!(display_value(&json!(7)), "7");
        assert_eq!(display_value(&Value::Null), "");
    }

    #[test]
    fn test_record_serializes_with_normalized_keys() {
        let json = serde_json::to_value(sample_record()).unwrap();
        assert_eq!(json["uf"], "SP");
        assert_eq!(json["valor"], 1500.0);
        assert_eq!(json["CNPJ"], "12345678000199");
    }
}
