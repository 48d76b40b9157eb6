//! Record access - dotted-path field resolution and group key building.
//!
//! Input records are opaque JSON maps. This module is the only place that
//! touches their shape: it walks dotted paths into nested maps, normalizes
//! whatever it finds into a `CellContent`, and renders the composite group
//! keys the rest of the pipeline is keyed on.
//!
//! Key format: resolved dimension values joined with `|` and always
//! prefixed with `|`, so the zero-dimension (global) key is the bare `"|"`
//! and a level-N key is a string prefix of every descendant key.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smallvec::SmallVec;

/// A single input row: an opaque key-value mapping.
pub type Record = Map<String, Value>;

/// Separator between key segments.
pub const KEY_SEPARATOR: char = '|';

/// Separator between a row key and a column key in a cell key.
pub const CELL_KEY_SEPARATOR: &str = "||";

/// Display label for the EMPTY sentinel.
pub const EMPTY_LABEL: &str = "-";

// ============================================================================
// VALUE DOMAIN
// ============================================================================

/// Wrapper around f64 that implements Eq and Hash for use as map/set keys.
/// NaN values are treated as equal to each other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrderedFloat(pub f64);

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        if self.0.is_nan() && other.0.is_nan() {
            true
        } else {
            self.0 == other.0
        }
    }
}

impl Eq for OrderedFloat {}

impl std::hash::Hash for OrderedFloat {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        if self.0.is_nan() {
            u64::MAX.hash(state);
        } else {
            self.0.to_bits().hash(state);
        }
    }
}

impl OrderedFloat {
    pub fn as_f64(&self) -> f64 {
        self.0
    }
}

/// A normalized, hashable representation of a resolved field value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellContent {
    /// Missing path, JSON null, or a blank subtotal cell.
    Empty,
    Number(OrderedFloat),
    Text(String),
    Boolean(bool),
}

impl CellContent {
    pub fn number(n: f64) -> Self {
        CellContent::Number(OrderedFloat(n))
    }

    pub fn text(s: impl Into<String>) -> Self {
        CellContent::Text(s.into())
    }

    /// Normalizes a JSON value. Nested structures are not aggregatable and
    /// degrade to their compact JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => CellContent::Empty,
            Value::Bool(b) => CellContent::Boolean(*b),
            Value::Number(n) => CellContent::Number(OrderedFloat(n.as_f64().unwrap_or(0.0))),
            Value::String(s) => CellContent::Text(s.clone()),
            other => CellContent::Text(other.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellContent::Empty)
    }

    /// Numeric coercion: numbers pass through, numeric text parses,
    /// booleans coerce to 0/1, everything else is non-numeric.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellContent::Number(n) => Some(n.as_f64()),
            CellContent::Text(s) => s.trim().parse::<f64>().ok(),
            CellContent::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            CellContent::Empty => None,
        }
    }

    /// Rendered form used both for display and for key segments.
    pub fn label(&self) -> String {
        match self {
            CellContent::Empty => EMPTY_LABEL.to_string(),
            CellContent::Number(n) => format!("{}", n.as_f64()),
            CellContent::Text(s) => s.clone(),
            CellContent::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
        }
    }

    /// Total ordering for sorting: Empty < Number < Text < Boolean.
    pub fn compare(&self, other: &CellContent) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        match (self, other) {
            (CellContent::Empty, CellContent::Empty) => Ordering::Equal,
            (CellContent::Empty, _) => Ordering::Less,
            (_, CellContent::Empty) => Ordering::Greater,

            (CellContent::Number(na), CellContent::Number(nb)) => {
                na.as_f64().partial_cmp(&nb.as_f64()).unwrap_or(Ordering::Equal)
            }
            (CellContent::Number(_), _) => Ordering::Less,
            (_, CellContent::Number(_)) => Ordering::Greater,

            (CellContent::Text(ta), CellContent::Text(tb)) => ta.cmp(tb),
            (CellContent::Text(_), _) => Ordering::Less,
            (_, CellContent::Text(_)) => Ordering::Greater,

            (CellContent::Boolean(ba), CellContent::Boolean(bb)) => ba.cmp(bb),
        }
    }
}

// ============================================================================
// FIELD RESOLUTION
// ============================================================================

/// Resolves a dotted path against a record. Any missing segment, non-map
/// intermediate, or terminal null degrades to `CellContent::Empty`.
pub fn resolve(record: &Record, path: &str) -> CellContent {
    let mut segments = path.split('.');
    let first = match segments.next() {
        Some(s) => s,
        None => return CellContent::Empty,
    };

    let mut current = match record.get(first) {
        Some(v) => v,
        None => return CellContent::Empty,
    };

    for segment in segments {
        current = match current {
            Value::Object(map) => match map.get(segment) {
                Some(v) => v,
                None => return CellContent::Empty,
            },
            _ => return CellContent::Empty,
        };
    }

    CellContent::from_json(current)
}

/// Builds the composite group key for a record over the given fields.
/// Always `|`-prefixed; zero fields yield the global key `"|"`.
pub fn build_key(record: &Record, fields: &[&str]) -> String {
    let parts: SmallVec<[String; 4]> = fields
        .iter()
        .map(|field| resolve(record, field).label())
        .collect();
    format!("{}{}", KEY_SEPARATOR, parts.join("|"))
}

/// Combines a row key and column key into a cell key.
pub fn cell_key(row_key: &str, col_key: &str) -> String {
    format!("{row_key}{CELL_KEY_SEPARATOR}{col_key}")
}

/// Splits a group key into its value segments (the leading separator
/// produces no segment).
pub fn key_segments(key: &str) -> SmallVec<[&str; 4]> {
    key.split(KEY_SEPARATOR).skip(1).collect()
}

/// The depth of a key: how many dimension values it carries.
pub fn key_depth(key: &str) -> usize {
    key.split(KEY_SEPARATOR).filter(|s| !s.is_empty()).count()
}

/// The ancestor key holding the first `level` segments of `key`.
pub fn ancestor_key(key: &str, level: usize) -> String {
    let segments = key_segments(key);
    let take = level.min(segments.len());
    format!("{}{}", KEY_SEPARATOR, segments[..take].join("|"))
}
