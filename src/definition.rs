//! Cross-tab definition - the serializable configuration.
//!
//! These types DESCRIBE a cross-tabulation: which fields group rows and
//! columns, which fields become metrics and how they aggregate, and how
//! groups are sorted. They are immutable snapshots of caller intent; the
//! `Hash` derives feed the result-cache fingerprint.

use serde::{Deserialize, Serialize};

// ============================================================================
// AGGREGATION
// ============================================================================

/// Supported aggregation functions for metric fields.
///
/// Unrecognized kinds deserialize to `Unknown`, which aggregates to 0
/// rather than failing - a wrong cell beats a crashed table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AggregationKind {
    #[default]
    Sum,
    Avg,
    Count,
    DistinctCount,
    Min,
    Max,
    Variance,
    Stddev,
    /// Arithmetic formula over sibling metric results, e.g. `{a} * {b}`.
    Expression,
    #[serde(other)]
    Unknown,
}

// ============================================================================
// SORTING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Per-dimension sort configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct DimensionSort {
    pub enabled: bool,
    #[serde(default)]
    pub direction: SortDirection,
}

/// An externally supplied sort, applied before any dimension-level sort.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortParam {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

// ============================================================================
// SUBTOTALS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SubtotalPosition {
    Top,
    #[default]
    Bottom,
}

/// Subtotal configuration for one row-dimension level. A dimension at
/// index L produces one subtotal row per distinct prefix key over the
/// dimensions before it; index 0 is the grand total.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct SubtotalSpec {
    pub enabled: bool,
    pub label: Option<String>,
    #[serde(default)]
    pub position: SubtotalPosition,
}

impl SubtotalSpec {
    pub const DEFAULT_LABEL: &'static str = "Total";

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(Self::DEFAULT_LABEL)
    }
}

// ============================================================================
// FIELD DEFINITIONS
// ============================================================================

/// One row or column grouping level. The ordered list of dimensions
/// defines the hierarchy depth.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DimensionSpec {
    /// Dotted path into the source records.
    pub field: String,

    /// Display title (defaults to the field path).
    pub title: Option<String>,

    /// Dimension-level sort; when absent or disabled, groups fall back to
    /// ascending natural order on the resolved value.
    #[serde(default)]
    pub sort: Option<DimensionSort>,

    /// Whether groups at this level start collapsed.
    #[serde(default)]
    pub collapsed_by_default: bool,

    /// Expanding a group at this level also expands all its descendants.
    #[serde(default)]
    pub cascade_expand_to_children: bool,

    /// Subtotal configuration (row dimensions only).
    #[serde(default)]
    pub subtotal: Option<SubtotalSpec>,

    /// Replacement text for empty resolved values.
    #[serde(default)]
    pub empty_placeholder: Option<String>,
}

impl DimensionSpec {
    pub fn new(field: impl Into<String>) -> Self {
        DimensionSpec {
            field: field.into(),
            title: None,
            sort: None,
            collapsed_by_default: false,
            cascade_expand_to_children: false,
            subtotal: None,
            empty_placeholder: None,
        }
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.field)
    }

    pub fn subtotal_enabled(&self) -> bool {
        self.subtotal.as_ref().map(|s| s.enabled).unwrap_or(false)
    }

    /// The configured subtotal label, if subtotals are enabled here.
    pub fn subtotal_label(&self) -> Option<&str> {
        self.subtotal
            .as_ref()
            .filter(|s| s.enabled)
            .map(|s| s.label())
    }
}

/// A metric field with its aggregation function.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricSpec {
    /// Dotted path into the source records (and the name sibling
    /// expressions reference it by).
    pub field: String,

    /// Display title (defaults to the field path).
    pub title: Option<String>,

    #[serde(default)]
    pub aggregation: AggregationKind,

    /// Formula for `AggregationKind::Expression`, evaluated after all
    /// non-expression metrics of the same cell.
    #[serde(default)]
    pub expression: Option<String>,

    /// Hidden metrics are excluded from output but still configurable.
    #[serde(default)]
    pub hidden: bool,

    /// Replacement text for null/NaN/non-finite cell values.
    #[serde(default)]
    pub empty_placeholder: Option<String>,
}

impl MetricSpec {
    pub fn new(field: impl Into<String>, aggregation: AggregationKind) -> Self {
        MetricSpec {
            field: field.into(),
            title: None,
            aggregation,
            expression: None,
            hidden: false,
            empty_placeholder: None,
        }
    }

    pub fn expression(field: impl Into<String>, formula: impl Into<String>) -> Self {
        let mut spec = MetricSpec::new(field, AggregationKind::Expression);
        spec.expression = Some(formula.into());
        spec
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.field)
    }
}

// ============================================================================
// MAIN DEFINITION STRUCT
// ============================================================================

/// The complete definition of a cross-tabulation request.
///
/// `dataset_version` is the caller-supplied identity of the record
/// collection; bump it whenever the underlying data changes so cached
/// results for the old data cannot be served.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct CrosstabDefinition {
    #[serde(default)]
    pub dataset_version: u64,

    /// Row grouping levels, outer to inner.
    #[serde(default)]
    pub row_dimensions: Vec<DimensionSpec>,

    /// Column grouping levels, outer to inner.
    #[serde(default)]
    pub column_dimensions: Vec<DimensionSpec>,

    #[serde(default)]
    pub metrics: Vec<MetricSpec>,

    /// External sorts, applied before dimension-level sorts.
    #[serde(default)]
    pub sort_params: Vec<SortParam>,
}

impl CrosstabDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bump_dataset_version(&mut self) {
        self.dataset_version += 1;
    }
}
