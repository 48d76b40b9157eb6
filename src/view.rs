//! Renderable output - cells, rows, and the column-header tree.
//!
//! The view is what a renderer consumes: a row/cell matrix plus a nested
//! column-header description. It carries no visual styling; expand state
//! lives on the owning `CrosstabTable` and is applied at render time via
//! `visible_rows`.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::record::CellContent;

// ============================================================================
// CELLS AND ROWS
// ============================================================================

/// A single cell in the result matrix.
///
/// A `row_span` or `col_span` of 0 means the cell is covered by an earlier
/// cell in the same column/row and must not be rendered independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub content: CellContent,

    pub row_span: u16,
    pub col_span: u16,

    /// Index of a representative source record (first of the group, or
    /// the record itself in detail mode).
    pub source_row: Option<usize>,

    /// Whether this cell toggles a group open/closed. Consumers feed
    /// `level` and `row_key` back into `CrosstabTable::toggle_expand`.
    pub expandable: bool,
    pub expanded: bool,

    /// 1-based hierarchy depth for dimension cells; 0 for metric cells.
    pub level: usize,

    /// The group key this cell belongs to (dimension cells only).
    pub row_key: Option<String>,
}

impl Cell {
    /// A row-dimension cell.
    pub fn dimension(content: CellContent, level: usize, row_key: String) -> Self {
        Cell {
            content,
            row_span: 1,
            col_span: 1,
            source_row: None,
            expandable: false,
            expanded: true,
            level,
            row_key: Some(row_key),
        }
    }

    /// An aggregated metric cell.
    pub fn metric(content: CellContent, source_row: Option<usize>) -> Self {
        Cell {
            content,
            row_span: 1,
            col_span: 1,
            source_row,
            expandable: false,
            expanded: false,
            level: 0,
            row_key: None,
        }
    }

    pub fn with_expandable(mut self, expandable: bool, expanded: bool) -> Self {
        self.expandable = expandable;
        self.expanded = expanded;
        self
    }

    pub fn with_source_row(mut self, source_row: Option<usize>) -> Self {
        self.source_row = source_row;
        self
    }

    /// Whether this cell is covered by a merged run.
    pub fn is_covered(&self) -> bool {
        self.row_span == 0 || self.col_span == 0
    }
}

/// The kind of a result row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowKind {
    Data,
    Subtotal,
}

/// An ordered sequence of cells plus the deepest group key it represents
/// (or a subtotal variant of it; the record index in detail mode).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub cells: Vec<Cell>,
    pub row_key: String,
    pub kind: RowKind,
}

impl Row {
    pub fn data(cells: Vec<Cell>, row_key: String) -> Self {
        Row {
            cells,
            row_key,
            kind: RowKind::Data,
        }
    }

    pub fn subtotal(cells: Vec<Cell>, row_key: String) -> Self {
        Row {
            cells,
            row_key,
            kind: RowKind::Subtotal,
        }
    }
}

// ============================================================================
// COLUMN HEADER TREE
// ============================================================================

/// A node in the nested column-header tree.
///
/// Interior nodes (column-dimension values) use the composite field
/// `"<dimensionField>__<value>"`; metric leaves under a column path use
/// `"<columnGroupKey>||<metricField>"`. Row-dimension columns and flat
/// metric columns keep their own field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnHeaderNode {
    pub field: String,
    pub title: String,
    #[serde(default)]
    pub children: Vec<ColumnHeaderNode>,
}

impl ColumnHeaderNode {
    pub fn leaf(field: impl Into<String>, title: impl Into<String>) -> Self {
        ColumnHeaderNode {
            field: field.into(),
            title: title.into(),
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Depth-first collection of leaf nodes (the actual data columns).
    pub fn leaves(&self) -> Vec<&ColumnHeaderNode> {
        if self.is_leaf() {
            return vec![self];
        }
        self.children.iter().flat_map(|c| c.leaves()).collect()
    }
}

// ============================================================================
// MAIN VIEW STRUCT
// ============================================================================

/// The complete computed result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CrosstabView {
    /// All rows, subtotals included, before visibility filtering.
    pub rows: Vec<Row>,

    /// Column headers: row-dimension columns first, then the
    /// column-dimension tree (or flat metric columns).
    pub column_tree: Vec<ColumnHeaderNode>,

    /// Parent group key -> the one row kept visible when that group is
    /// collapsed.
    pub first_children: FxHashMap<String, String>,
}

impl CrosstabView {
    pub fn empty() -> Self {
        CrosstabView::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All leaf columns in render order.
    pub fn leaf_columns(&self) -> Vec<&ColumnHeaderNode> {
        self.column_tree.iter().flat_map(|n| n.leaves()).collect()
    }
}
