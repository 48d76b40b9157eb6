//! Cross-tabulation engine.
//!
//! Turns a flat list of JSON records plus a declarative definition into a
//! renderable table: hierarchical row groups, an optional column-dimension
//! matrix, aggregated metric cells, subtotal rows, and a nested column
//! header tree. Expand/collapse and row-span merging are applied at render
//! time so computed views stay cacheable.
//!
//! Layers:
//! - `record`: Field resolution and group-key building over raw records
//! - `definition`: Serializable configuration (what the table IS)
//! - `expr`: Parsed arithmetic formulas for derived metrics
//! - `aggregate`: Aggregation functions and per-cell metric evaluation
//! - `view`: Renderable output (WHAT we display)
//! - `expand`: Per-instance expand/collapse state
//! - `cache`: Fingerprinted memoization of computed views
//! - `engine`: The calculation pipeline and the stateful table facade

pub mod aggregate;
pub mod cache;
pub mod definition;
pub mod engine;
pub mod expand;
pub mod expr;
pub mod record;
pub mod view;

pub use definition::*;
pub use engine::{CrosstabCalculator, CrosstabTable, TableMode};
pub use expand::ExpandState;
pub use record::{CellContent, Record};
pub use view::{Cell, ColumnHeaderNode, CrosstabView, Row, RowKind};
