//! The calculation pipeline and the stateful table facade.
//!
//! `CrosstabCalculator` is a pure, stateless pass over one definition and
//! one record slice: partition into row/column/cell groups, sort, build
//! rows, inject subtotals, build the column-header tree. `CrosstabTable`
//! wraps it with the per-instance state a long-lived table needs: expand/
//! collapse flags, the result cache, and render-time visibility filtering
//! with row-span merging.
//!
//! PIPELINE STAGES (grouped/pivot):
//!   1. Partition records into row, column, and cell groups
//!   2. Sort row groups (external sort params, then dimension sorts)
//!      and column groups (dimension sorts)
//!   3. Build one data row per row group
//!   4. Compute subtotal rows and splice them in immutably
//!   5. Record first-child designations for collapsed-branch rendering
//!   6. Build the column-header tree

use std::cmp::Ordering;
use std::collections::hash_map::Entry;

use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::aggregate::MetricEvaluator;
use crate::cache::{fingerprint, ResultCache};
use crate::definition::{CrosstabDefinition, DimensionSpec, SortDirection, SubtotalPosition};
use crate::expand::ExpandState;
use crate::record::{
    ancestor_key, build_key, cell_key, key_depth, key_segments, resolve, CellContent, Record,
    CELL_KEY_SEPARATOR, EMPTY_LABEL, KEY_SEPARATOR,
};
use crate::view::{Cell, ColumnHeaderNode, CrosstabView, Row};

// ============================================================================
// MODE
// ============================================================================

/// The rendering mode, derived from which dimension lists are populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableMode {
    /// No dimensions: one row per record, fields shown raw.
    Detail,
    /// Row dimensions only: hierarchical grouping with flat metric columns.
    Grouped,
    /// Column dimensions present: full cross-tabulation.
    Pivot,
}

impl TableMode {
    pub fn of(definition: &CrosstabDefinition) -> TableMode {
        match (
            definition.row_dimensions.is_empty(),
            definition.column_dimensions.is_empty(),
        ) {
            (true, true) => TableMode::Detail,
            (_, true) => TableMode::Grouped,
            _ => TableMode::Pivot,
        }
    }
}

// ============================================================================
// CALCULATOR
// ============================================================================

/// Insertion-ordered record groups keyed by composite group key.
struct Partition {
    row_groups: Vec<(String, Vec<usize>)>,
    col_groups: Vec<(String, Vec<usize>)>,
    cell_groups: FxHashMap<String, Vec<usize>>,
}

/// One stateless computation over a definition and a record slice.
pub struct CrosstabCalculator<'a> {
    definition: &'a CrosstabDefinition,
    data: &'a [Record],
    evaluator: MetricEvaluator<'a>,
}

impl<'a> CrosstabCalculator<'a> {
    pub fn new(definition: &'a CrosstabDefinition, data: &'a [Record]) -> Self {
        CrosstabCalculator {
            definition,
            data,
            evaluator: MetricEvaluator::new(&definition.metrics),
        }
    }

    /// Runs the full pipeline and returns the computed view. A definition
    /// with no visible metrics has nothing to show and yields an empty
    /// view.
    pub fn calculate(&self) -> CrosstabView {
        if self.evaluator.is_empty() {
            return CrosstabView::empty();
        }
        debug!(
            "computing view over {} records, mode {:?}",
            self.data.len(),
            TableMode::of(self.definition)
        );
        match TableMode::of(self.definition) {
            TableMode::Detail => self.calculate_detail(),
            TableMode::Grouped | TableMode::Pivot => self.calculate_grouped(),
        }
    }

    fn calculate_detail(&self) -> CrosstabView {
        let mut order: Vec<usize> = (0..self.data.len()).collect();
        if !self.definition.sort_params.is_empty() {
            order.sort_by(|&a, &b| self.compare_by_params(&self.data[a], &self.data[b]));
        }

        let rows = order
            .into_iter()
            .map(|i| {
                let record = &self.data[i];
                let cells = self
                    .evaluator
                    .metrics()
                    .iter()
                    .map(|metric| {
                        let mut content = resolve(record, &metric.field);
                        if content.is_empty() {
                            content = CellContent::text(metric_placeholder(metric.empty_placeholder.as_deref()));
                        }
                        Cell::metric(content, Some(i))
                    })
                    .collect();
                Row::data(cells, i.to_string())
            })
            .collect();

        let column_tree = self
            .evaluator
            .metrics()
            .iter()
            .map(|m| ColumnHeaderNode::leaf(m.field.clone(), m.title()))
            .collect();

        CrosstabView {
            rows,
            column_tree,
            first_children: FxHashMap::default(),
        }
    }

    fn calculate_grouped(&self) -> CrosstabView {
        let mut partition = self.partition();
        self.sort_row_groups(&mut partition.row_groups);
        self.sort_col_groups(&mut partition.col_groups);

        let counts = level_group_counts(&partition.row_groups);

        let base: Vec<Row> = partition
            .row_groups
            .iter()
            .map(|(key, indices)| {
                self.build_data_row(key, indices, &partition, &counts)
            })
            .collect();

        let insertions = self.subtotal_insertions(&partition, &counts);
        let rows = apply_insertions(base, insertions);
        let first_children = register_first_children(&rows);
        let column_tree = self.build_column_tree(&partition.col_groups);

        CrosstabView {
            rows,
            column_tree,
            first_children,
        }
    }

    // ------------------------------------------------------------------------
    // Stage 1: partitioning
    // ------------------------------------------------------------------------

    fn partition(&self) -> Partition {
        let row_fields: Vec<&str> = self
            .definition
            .row_dimensions
            .iter()
            .map(|d| d.field.as_str())
            .collect();
        let col_fields: Vec<&str> = self
            .definition
            .column_dimensions
            .iter()
            .map(|d| d.field.as_str())
            .collect();

        let mut row_groups: Vec<(String, Vec<usize>)> = Vec::new();
        let mut row_index: FxHashMap<String, usize> = FxHashMap::default();
        let mut col_groups: Vec<(String, Vec<usize>)> = Vec::new();
        let mut col_index: FxHashMap<String, usize> = FxHashMap::default();
        let mut cell_groups: FxHashMap<String, Vec<usize>> = FxHashMap::default();

        for (i, record) in self.data.iter().enumerate() {
            let row_key = build_key(record, &row_fields);
            let col_key = build_key(record, &col_fields);

            let slot = *row_index.entry(row_key.clone()).or_insert_with(|| {
                row_groups.push((row_key.clone(), Vec::new()));
                row_groups.len() - 1
            });
            row_groups[slot].1.push(i);

            let slot = *col_index.entry(col_key.clone()).or_insert_with(|| {
                col_groups.push((col_key.clone(), Vec::new()));
                col_groups.len() - 1
            });
            col_groups[slot].1.push(i);

            cell_groups
                .entry(cell_key(&row_key, &col_key))
                .or_default()
                .push(i);
        }

        Partition {
            row_groups,
            col_groups,
            cell_groups,
        }
    }

    // ------------------------------------------------------------------------
    // Stage 2: sorting
    // ------------------------------------------------------------------------

    fn compare_by_params(&self, a: &Record, b: &Record) -> Ordering {
        for param in &self.definition.sort_params {
            let ord = resolve(a, &param.field).compare(&resolve(b, &param.field));
            let ord = directed(ord, param.direction);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    fn compare_by_dimensions(
        &self,
        a: &Record,
        b: &Record,
        dimensions: &[DimensionSpec],
    ) -> Ordering {
        for dim in dimensions {
            let direction = dim
                .sort
                .filter(|s| s.enabled)
                .map(|s| s.direction)
                .unwrap_or_default();
            let ord = resolve(a, &dim.field).compare(&resolve(b, &dim.field));
            let ord = directed(ord, direction);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// External sort params win; dimension sorts break the remaining ties
    /// level by level. Each group is represented by its first record.
    fn sort_row_groups(&self, groups: &mut [(String, Vec<usize>)]) {
        groups.sort_by(|a, b| {
            let ra = &self.data[a.1[0]];
            let rb = &self.data[b.1[0]];
            self.compare_by_params(ra, rb).then_with(|| {
                self.compare_by_dimensions(ra, rb, &self.definition.row_dimensions)
            })
        });
    }

    fn sort_col_groups(&self, groups: &mut [(String, Vec<usize>)]) {
        groups.sort_by(|a, b| {
            let ra = &self.data[a.1[0]];
            let rb = &self.data[b.1[0]];
            self.compare_by_dimensions(ra, rb, &self.definition.column_dimensions)
        });
    }

    // ------------------------------------------------------------------------
    // Stage 3: row construction
    // ------------------------------------------------------------------------

    fn build_data_row(
        &self,
        group_key: &str,
        indices: &[usize],
        partition: &Partition,
        counts: &FxHashMap<String, usize>,
    ) -> Row {
        let representative = indices[0];
        let record = &self.data[representative];
        let depth = self.definition.row_dimensions.len();
        let mut cells = Vec::with_capacity(depth + partition.col_groups.len());

        for (idx, dim) in self.definition.row_dimensions.iter().enumerate() {
            let level = idx + 1;
            let key = ancestor_key(group_key, level);
            let mut content = resolve(record, &dim.field);
            if content.is_empty() {
                content =
                    CellContent::text(dim.empty_placeholder.as_deref().unwrap_or(EMPTY_LABEL));
            }
            let expandable = level < depth
                && counts.get(&key).copied().unwrap_or(0) > 1;
            cells.push(
                Cell::dimension(content, level, key)
                    .with_expandable(expandable, true)
                    .with_source_row(Some(representative)),
            );
        }

        for (col_key, _) in &partition.col_groups {
            let cell_indices = partition
                .cell_groups
                .get(&cell_key(group_key, col_key))
                .map(Vec::as_slice);
            cells.extend(self.metric_cells(cell_indices));
        }

        Row::data(cells, group_key.to_string())
    }

    /// Metric cells for one (row group, column group) pair. An absent or
    /// empty record subset yields placeholder cells; a non-finite result
    /// yields the metric's placeholder, or 0 when none is configured.
    fn metric_cells(&self, indices: Option<&[usize]>) -> Vec<Cell> {
        let indices = indices.filter(|idx| !idx.is_empty());
        let indices = match indices {
            Some(idx) => idx,
            None => {
                return self
                    .evaluator
                    .metrics()
                    .iter()
                    .map(|m| {
                        let label = metric_placeholder(m.empty_placeholder.as_deref());
                        Cell::metric(CellContent::text(label), None)
                    })
                    .collect();
            }
        };

        let context = self.evaluator.evaluate(self.data, indices);
        let source = indices.first().copied();

        self.evaluator
            .metrics()
            .iter()
            .map(|metric| {
                let value = context.get(&metric.field).copied().unwrap_or(f64::NAN);
                let content = if value.is_finite() {
                    CellContent::number(value)
                } else if let Some(placeholder) = &metric.empty_placeholder {
                    CellContent::text(placeholder.clone())
                } else {
                    CellContent::number(0.0)
                };
                Cell::metric(content, source)
            })
            .collect()
    }

    // ------------------------------------------------------------------------
    // Stage 4: subtotals
    // ------------------------------------------------------------------------

    /// Computes subtotal rows and where to splice them into the base row
    /// list. A dimension at index L produces one row per distinct
    /// L-segment prefix key, aggregated over every row group sharing that
    /// prefix; index 0 covers everything and is the grand total. External
    /// sort params can interleave prefixes, so placement tracks the
    /// prefix's first and last occurrence rather than assuming the groups
    /// are contiguous.
    fn subtotal_insertions(
        &self,
        partition: &Partition,
        counts: &FxHashMap<String, usize>,
    ) -> Vec<Insertion> {
        let mut insertions = Vec::new();
        if partition.row_groups.is_empty() {
            return insertions;
        }

        let base_keys: FxHashSet<&str> = partition
            .row_groups
            .iter()
            .map(|(key, _)| key.as_str())
            .collect();
        let mut seen: FxHashSet<String> = FxHashSet::default();

        for (dim_index, dim) in self.definition.row_dimensions.iter().enumerate() {
            let label = match dim.subtotal_label() {
                Some(label) => label,
                None => continue,
            };
            let position = dim
                .subtotal
                .as_ref()
                .map(|s| s.position)
                .unwrap_or_default();

            // prefix -> (first slot, last slot, member slots)
            let mut order: Vec<String> = Vec::new();
            let mut blocks: FxHashMap<String, (usize, usize, Vec<usize>)> = FxHashMap::default();
            for (slot, (key, _)) in partition.row_groups.iter().enumerate() {
                match blocks.entry(ancestor_key(key, dim_index)) {
                    Entry::Occupied(mut occupied) => {
                        let block = occupied.get_mut();
                        block.1 = slot;
                        block.2.push(slot);
                    }
                    Entry::Vacant(vacant) => {
                        order.push(vacant.key().clone());
                        vacant.insert((slot, slot, vec![slot]));
                    }
                }
            }

            for prefix in order {
                let (first, last, members) = match blocks.remove(&prefix) {
                    Some(block) => block,
                    None => continue,
                };

                // A subtotal key colliding with a real group (or an
                // earlier subtotal) would break key-based lookups.
                let subtotal_key = child_key(&prefix, label);
                if base_keys.contains(subtotal_key.as_str()) || !seen.insert(subtotal_key.clone())
                {
                    continue;
                }

                let row = self.build_subtotal_row(
                    subtotal_key,
                    dim_index,
                    label,
                    &members,
                    partition,
                    counts,
                );
                let at = match position {
                    SubtotalPosition::Top => first,
                    SubtotalPosition::Bottom => last + 1,
                };
                insertions.push(Insertion {
                    at,
                    dim_index,
                    position,
                    row,
                });
            }
        }

        insertions
    }

    fn build_subtotal_row(
        &self,
        subtotal_key: String,
        dim_index: usize,
        label: &str,
        members: &[usize],
        partition: &Partition,
        counts: &FxHashMap<String, usize>,
    ) -> Row {
        let depth = self.definition.row_dimensions.len();
        let representative = partition.row_groups[members[0]].1[0];
        let record = &self.data[representative];
        let mut cells = Vec::with_capacity(depth + partition.col_groups.len());

        for (idx, dim) in self.definition.row_dimensions.iter().enumerate() {
            let level = idx + 1;
            // Prefix cells resolve from the representative record so a
            // numeric dimension value stays numeric, exactly as in the
            // group's data rows.
            let content = match idx.cmp(&dim_index) {
                Ordering::Less => {
                    let mut content = resolve(record, &dim.field);
                    if content.is_empty() {
                        content = CellContent::text(
                            dim.empty_placeholder.as_deref().unwrap_or(EMPTY_LABEL),
                        );
                    }
                    content
                }
                Ordering::Equal => CellContent::text(label),
                Ordering::Greater => CellContent::Empty,
            };
            let key = ancestor_key(&subtotal_key, level);
            // Prefix cells keep the group's toggle so a top-positioned
            // subtotal stays clickable while it represents a collapsed
            // branch.
            let expandable = idx < dim_index
                && level < depth
                && counts.get(&key).copied().unwrap_or(0) > 1;
            cells.push(
                Cell::dimension(content, level, key)
                    .with_expandable(expandable, true)
                    .with_source_row(Some(representative)),
            );
        }

        for (col_key, _) in &partition.col_groups {
            let mut union: Vec<usize> = Vec::new();
            for slot in members {
                let (group_key, _) = &partition.row_groups[*slot];
                if let Some(idx) = partition.cell_groups.get(&cell_key(group_key, col_key)) {
                    union.extend_from_slice(idx);
                }
            }
            cells.extend(self.metric_cells(Some(&union)));
        }

        Row::subtotal(cells, subtotal_key)
    }

    // ------------------------------------------------------------------------
    // Stage 6: column headers
    // ------------------------------------------------------------------------

    /// Row-dimension columns first, then either flat metric columns or the
    /// nested column-dimension tree with metric leaves under each path.
    fn build_column_tree(&self, col_groups: &[(String, Vec<usize>)]) -> Vec<ColumnHeaderNode> {
        let mut tree: Vec<ColumnHeaderNode> = self
            .definition
            .row_dimensions
            .iter()
            .map(|d| ColumnHeaderNode::leaf(d.field.clone(), d.title()))
            .collect();

        if self.definition.column_dimensions.is_empty() {
            for metric in self.evaluator.metrics() {
                tree.push(ColumnHeaderNode::leaf(metric.field.clone(), metric.title()));
            }
            return tree;
        }

        let mut pivot: Vec<ColumnHeaderNode> = Vec::new();
        for (col_key, _) in col_groups {
            let segments = key_segments(col_key);
            let mut children = &mut pivot;
            for (idx, segment) in segments.iter().enumerate() {
                let dim = &self.definition.column_dimensions[idx];
                let field = format!("{}__{}", dim.field, segment);
                let title = if *segment == EMPTY_LABEL {
                    dim.empty_placeholder.as_deref().unwrap_or(EMPTY_LABEL)
                } else {
                    segment
                };
                let pos = match children.iter().position(|n| n.field == field) {
                    Some(p) => p,
                    None => {
                        children.push(ColumnHeaderNode {
                            field,
                            title: title.to_string(),
                            children: Vec::new(),
                        });
                        children.len() - 1
                    }
                };
                children = &mut children[pos].children;
            }
            for metric in self.evaluator.metrics() {
                children.push(ColumnHeaderNode::leaf(
                    format!("{col_key}{CELL_KEY_SEPARATOR}{}", metric.field),
                    metric.title(),
                ));
            }
        }

        tree.extend(pivot);
        tree
    }
}

fn directed(ord: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ord,
        SortDirection::Desc => ord.reverse(),
    }
}

fn metric_placeholder(configured: Option<&str>) -> &str {
    configured.unwrap_or(EMPTY_LABEL)
}

/// Appends a segment to a group key.
fn child_key(parent: &str, segment: &str) -> String {
    if parent.len() == 1 {
        format!("{KEY_SEPARATOR}{segment}")
    } else {
        format!("{parent}{KEY_SEPARATOR}{segment}")
    }
}

/// Number of leaf row groups under each prefix key, used for the
/// expandable flag: a prefix covering a single leaf group has nothing to
/// collapse, even when intermediate levels fan out into a chain.
fn level_group_counts(row_groups: &[(String, Vec<usize>)]) -> FxHashMap<String, usize> {
    let mut map: FxHashMap<String, usize> = FxHashMap::default();
    for (key, _) in row_groups {
        let depth = key_depth(key);
        for level in 1..depth {
            *map.entry(ancestor_key(key, level)).or_insert(0) += 1;
        }
    }
    map
}

/// A subtotal row scheduled for insertion before base row `at`.
struct Insertion {
    at: usize,
    dim_index: usize,
    position: SubtotalPosition,
    row: Row,
}

/// Splices subtotal rows into the base row list without mutating it in
/// place. At a shared index, bottom subtotals of the block that just
/// ended come first (innermost level outward), then top subtotals of the
/// block about to start (outermost level inward).
fn apply_insertions(base: Vec<Row>, mut insertions: Vec<Insertion>) -> Vec<Row> {
    insertions.sort_by(|a, b| {
        let kind = |p: SubtotalPosition| match p {
            SubtotalPosition::Bottom => 0,
            SubtotalPosition::Top => 1,
        };
        a.at.cmp(&b.at)
            .then_with(|| kind(a.position).cmp(&kind(b.position)))
            .then_with(|| match a.position {
                SubtotalPosition::Bottom => b.dim_index.cmp(&a.dim_index),
                SubtotalPosition::Top => a.dim_index.cmp(&b.dim_index),
            })
    });

    let mut out = Vec::with_capacity(base.len() + insertions.len());
    let mut pending = insertions.into_iter().peekable();
    for (i, row) in base.into_iter().enumerate() {
        while matches!(pending.peek(), Some(ins) if ins.at == i) {
            if let Some(ins) = pending.next() {
                out.push(ins.row);
            }
        }
        out.push(row);
    }
    for ins in pending {
        out.push(ins.row);
    }
    out
}

/// The first row (in final order) below each prefix key. When a group is
/// collapsed, only this row stays visible so the branch remains reachable.
fn register_first_children(rows: &[Row]) -> FxHashMap<String, String> {
    let mut map: FxHashMap<String, String> = FxHashMap::default();
    for row in rows {
        let depth = key_depth(&row.row_key);
        for level in 1..depth {
            map.entry(ancestor_key(&row.row_key, level))
                .or_insert_with(|| row.row_key.clone());
        }
    }
    map
}

// ============================================================================
// TABLE FACADE
// ============================================================================

/// A long-lived table instance: a definition plus the mutable state that
/// outlives individual calculations.
///
/// Computed views are independent of expand state; collapsing is applied
/// at render time via `visible_rows`, so toggling never invalidates the
/// cache.
pub struct CrosstabTable {
    definition: CrosstabDefinition,
    expand: ExpandState,
    cache: ResultCache,
    last_fingerprint: Option<u64>,
}

impl CrosstabTable {
    pub fn new(definition: CrosstabDefinition) -> Self {
        CrosstabTable {
            definition,
            expand: ExpandState::new(),
            cache: ResultCache::default(),
            last_fingerprint: None,
        }
    }

    pub fn definition(&self) -> &CrosstabDefinition {
        &self.definition
    }

    /// Replaces the definition. The next `calculate` sees a new
    /// fingerprint and reseeds expand state.
    pub fn set_definition(&mut self, definition: CrosstabDefinition) {
        self.definition = definition;
    }

    pub fn expand_state(&self) -> &ExpandState {
        &self.expand
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Computes (or replays from cache) the view for the given records.
    pub fn calculate(&mut self, data: &[Record]) -> CrosstabView {
        let fp = fingerprint(&self.definition, data.len());
        if self.last_fingerprint != Some(fp) {
            self.expand.seed(data, &self.definition.row_dimensions);
            self.last_fingerprint = Some(fp);
        }

        if let Some(view) = self.cache.get(fp) {
            return view;
        }

        let view = CrosstabCalculator::new(&self.definition, data).calculate();
        self.cache.insert(fp, view.clone());
        view
    }

    /// Toggles a row group open/closed. Returns the new state, or `None`
    /// for a key that was never part of the data.
    pub fn toggle_expand(&mut self, level: usize, key: &str) -> Option<bool> {
        self.expand.toggle(level, key, &self.definition.row_dimensions)
    }

    /// Applies expand/collapse filtering to a computed view and merges
    /// repeated dimension cells into row spans over the visible rows.
    pub fn visible_rows(&self, view: &CrosstabView) -> Vec<Row> {
        let mut rows: Vec<Row> = view
            .rows
            .iter()
            .filter(|row| self.expand.is_row_visible(&row.row_key, &view.first_children))
            .cloned()
            .collect();

        for row in &mut rows {
            for cell in &mut row.cells {
                if cell.level > 0 && cell.expandable {
                    if let Some(key) = &cell.row_key {
                        cell.expanded = self.expand.is_expanded(cell.level, key).unwrap_or(true);
                    }
                }
            }
        }

        self.merge_row_spans(&mut rows);
        rows
    }

    /// Merges contiguous runs of equal-content cells in each dimension
    /// column. Runs are driven by the rendered content, so equal values
    /// merge even across parent-group boundaries, while the empty-value
    /// sentinel, placeholder text, and subtotal labels never merge. Spans
    /// are computed over the visible rows only, so collapsing reflows the
    /// merge.
    fn merge_row_spans(&self, rows: &mut [Row]) {
        for (col, dim) in self.definition.row_dimensions.iter().enumerate() {
            let mut start = 0;
            while start < rows.len() {
                let anchor = match rows[start].cells.get(col) {
                    Some(cell) if cell_merges(cell, dim) => cell.content.clone(),
                    _ => {
                        start += 1;
                        continue;
                    }
                };

                let mut end = start + 1;
                while end < rows.len() {
                    let same = rows[end]
                        .cells
                        .get(col)
                        .map(|c| cell_merges(c, dim) && c.content == anchor)
                        .unwrap_or(false);
                    if !same {
                        break;
                    }
                    end += 1;
                }

                if end - start > 1 {
                    rows[start].cells[col].row_span = (end - start) as u16;
                    for covered in &mut rows[start + 1..end] {
                        covered.cells[col].row_span = 0;
                    }
                }
                start = end;
            }
        }
    }
}

/// Whether a dimension cell participates in row-span merging. Empty
/// cells, the empty-value sentinel, the dimension's placeholder text, and
/// its subtotal label all stay unmerged.
fn cell_merges(cell: &Cell, dim: &DimensionSpec) -> bool {
    match &cell.content {
        CellContent::Empty => false,
        CellContent::Text(text) => {
            text != EMPTY_LABEL
                && dim.empty_placeholder.as_deref() != Some(text.as_str())
                && dim.subtotal_label() != Some(text.as_str())
        }
        _ => true,
    }
}
