//! Integration tests for the cross-tabulation pipeline.

use crosstab_engine::{
    AggregationKind, CellContent, CrosstabCalculator, CrosstabDefinition, CrosstabTable,
    DimensionSpec, MetricSpec, Record, RowKind, SortDirection, SortParam, SubtotalPosition,
    SubtotalSpec, TableMode,
};
use serde_json::json;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Regional sales data with a deliberately missing intersection
/// (Jiangsu sells no Furniture) and one record with a null city.
fn sales_data() -> Vec<Record> {
    json!([
        { "province": "Zhejiang", "city": "Hangzhou", "type": "Furniture", "amount": 120, "qty": 3 },
        { "province": "Zhejiang", "city": "Hangzhou", "type": "Office",    "amount": 80,  "qty": 2 },
        { "province": "Zhejiang", "city": "Ningbo",   "type": "Furniture", "amount": 60,  "qty": 1 },
        { "province": "Zhejiang", "city": "Ningbo",   "type": "Office",    "amount": 40,  "qty": 1 },
        { "province": "Jiangsu",  "city": "Nanjing",  "type": "Office",    "amount": 100, "qty": 5 },
        { "province": "Jiangsu",  "city": null,        "type": "Office",    "amount": 20,  "qty": 1 }
    ])
    .as_array()
    .unwrap()
    .iter()
    .map(|v| v.as_object().unwrap().clone())
    .collect()
}

fn dimension(field: &str) -> DimensionSpec {
    DimensionSpec::new(field)
}

fn sum_metric(field: &str) -> MetricSpec {
    MetricSpec::new(field, AggregationKind::Sum)
}

fn cell_number(view_cell: &crosstab_engine::Cell) -> f64 {
    match &view_cell.content {
        CellContent::Number(n) => n.as_f64(),
        other => panic!("expected a numeric cell, got {:?}", other),
    }
}

// ============================================================================
// MODE AND GROUPING TESTS
// ============================================================================

#[test]
fn test_detail_mode_preserves_record_order() {
    let def = CrosstabDefinition {
        metrics: vec![sum_metric("amount"), sum_metric("qty")],
        ..Default::default()
    };
    let data = sales_data();
    assert_eq!(TableMode::of(&def), TableMode::Detail);

    let view = CrosstabCalculator::new(&def, &data).calculate();
    assert_eq!(view.rows.len(), 6);
    assert_eq!(cell_number(&view.rows[0].cells[0]), 120.0);
    assert_eq!(cell_number(&view.rows[5].cells[1]), 1.0);
}

#[test]
fn test_grouped_mode_aggregates_per_province() {
    let def = CrosstabDefinition {
        row_dimensions: vec![dimension("province")],
        metrics: vec![sum_metric("amount")],
        ..Default::default()
    };
    let data = sales_data();
    let view = CrosstabCalculator::new(&def, &data).calculate();

    assert_eq!(view.rows.len(), 2);
    assert_eq!(view.rows[0].row_key, "|Jiangsu");
    assert_eq!(cell_number(&view.rows[0].cells[1]), 120.0);
    assert_eq!(view.rows[1].row_key, "|Zhejiang");
    assert_eq!(cell_number(&view.rows[1].cells[1]), 300.0);
}

#[test]
fn test_null_dimension_value_groups_under_placeholder() {
    let mut city = dimension("city");
    city.empty_placeholder = Some("(none)".to_string());
    let def = CrosstabDefinition {
        row_dimensions: vec![dimension("province"), city],
        metrics: vec![sum_metric("amount")],
        ..Default::default()
    };
    let data = sales_data();
    let view = CrosstabCalculator::new(&def, &data).calculate();

    // The null city sorts first within Jiangsu (Empty < Text) and keys
    // under the "-" sentinel.
    assert_eq!(view.rows[0].row_key, "|Jiangsu|-");
    assert_eq!(view.rows[0].cells[1].content, CellContent::text("(none)"));
    assert_eq!(cell_number(&view.rows[0].cells[2]), 20.0);
}

#[test]
fn test_pivot_mode_fills_missing_intersections() {
    let def = CrosstabDefinition {
        row_dimensions: vec![dimension("province")],
        column_dimensions: vec![dimension("type")],
        metrics: vec![sum_metric("amount")],
        ..Default::default()
    };
    let data = sales_data();
    let view = CrosstabCalculator::new(&def, &data).calculate();

    // Columns sort to Furniture, Office; Jiangsu has no Furniture sales.
    let jiangsu = &view.rows[0];
    assert_eq!(jiangsu.cells[1].content, CellContent::text("-"));
    assert_eq!(cell_number(&jiangsu.cells[2]), 120.0);

    let zhejiang = &view.rows[1];
    assert_eq!(cell_number(&zhejiang.cells[1]), 180.0);
    assert_eq!(cell_number(&zhejiang.cells[2]), 120.0);
}

#[test]
fn test_sort_params_take_precedence() {
    let def = CrosstabDefinition {
        row_dimensions: vec![dimension("province")],
        metrics: vec![sum_metric("amount")],
        sort_params: vec![SortParam {
            field: "amount".to_string(),
            direction: SortDirection::Desc,
        }],
        ..Default::default()
    };
    let data = sales_data();
    let view = CrosstabCalculator::new(&def, &data).calculate();

    // Zhejiang's first record (120) outranks Jiangsu's (100).
    assert_eq!(view.rows[0].row_key, "|Zhejiang");
}

// ============================================================================
// METRIC TESTS
// ============================================================================

#[test]
fn test_aggregation_mix_per_group() {
    let def = CrosstabDefinition {
        row_dimensions: vec![dimension("province")],
        metrics: vec![
            sum_metric("amount"),
            MetricSpec::new("qty", AggregationKind::Avg),
            MetricSpec::new("city", AggregationKind::DistinctCount),
        ],
        ..Default::default()
    };
    let data = sales_data();
    let view = CrosstabCalculator::new(&def, &data).calculate();

    let zhejiang = &view.rows[1];
    assert_eq!(cell_number(&zhejiang.cells[1]), 300.0);
    assert_eq!(cell_number(&zhejiang.cells[2]), 1.75);
    assert_eq!(cell_number(&zhejiang.cells[3]), 2.0);
}

#[test]
fn test_expression_metric_references_siblings() {
    let def = CrosstabDefinition {
        row_dimensions: vec![dimension("province")],
        metrics: vec![
            sum_metric("amount"),
            sum_metric("qty"),
            MetricSpec::expression("unit_price", "{amount} / {qty}"),
        ],
        ..Default::default()
    };
    let data = sales_data();
    let view = CrosstabCalculator::new(&def, &data).calculate();

    let jiangsu = &view.rows[0];
    assert_eq!(cell_number(&jiangsu.cells[1]), 120.0);
    assert_eq!(cell_number(&jiangsu.cells[2]), 6.0);
    assert_eq!(cell_number(&jiangsu.cells[3]), 20.0);
}

#[test]
fn test_invalid_formula_degrades_to_placeholder() {
    let mut broken = MetricSpec::expression("broken", "not a formula (");
    broken.empty_placeholder = Some("n/a".to_string());
    let def = CrosstabDefinition {
        row_dimensions: vec![dimension("province")],
        metrics: vec![sum_metric("amount"), broken],
        ..Default::default()
    };
    let data = sales_data();
    let view = CrosstabCalculator::new(&def, &data).calculate();

    assert_eq!(view.rows[0].cells[2].content, CellContent::text("n/a"));
    // The sibling metric is unaffected.
    assert_eq!(cell_number(&view.rows[0].cells[1]), 120.0);
}

#[test]
fn test_hidden_metric_is_not_rendered() {
    let mut hidden = sum_metric("qty");
    hidden.hidden = true;
    let def = CrosstabDefinition {
        row_dimensions: vec![dimension("province")],
        metrics: vec![sum_metric("amount"), hidden],
        ..Default::default()
    };
    let data = sales_data();
    let view = CrosstabCalculator::new(&def, &data).calculate();

    assert_eq!(view.rows[0].cells.len(), 2);
    assert!(view.leaf_columns().iter().all(|c| c.field != "qty"));
}

// ============================================================================
// SUBTOTAL TESTS
// ============================================================================

#[test]
fn test_grand_total_and_inner_subtotals() {
    let mut province = dimension("province");
    province.subtotal = Some(SubtotalSpec {
        enabled: true,
        label: Some("Grand Total".to_string()),
        position: SubtotalPosition::Bottom,
    });
    let mut city = dimension("city");
    city.subtotal = Some(SubtotalSpec {
        enabled: true,
        label: None,
        position: SubtotalPosition::Bottom,
    });
    let def = CrosstabDefinition {
        row_dimensions: vec![province, city],
        metrics: vec![sum_metric("amount")],
        ..Default::default()
    };
    let data = sales_data();
    let view = CrosstabCalculator::new(&def, &data).calculate();

    let keys: Vec<&str> = view.rows.iter().map(|r| r.row_key.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "|Jiangsu|-",
            "|Jiangsu|Nanjing",
            "|Jiangsu|Total",
            "|Zhejiang|Hangzhou",
            "|Zhejiang|Ningbo",
            "|Zhejiang|Total",
            "|Grand Total",
        ]
    );

    let jiangsu_total = &view.rows[2];
    assert_eq!(jiangsu_total.kind, RowKind::Subtotal);
    assert_eq!(cell_number(&jiangsu_total.cells[2]), 120.0);

    let grand = view.rows.last().unwrap();
    assert_eq!(grand.cells[0].content, CellContent::text("Grand Total"));
    assert_eq!(cell_number(&grand.cells[2]), 420.0);
}

#[test]
fn test_top_subtotal_precedes_its_block() {
    let mut city = dimension("city");
    city.subtotal = Some(SubtotalSpec {
        enabled: true,
        label: None,
        position: SubtotalPosition::Top,
    });
    let def = CrosstabDefinition {
        row_dimensions: vec![dimension("province"), city],
        metrics: vec![sum_metric("amount")],
        ..Default::default()
    };
    let data = sales_data();
    let view = CrosstabCalculator::new(&def, &data).calculate();

    let keys: Vec<&str> = view.rows.iter().map(|r| r.row_key.as_str()).collect();
    assert_eq!(keys[0], "|Jiangsu|Total");
    assert_eq!(keys[3], "|Zhejiang|Total");
}

#[test]
fn test_top_subtotal_is_collapsed_representative() {
    let mut city = dimension("city");
    city.subtotal = Some(SubtotalSpec {
        enabled: true,
        label: None,
        position: SubtotalPosition::Top,
    });
    let def = CrosstabDefinition {
        row_dimensions: vec![dimension("province"), city],
        metrics: vec![sum_metric("amount")],
        ..Default::default()
    };
    let data = sales_data();
    let mut table = CrosstabTable::new(def);
    let view = table.calculate(&data);

    table.toggle_expand(1, "|Zhejiang");
    let visible = table.visible_rows(&view);
    let keys: Vec<&str> = visible.iter().map(|r| r.row_key.as_str()).collect();

    // Only the Zhejiang subtotal survives as the branch representative.
    assert!(keys.contains(&"|Zhejiang|Total"));
    assert!(!keys.contains(&"|Zhejiang|Hangzhou"));
    assert!(!keys.contains(&"|Zhejiang|Ningbo"));
}

// ============================================================================
// EXPAND/COLLAPSE AND MERGING TESTS
// ============================================================================

#[test]
fn test_collapse_and_reexpand_round_trip() {
    let def = CrosstabDefinition {
        row_dimensions: vec![dimension("province"), dimension("city")],
        metrics: vec![sum_metric("amount")],
        ..Default::default()
    };
    let data = sales_data();
    let mut table = CrosstabTable::new(def);
    let view = table.calculate(&data);

    let all = table.visible_rows(&view).len();
    assert_eq!(table.toggle_expand(1, "|Zhejiang"), Some(false));
    assert!(table.visible_rows(&view).len() < all);

    assert_eq!(table.toggle_expand(1, "|Zhejiang"), Some(true));
    assert_eq!(table.visible_rows(&view).len(), all);
}

#[test]
fn test_toggle_unknown_key_is_ignored() {
    let def = CrosstabDefinition {
        row_dimensions: vec![dimension("province")],
        metrics: vec![sum_metric("amount")],
        ..Default::default()
    };
    let data = sales_data();
    let mut table = CrosstabTable::new(def);
    table.calculate(&data);

    assert_eq!(table.toggle_expand(1, "|Atlantis"), None);
}

#[test]
fn test_row_spans_reflow_after_collapse() {
    let def = CrosstabDefinition {
        row_dimensions: vec![dimension("province"), dimension("city")],
        metrics: vec![sum_metric("amount")],
        ..Default::default()
    };
    let data = sales_data();
    let mut table = CrosstabTable::new(def);
    let view = table.calculate(&data);

    let visible = table.visible_rows(&view);
    let zhejiang_anchor = visible
        .iter()
        .position(|r| r.row_key.starts_with("|Zhejiang"))
        .unwrap();
    assert_eq!(visible[zhejiang_anchor].cells[0].row_span, 2);

    // After collapsing, only one Zhejiang row remains and the span resets.
    table.toggle_expand(1, "|Zhejiang");
    let visible = table.visible_rows(&view);
    let zhejiang_anchor = visible
        .iter()
        .position(|r| r.row_key.starts_with("|Zhejiang"))
        .unwrap();
    assert_eq!(visible[zhejiang_anchor].cells[0].row_span, 1);
}

// ============================================================================
// COLUMN TREE TESTS
// ============================================================================

#[test]
fn test_nested_column_tree_with_metric_leaves() {
    let def = CrosstabDefinition {
        row_dimensions: vec![dimension("province")],
        column_dimensions: vec![dimension("type"), dimension("city")],
        metrics: vec![sum_metric("amount")],
        ..Default::default()
    };
    let data = sales_data();
    let view = CrosstabCalculator::new(&def, &data).calculate();

    assert_eq!(view.column_tree[0].field, "province");

    let furniture = &view.column_tree[1];
    assert_eq!(furniture.field, "type__Furniture");
    assert_eq!(furniture.title, "Furniture");
    assert!(furniture.children.iter().all(|c| c.field.starts_with("city__")));

    let hangzhou = &furniture.children[0];
    assert_eq!(hangzhou.children[0].field, "|Furniture|Hangzhou||amount");
    assert_eq!(hangzhou.children[0].title, "amount");
}

#[test]
fn test_flat_columns_without_column_dimensions() {
    let def = CrosstabDefinition {
        row_dimensions: vec![dimension("province")],
        metrics: vec![sum_metric("amount"), sum_metric("qty")],
        ..Default::default()
    };
    let data = sales_data();
    let view = CrosstabCalculator::new(&def, &data).calculate();

    let fields: Vec<&str> = view.column_tree.iter().map(|n| n.field.as_str()).collect();
    assert_eq!(fields, vec!["province", "amount", "qty"]);
}

// ============================================================================
// CACHE TESTS
// ============================================================================

#[test]
fn test_cached_view_survives_toggling() {
    let def = CrosstabDefinition {
        row_dimensions: vec![dimension("province"), dimension("city")],
        metrics: vec![sum_metric("amount")],
        ..Default::default()
    };
    let data = sales_data();
    let mut table = CrosstabTable::new(def);

    let first = table.calculate(&data);
    table.toggle_expand(1, "|Zhejiang");
    let second = table.calculate(&data);

    // Toggling is render-time state; the computed view is identical.
    assert_eq!(first, second);
}

#[test]
fn test_dataset_version_invalidates_cache() {
    let def = CrosstabDefinition {
        row_dimensions: vec![dimension("province")],
        metrics: vec![sum_metric("amount")],
        ..Default::default()
    };
    let mut data = sales_data();
    let mut table = CrosstabTable::new(def);
    let before = table.calculate(&data);

    // Same record count, different values: the caller signals the change
    // by bumping the dataset version.
    data[0].insert("amount".to_string(), json!(1000));
    let mut bumped = table.definition().clone();
    bumped.bump_dataset_version();
    table.set_definition(bumped);

    let after = table.calculate(&data);
    assert_ne!(before, after);
    assert_eq!(cell_number(&after.rows[1].cells[1]), 1180.0);
}
