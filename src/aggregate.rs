//! Aggregation functions and per-cell metric evaluation.
//!
//! All aggregations are tolerant of non-numeric input: sum-style kinds
//! coerce unparseable values to 0, mean-style kinds exclude them from the
//! sample set. Nothing here returns an error; the worst outcome is a
//! NaN/infinite value that cell construction replaces with a placeholder.

use log::warn;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::definition::{AggregationKind, MetricSpec};
use crate::expr::{parse_expression, Expr};
use crate::record::{resolve, CellContent, Record};

/// Applies a named aggregation over a sequence of resolved values.
///
/// `Expression` and `Unknown` both yield 0 here: expressions are computed
/// from sibling results by `MetricEvaluator`, and unknown kinds fall back
/// to a zero cell rather than an error.
pub fn aggregate(kind: AggregationKind, values: &[CellContent]) -> f64 {
    match kind {
        AggregationKind::Sum => values
            .iter()
            .map(|v| v.as_number().unwrap_or(0.0))
            .sum(),
        AggregationKind::Avg => {
            let numeric: Vec<f64> = values.iter().filter_map(|v| v.as_number()).collect();
            if numeric.is_empty() {
                0.0
            } else {
                numeric.iter().sum::<f64>() / numeric.len() as f64
            }
        }
        AggregationKind::Count => values.len() as f64,
        AggregationKind::DistinctCount => {
            let distinct: FxHashSet<&CellContent> = values.iter().collect();
            distinct.len() as f64
        }
        // Empty input yields an infinite sentinel, replaced with the
        // placeholder at cell construction.
        AggregationKind::Min => values
            .iter()
            .map(|v| v.as_number().unwrap_or(f64::INFINITY))
            .fold(f64::INFINITY, f64::min),
        AggregationKind::Max => values
            .iter()
            .map(|v| v.as_number().unwrap_or(f64::NEG_INFINITY))
            .fold(f64::NEG_INFINITY, f64::max),
        AggregationKind::Variance => population_variance(values),
        AggregationKind::Stddev => population_variance(values).sqrt(),
        AggregationKind::Expression | AggregationKind::Unknown => 0.0,
    }
}

fn population_variance(values: &[CellContent]) -> f64 {
    let numeric: Vec<f64> = values.iter().filter_map(|v| v.as_number()).collect();
    if numeric.is_empty() {
        return 0.0;
    }
    let mean = numeric.iter().sum::<f64>() / numeric.len() as f64;
    numeric.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / numeric.len() as f64
}

// ============================================================================
// PER-CELL METRIC EVALUATION
// ============================================================================

/// Computes all visible metrics for one cell's record subset.
///
/// Expression formulas are parsed once at construction; a formula that
/// fails to parse marks its metric as null (NaN in the context) for the
/// life of the evaluator.
pub struct MetricEvaluator<'a> {
    metrics: Vec<&'a MetricSpec>,
    /// Parsed formula per metric; `Some(None)` is a failed parse.
    programs: Vec<Option<Option<Expr>>>,
}

impl<'a> MetricEvaluator<'a> {
    /// Builds an evaluator over the non-hidden metrics of a definition.
    pub fn new(metrics: &'a [MetricSpec]) -> Self {
        let metrics: Vec<&MetricSpec> = metrics.iter().filter(|m| !m.hidden).collect();
        let programs = metrics
            .iter()
            .map(|metric| {
                if metric.aggregation != AggregationKind::Expression {
                    return None;
                }
                let formula = metric.expression.as_deref().unwrap_or("");
                Some(match parse_expression(formula) {
                    Ok(expr) => Some(expr),
                    Err(e) => {
                        warn!("metric '{}' has an invalid formula: {}", metric.field, e);
                        None
                    }
                })
            })
            .collect();
        MetricEvaluator { metrics, programs }
    }

    /// The visible metrics, in definition order.
    pub fn metrics(&self) -> &[&'a MetricSpec] {
        &self.metrics
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Computes every metric over the given record subset, base
    /// aggregations first so expression references always resolve.
    /// Null results (failed formulas) are carried as NaN.
    pub fn evaluate(&self, data: &[Record], indices: &[usize]) -> FxHashMap<String, f64> {
        let mut context: FxHashMap<String, f64> =
            FxHashMap::with_capacity_and_hasher(self.metrics.len(), Default::default());

        for metric in &self.metrics {
            if metric.aggregation == AggregationKind::Expression {
                continue;
            }
            let values: Vec<CellContent> = indices
                .iter()
                .map(|&i| resolve(&data[i], &metric.field))
                .collect();
            context.insert(metric.field.clone(), aggregate(metric.aggregation, &values));
        }

        for (metric, program) in self.metrics.iter().zip(&self.programs) {
            if let Some(parsed) = program {
                let result = match parsed {
                    Some(expr) => expr.evaluate(&context),
                    None => f64::NAN,
                };
                context.insert(metric.field.clone(), result);
            }
        }

        context
    }
}
