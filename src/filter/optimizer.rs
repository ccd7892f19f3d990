//! Selectivity-driven child reordering
//!
//! A pure ordering transform over the commutative operators: `And` children
//! are sorted so the least-likely-to-match predicate runs first (maximizing
//! early-false short-circuit), `Or` children so the most-likely-to-match
//! runs first (early true). Truth-table semantics are never changed.
//!
//! Selectivity here means the fraction of entries expected to pass a
//! predicate. With no runtime statistics available, estimates are static
//! per-operator weights: exact matches are assumed more selective than
//! substring or regex scans, with range comparisons in between.

use crate::filter::criterion::ComparisonOperator;
use crate::filter::expression::{ExpressionNode, LogicalOperator};
use std::cmp::Ordering;

/// Estimated pass-rate for a single leaf operator.
fn operator_selectivity(operator: ComparisonOperator) -> f64 {
    match operator {
        ComparisonOperator::Equals => 0.10,
        ComparisonOperator::StartsWith | ComparisonOperator::EndsWith => 0.15,
        ComparisonOperator::Between => 0.25,
        ComparisonOperator::GreaterThan
        | ComparisonOperator::LessThan
        | ComparisonOperator::GreaterThanOrEqual
        | ComparisonOperator::LessThanOrEqual => 0.30,
        ComparisonOperator::Contains => 0.40,
        ComparisonOperator::Regex => 0.50,
        ComparisonOperator::NotContains => 0.60,
        ComparisonOperator::NotEquals => 0.90,
    }
}

/// Estimate the fraction of entries expected to satisfy `node`.
///
/// Composites combine children under an independence assumption: `And`
/// multiplies, `Or` uses inclusion-exclusion, `Not` complements.
pub fn estimated_selectivity(node: &ExpressionNode) -> f64 {
    match node {
        ExpressionNode::Leaf(criterion) => operator_selectivity(criterion.operator),
        ExpressionNode::Composite {
            operator: LogicalOperator::And,
            children,
            ..
        } => children
            .iter()
            .map(estimated_selectivity)
            .product::<f64>()
            .clamp(0.0, 1.0),
        ExpressionNode::Composite {
            operator: LogicalOperator::Or,
            children,
            ..
        } => {
            let miss_all: f64 = children
                .iter()
                .map(|child| 1.0 - estimated_selectivity(child))
                .product();
            (1.0 - miss_all).clamp(0.0, 1.0)
        }
        ExpressionNode::Composite {
            operator: LogicalOperator::Not,
            children,
            ..
        } => children
            .first()
            .map(|child| (1.0 - estimated_selectivity(child)).clamp(0.0, 1.0))
            .unwrap_or(1.0),
    }
}

/// Return a copy of `node` with children of commutative operators reordered
/// by estimated selectivity. The sort is stable, so equal estimates keep the
/// author's order and the transform is deterministic and idempotent.
pub fn optimize(node: &ExpressionNode) -> ExpressionNode {
    match node {
        ExpressionNode::Leaf(_) => node.clone(),
        ExpressionNode::Composite {
            operator,
            children,
            description,
        } => {
            let mut optimized: Vec<(f64, ExpressionNode)> = children
                .iter()
                .map(|child| {
                    let child = optimize(child);
                    (estimated_selectivity(&child), child)
                })
                .collect();

            match operator {
                // Least likely to pass first: earliest false short-circuit.
                LogicalOperator::And => {
                    optimized.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
                }
                // Most likely to pass first: earliest true short-circuit.
                LogicalOperator::Or => {
                    optimized.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
                }
                LogicalOperator::Not => {}
            }

            ExpressionNode::Composite {
                operator: *operator,
                children: optimized.into_iter().map(|(_, child)| child).collect(),
                description: description.clone(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::criterion::Criterion;

    fn leaf(field: &str, operator: ComparisonOperator) -> ExpressionNode {
        ExpressionNode::leaf(Criterion::new(field, operator, "x"))
    }

    #[test]
    fn and_puts_most_selective_first() {
        let node = ExpressionNode::and(vec![
            leaf("Message", ComparisonOperator::Contains),
            leaf("Message", ComparisonOperator::Regex),
            leaf("Level", ComparisonOperator::Equals),
        ]);
        let ExpressionNode::Composite { children, .. } = optimize(&node) else {
            panic!("expected composite");
        };
        let ops: Vec<ComparisonOperator> = children
            .iter()
            .map(|c| match c {
                ExpressionNode::Leaf(criterion) => criterion.operator,
                _ => panic!("expected leaf"),
            })
            .collect();
        assert_eq!(
            ops,
            vec![
                ComparisonOperator::Equals,
                ComparisonOperator::Contains,
                ComparisonOperator::Regex,
            ]
        );
    }

    #[test]
    fn or_puts_least_selective_first() {
        let node = ExpressionNode::or(vec![
            leaf("Level", ComparisonOperator::Equals),
            leaf("Message", ComparisonOperator::NotEquals),
            leaf("Message", ComparisonOperator::Contains),
        ]);
        let ExpressionNode::Composite { children, .. } = optimize(&node) else {
            panic!("expected composite");
        };
        let ops: Vec<ComparisonOperator> = children
            .iter()
            .map(|c| match c {
                ExpressionNode::Leaf(criterion) => criterion.operator,
                _ => panic!("expected leaf"),
            })
            .collect();
        assert_eq!(
            ops,
            vec![
                ComparisonOperator::NotEquals,
                ComparisonOperator::Contains,
                ComparisonOperator::Equals,
            ]
        );
    }

    #[test]
    fn ties_preserve_original_order() {
        let first = ExpressionNode::leaf(Criterion::new("Level", ComparisonOperator::Equals, "a"));
        let second = ExpressionNode::leaf(Criterion::new("Level", ComparisonOperator::Equals, "b"));
        let node = ExpressionNode::and(vec![first.clone(), second.clone()]);
        let ExpressionNode::Composite { children, .. } = optimize(&node) else {
            panic!("expected composite");
        };
        assert_eq!(children, vec![first, second]);
    }

    #[test]
    fn optimization_is_idempotent() {
        let node = ExpressionNode::and(vec![
            leaf("Message", ComparisonOperator::Regex),
            ExpressionNode::or(vec![
                leaf("Level", ComparisonOperator::Equals),
                leaf("Message", ComparisonOperator::Contains),
            ]),
            leaf("Level", ComparisonOperator::Equals),
        ]);
        let once = optimize(&node);
        let twice = optimize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn not_child_is_untouched_in_position() {
        let inner = ExpressionNode::and(vec![
            leaf("Message", ComparisonOperator::Contains),
            leaf("Level", ComparisonOperator::Equals),
        ]);
        let node = ExpressionNode::not(inner);
        let ExpressionNode::Composite {
            operator, children, ..
        } = optimize(&node)
        else {
            panic!("expected composite");
        };
        assert_eq!(operator, LogicalOperator::Not);
        assert_eq!(children.len(), 1);
        // The single child is still optimized recursively.
        let ExpressionNode::Composite { children: inner, .. } = &children[0] else {
            panic!("expected composite child");
        };
        assert!(matches!(
            &inner[0],
            ExpressionNode::Leaf(c) if c.operator == ComparisonOperator::Equals
        ));
    }

    #[test]
    fn estimates_stay_in_unit_interval() {
        let node = ExpressionNode::or(vec![
            leaf("A", ComparisonOperator::NotEquals),
            leaf("B", ComparisonOperator::NotEquals),
            ExpressionNode::not(leaf("C", ComparisonOperator::Equals)),
        ]);
        let estimate = estimated_selectivity(&node);
        assert!((0.0..=1.0).contains(&estimate));
    }
}
