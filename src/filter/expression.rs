//! Expression trees: composite AND/OR/NOT nodes over leaf criteria

use crate::entry::FilterableEntry;
use crate::errors::ExpressionError;
use crate::filter::criterion::Criterion;
use std::fmt;
use std::str::FromStr;

/// Maximum nesting depth accepted from configuration input.
///
/// Deep trees from untrusted documents are rejected at validation and
/// deserialization time rather than risked during recursive evaluation.
pub const MAX_EXPRESSION_DEPTH: usize = 64;

/// Logical operators for composite expression nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
    Not,
}

impl LogicalOperator {
    /// Get the canonical name of this operator (the persisted form).
    pub fn canonical_name(&self) -> &'static str {
        match self {
            LogicalOperator::And => "And",
            LogicalOperator::Or => "Or",
            LogicalOperator::Not => "Not",
        }
    }
}

impl FromStr for LogicalOperator {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "and" => Ok(LogicalOperator::And),
            "or" => Ok(LogicalOperator::Or),
            "not" => Ok(LogicalOperator::Not),
            _ => Err(ExpressionError::UnknownLogicalOperator(s.to_string())),
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// A node in a filter expression tree.
///
/// Trees are strictly owned and finite: children are held by value, so no
/// cycles are possible. Depth is bounded by [`MAX_EXPRESSION_DEPTH`] for
/// trees arriving from configuration input.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionNode {
    Leaf(Criterion),
    Composite {
        operator: LogicalOperator,
        children: Vec<ExpressionNode>,
        description: Option<String>,
    },
}

impl ExpressionNode {
    pub fn leaf(criterion: Criterion) -> Self {
        ExpressionNode::Leaf(criterion)
    }

    pub fn and(children: Vec<ExpressionNode>) -> Self {
        ExpressionNode::Composite {
            operator: LogicalOperator::And,
            children,
            description: None,
        }
    }

    pub fn or(children: Vec<ExpressionNode>) -> Self {
        ExpressionNode::Composite {
            operator: LogicalOperator::Or,
            children,
            description: None,
        }
    }

    pub fn not(child: ExpressionNode) -> Self {
        ExpressionNode::Composite {
            operator: LogicalOperator::Not,
            children: vec![child],
            description: None,
        }
    }

    /// Evaluate this node against one entry with short-circuit semantics.
    ///
    /// `And` stops at the first false child, `Or` at the first true one.
    /// An empty `And` is vacuously true and an empty `Or` is false, matching
    /// the usual identities; structural validation rejects empty composites
    /// before they reach evaluation.
    pub fn matches<E: FilterableEntry>(&self, entry: &E) -> bool {
        match self {
            ExpressionNode::Leaf(criterion) => criterion.matches(entry),
            ExpressionNode::Composite {
                operator: LogicalOperator::And,
                children,
                ..
            } => children.iter().all(|child| child.matches(entry)),
            ExpressionNode::Composite {
                operator: LogicalOperator::Or,
                children,
                ..
            } => children.iter().any(|child| child.matches(entry)),
            ExpressionNode::Composite {
                operator: LogicalOperator::Not,
                children,
                ..
            } => children.first().map(|child| !child.matches(entry)).unwrap_or(false),
        }
    }

    /// Depth of the tree; a leaf counts as 1.
    pub fn depth(&self) -> usize {
        match self {
            ExpressionNode::Leaf(_) => 1,
            ExpressionNode::Composite { children, .. } => {
                1 + children.iter().map(ExpressionNode::depth).max().unwrap_or(0)
            }
        }
    }

    /// Check the structural invariants: `Not` takes exactly one child,
    /// composites are non-empty, and depth stays within `max_depth`.
    pub fn check_structure(&self, max_depth: usize) -> Result<(), ExpressionError> {
        self.check_structure_at(1, max_depth)
    }

    fn check_structure_at(&self, depth: usize, max_depth: usize) -> Result<(), ExpressionError> {
        if depth > max_depth {
            return Err(ExpressionError::DepthExceeded { max: max_depth });
        }
        if let ExpressionNode::Composite {
            operator, children, ..
        } = self
        {
            if children.is_empty() {
                return Err(ExpressionError::EmptyComposite);
            }
            if *operator == LogicalOperator::Not && children.len() != 1 {
                return Err(ExpressionError::NotArity(children.len()));
            }
            for child in children {
                child.check_structure_at(depth + 1, max_depth)?;
            }
        }
        Ok(())
    }

    /// Collect every leaf criterion in left-to-right, depth-first order.
    pub fn collect_criteria<'a>(&'a self, out: &mut Vec<&'a Criterion>) {
        match self {
            ExpressionNode::Leaf(criterion) => out.push(criterion),
            ExpressionNode::Composite { children, .. } => {
                for child in children {
                    child.collect_criteria(out);
                }
            }
        }
    }
}

impl fmt::Display for ExpressionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionNode::Leaf(criterion) => write!(f, "{criterion}"),
            ExpressionNode::Composite {
                operator: LogicalOperator::Not,
                children,
                ..
            } => match children.first() {
                Some(child) => write!(f, "NOT ({child})"),
                None => f.write_str("NOT ()"),
            },
            ExpressionNode::Composite {
                operator, children, ..
            } => {
                let joiner = match operator {
                    LogicalOperator::And => " AND ",
                    LogicalOperator::Or => " OR ",
                    LogicalOperator::Not => unreachable!(),
                };
                f.write_str("(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(joiner)?;
                    }
                    write!(f, "{child}")?;
                }
                f.write_str(")")
            }
        }
    }
}
