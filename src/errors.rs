use thiserror::Error;

/// Structural problems in a filter expression tree.
///
/// These are fail-fast errors: a malformed tree is rejected before any log
/// entry is evaluated. Per-entry anomalies (unknown field, regex that does
/// not compile) are not errors at all; the affected criterion degrades to a
/// non-match instead.
#[derive(Debug, Error)]
pub enum ExpressionError {
    #[error("Unknown logical operator: '{0}'. Valid operators are: And, Or, Not")]
    UnknownLogicalOperator(String),

    #[error("Unknown comparison operator: '{0}'")]
    UnknownComparisonOperator(String),

    #[error("A Not expression must have exactly one child, found {0}")]
    NotArity(usize),

    #[error("Composite expression has no children")]
    EmptyComposite,

    #[error("Expression tree exceeds the maximum depth of {max}")]
    DepthExceeded { max: usize },

    #[error("Expression document node has type '{0}', expected 'Leaf' or 'Composite'")]
    UnknownNodeType(String),

    #[error("Leaf expression node is missing its criterion")]
    MissingCriterion,

    #[error("Composite expression node is missing its operator")]
    MissingOperator,
}

/// Errors raised while reading or writing a persisted filter configuration.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Configuration document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration schema version is empty")]
    EmptyVersion,

    #[error("Unsupported configuration schema version '{0}'")]
    UnsupportedVersion(String),

    #[error("Malformed filter expression: {0}")]
    Malformed(#[from] ExpressionError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
