//! Composite filter expressions over log entries
//!
//! A filter is a tree of [`ExpressionNode`]s: leaves are single
//! field/operator/value [`Criterion`] tests, internal nodes combine children
//! with AND/OR/NOT. Trees evaluate with short-circuit semantics, can be
//! reordered by the selectivity [`optimizer`] without changing results, and
//! persist through the versioned JSON [`schema`].
//!
//! # Examples
//!
//! ```text
//! Level Equals "ERROR"                             single criterion
//! (Level Equals "ERROR" AND Message Contains "timeout")
//! NOT (Component Equals "heartbeat")
//! ```

pub mod config;
pub mod criterion;
pub mod expression;
pub mod optimizer;
pub mod schema;

pub use config::{
    CURRENT_SCHEMA_VERSION, FilterConfiguration, FilterContent, FilterType, ValidationResult,
};
pub use criterion::{ComparisonOperator, Criterion};
pub use expression::{ExpressionNode, LogicalOperator, MAX_EXPRESSION_DEPTH};
pub use optimizer::{estimated_selectivity, optimize};
pub use schema::{deserialize, serialize};
