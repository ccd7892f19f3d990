//! Composite log-filter expression engine
//!
//! Evaluates nested AND/OR/NOT filter trees over heterogeneous log entry
//! collections (generic application logs, IIS access logs, message-broker
//! logs). Filters are built from [`Criterion`] leaves, optionally reordered
//! by a selectivity optimizer so cheap predicates short-circuit first, and
//! executed sequentially or in parallel partitions with a cooperative
//! wall-clock budget. Configurations serialize to a stable, versioned JSON
//! document that round-trips exactly.
//!
//! ```
//! use log_filter_engine::{
//!     ComparisonOperator, Criterion, ExpressionNode, FilterConfiguration, FilterContext, execute,
//! };
//!
//! let filter = FilterConfiguration::complex(
//!     "core timeouts",
//!     ExpressionNode::and(vec![
//!         ExpressionNode::leaf(Criterion::new("Level", ComparisonOperator::Equals, "ERROR")),
//!         ExpressionNode::leaf(Criterion::new("Message", ComparisonOperator::Contains, "timeout")),
//!     ]),
//! );
//!
//! let entries: Vec<log_filter_engine::LogEntry> = Vec::new();
//! let (matched, info) = execute(&filter, &entries, &FilterContext::new()).unwrap();
//! assert!(matched.is_empty());
//! assert_eq!(info.items_processed, 0);
//! ```

pub mod engine;
pub mod entry;
pub mod errors;
pub mod filter;

pub use engine::{FilterContext, FilterExecutionInfo, execute, execute_expression};
pub use entry::{
    BrokerEntry, FieldKind, FieldSchema, FieldValue, FilterableEntry, IisEntry, LogEntry,
};
pub use errors::{ExpressionError, SchemaError};
pub use filter::{
    CURRENT_SCHEMA_VERSION, ComparisonOperator, Criterion, ExpressionNode, FilterConfiguration,
    FilterContent, FilterType, LogicalOperator, MAX_EXPRESSION_DEPTH, ValidationResult,
    deserialize, estimated_selectivity, optimize, serialize,
};
