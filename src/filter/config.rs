//! Persisted filter configurations
//!
//! A configuration is the unit users save and reuse: either a flat list of
//! criteria (all combined with AND) or a full nested expression tree. Exactly
//! one of the two is authoritative, selected by [`FilterType`].

use crate::entry::FieldSchema;
use crate::errors::SchemaError;
use crate::filter::criterion::{ComparisonOperator, Criterion};
use crate::filter::expression::{ExpressionNode, MAX_EXPRESSION_DEPTH};
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Schema version written by this crate.
pub const CURRENT_SCHEMA_VERSION: &str = "1.0";

/// Discriminates which content field of a configuration is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    /// A flat criteria list, combined with AND.
    Simple,
    /// A nested expression tree.
    Complex,
}

impl FilterType {
    pub fn canonical_name(&self) -> &'static str {
        match self {
            FilterType::Simple => "Simple",
            FilterType::Complex => "Complex",
        }
    }
}

impl FromStr for FilterType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simple" => Ok(FilterType::Simple),
            "complex" => Ok(FilterType::Complex),
            _ => Err(SchemaError::Invalid(format!(
                "unknown filter type '{s}', expected 'Simple' or 'Complex'"
            ))),
        }
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// Outcome of validating a configuration.
///
/// Errors make the configuration unusable; warnings flag criteria that will
/// silently evaluate to false at run time (bad regex, unknown field).
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// A named, persistable filter definition.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfiguration {
    pub name: String,
    pub description: Option<String>,
    pub schema_version: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub filter_type: FilterType,
    /// Authoritative content when `filter_type` is `Simple`.
    pub criteria: Vec<Criterion>,
    /// Authoritative content when `filter_type` is `Complex`.
    pub complex_expression: Option<ExpressionNode>,
    pub tags: Vec<String>,
    pub is_system: bool,
    pub created_by: Option<String>,
}

impl FilterConfiguration {
    /// Create a simple configuration from a flat criteria list.
    pub fn simple(name: impl Into<String>, criteria: Vec<Criterion>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            description: None,
            schema_version: CURRENT_SCHEMA_VERSION.to_string(),
            created_at: now,
            last_modified: now,
            filter_type: FilterType::Simple,
            criteria,
            complex_expression: None,
            tags: Vec::new(),
            is_system: false,
            created_by: None,
        }
    }

    /// Create a complex configuration from an expression tree.
    pub fn complex(name: impl Into<String>, expression: ExpressionNode) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            description: None,
            schema_version: CURRENT_SCHEMA_VERSION.to_string(),
            created_at: now,
            last_modified: now,
            filter_type: FilterType::Complex,
            criteria: Vec::new(),
            complex_expression: Some(expression),
            tags: Vec::new(),
            is_system: false,
            created_by: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_created_by(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = Some(created_by.into());
        self
    }

    /// Replace the name, stamping `last_modified`.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.last_modified = Utc::now();
    }

    /// Replace the authoritative content wholesale, stamping `last_modified`.
    pub fn replace_content(&mut self, content: FilterContent) {
        match content {
            FilterContent::Simple(criteria) => {
                self.filter_type = FilterType::Simple;
                self.criteria = criteria;
                self.complex_expression = None;
            }
            FilterContent::Complex(expression) => {
                self.filter_type = FilterType::Complex;
                self.criteria = Vec::new();
                self.complex_expression = Some(expression);
            }
        }
        self.last_modified = Utc::now();
    }

    /// Flatten to the list of leaf criteria, depth-first left-to-right.
    pub fn effective_criteria(&self) -> Vec<&Criterion> {
        match self.filter_type {
            FilterType::Simple => self.criteria.iter().collect(),
            FilterType::Complex => {
                let mut out = Vec::new();
                if let Some(expression) = &self.complex_expression {
                    expression.collect_criteria(&mut out);
                }
                out
            }
        }
    }

    /// Build the evaluable expression tree for this configuration.
    ///
    /// A simple configuration becomes an AND over its criteria.
    pub fn build_expression(&self) -> Result<ExpressionNode, SchemaError> {
        match self.filter_type {
            FilterType::Simple => {
                if self.criteria.is_empty() {
                    return Err(SchemaError::Invalid(
                        "simple configuration has no criteria".to_string(),
                    ));
                }
                if self.criteria.len() == 1 {
                    Ok(ExpressionNode::leaf(self.criteria[0].clone()))
                } else {
                    Ok(ExpressionNode::and(
                        self.criteria.iter().cloned().map(ExpressionNode::leaf).collect(),
                    ))
                }
            }
            FilterType::Complex => self
                .complex_expression
                .clone()
                .ok_or_else(|| {
                    SchemaError::Invalid("complex configuration has no expression".to_string())
                }),
        }
    }

    /// Human-readable description of what this filter matches.
    pub fn filter_description(&self) -> String {
        match self.build_expression() {
            Ok(expression) => format!("{}: {}", self.name, expression),
            Err(_) => self.name.clone(),
        }
    }

    /// Check the structural invariants of this configuration.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.name.trim().is_empty() {
            result.error("configuration name must not be empty");
        }
        if self.schema_version.trim().is_empty() {
            result.error("schema version must not be empty");
        } else if self.schema_version != CURRENT_SCHEMA_VERSION {
            result.error(format!(
                "unrecognized schema version '{}'",
                self.schema_version
            ));
        }

        match self.filter_type {
            FilterType::Simple => {
                if self.criteria.is_empty() {
                    result.error("simple configuration must have at least one criterion");
                }
            }
            FilterType::Complex => match &self.complex_expression {
                None => result.error("complex configuration must have an expression"),
                Some(expression) => {
                    if let Err(err) = expression.check_structure(MAX_EXPRESSION_DEPTH) {
                        result.error(err.to_string());
                    }
                }
            },
        }

        for criterion in self.effective_criteria() {
            if criterion.field.trim().is_empty() {
                result.error("criterion field name must not be empty");
            }
            if criterion.operator == ComparisonOperator::Between {
                match criterion.value_to.as_deref() {
                    None => result.error(format!(
                        "Between criterion on '{}' is missing its upper bound",
                        criterion.field
                    )),
                    Some(high) => {
                        if let (Ok(low), Ok(high)) =
                            (criterion.value.trim().parse::<f64>(), high.trim().parse::<f64>())
                            && low > high
                        {
                            result.warning(format!(
                                "Between bounds on '{}' are inverted ({} > {}); it will never match",
                                criterion.field, low, high
                            ));
                        }
                    }
                }
            }
            if !criterion.regex_compiles() {
                result.warning(format!(
                    "regex pattern '{}' on '{}' does not compile; it will never match",
                    criterion.value, criterion.field
                ));
            }
        }

        result
    }

    /// Validate against a concrete entry schema, additionally warning about
    /// unknown field names and operator/field-kind mismatches.
    pub fn validate_with_schema(&self, schema: &FieldSchema) -> ValidationResult {
        let mut result = self.validate();

        for criterion in self.effective_criteria() {
            match schema.kind_of(&criterion.field) {
                None => result.warning(format!(
                    "unknown field '{}'; the criterion will never match",
                    criterion.field
                )),
                Some(kind) => {
                    if criterion.operator.requires_ordered_field() && !kind.is_ordered() {
                        result.warning(format!(
                            "operator {} needs a numeric or temporal field, but '{}' is text",
                            criterion.operator, criterion.field
                        ));
                    }
                }
            }
        }

        result
    }
}

/// Replacement content for [`FilterConfiguration::replace_content`].
#[derive(Debug, Clone)]
pub enum FilterContent {
    Simple(Vec<Criterion>),
    Complex(ExpressionNode),
}
