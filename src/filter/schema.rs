//! Persisted configuration schema
//!
//! The wire form is a UTF-8 JSON document with stable camelCase field names.
//! Operators travel as their canonical string names and are converted back
//! through `FromStr`, so an unknown operator fails deserialization loudly
//! instead of defaulting. Versions newer than this reader understands are
//! rejected; the one known legacy version (0.9, which predates the `type`
//! discriminator) is migrated by an explicit upgrade step.

use crate::errors::SchemaError;
use crate::filter::config::{CURRENT_SCHEMA_VERSION, FilterConfiguration, FilterType};
use crate::filter::criterion::{ComparisonOperator, Criterion};
use crate::filter::expression::{ExpressionNode, LogicalOperator, MAX_EXPRESSION_DEPTH};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The legacy version this reader can still migrate.
const LEGACY_SCHEMA_VERSION: &str = "0.9";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigurationDocument {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    schema_version: String,
    created_at: DateTime<Utc>,
    last_modified: DateTime<Utc>,
    /// Absent only in legacy (0.9) documents.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    filter_type: Option<String>,
    #[serde(default)]
    criteria: Vec<CriterionDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    complex_expression: Option<ExpressionDocument>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    is_system: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_by: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CriterionDocument {
    field: String,
    operator: String,
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value_to: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExpressionDocument {
    #[serde(rename = "type")]
    node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    criterion: Option<CriterionDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    children: Option<Vec<ExpressionDocument>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

/// Serialize a configuration to its persisted JSON form.
///
/// An invalid configuration is refused, keeping the round-trip law symmetric
/// with [`deserialize`].
pub fn serialize(config: &FilterConfiguration) -> Result<String, SchemaError> {
    let validation = config.validate();
    if !validation.is_valid() {
        return Err(SchemaError::Invalid(validation.errors.join("; ")));
    }
    let document = to_document(config);
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Deserialize a configuration from its persisted JSON form.
pub fn deserialize(text: &str) -> Result<FilterConfiguration, SchemaError> {
    let mut document: ConfigurationDocument = serde_json::from_str(text)?;

    let version = document.schema_version.trim();
    if version.is_empty() {
        return Err(SchemaError::EmptyVersion);
    }
    match version {
        CURRENT_SCHEMA_VERSION => {}
        LEGACY_SCHEMA_VERSION => document = migrate_v0_9(document),
        other => return Err(SchemaError::UnsupportedVersion(other.to_string())),
    }

    let config = from_document(document)?;
    let validation = config.validate();
    if !validation.is_valid() {
        return Err(SchemaError::Invalid(validation.errors.join("; ")));
    }
    Ok(config)
}

/// Upgrade a 0.9 document in place: infer the missing `type` discriminator
/// from which content field is populated and stamp the current version.
fn migrate_v0_9(mut document: ConfigurationDocument) -> ConfigurationDocument {
    if document.filter_type.is_none() {
        let inferred = if document.complex_expression.is_some() {
            FilterType::Complex
        } else {
            FilterType::Simple
        };
        document.filter_type = Some(inferred.canonical_name().to_string());
    }
    document.schema_version = CURRENT_SCHEMA_VERSION.to_string();
    document
}

fn to_document(config: &FilterConfiguration) -> ConfigurationDocument {
    ConfigurationDocument {
        name: config.name.clone(),
        description: config.description.clone(),
        schema_version: config.schema_version.clone(),
        created_at: config.created_at,
        last_modified: config.last_modified,
        filter_type: Some(config.filter_type.canonical_name().to_string()),
        criteria: config.criteria.iter().map(criterion_to_document).collect(),
        complex_expression: config.complex_expression.as_ref().map(expression_to_document),
        tags: config.tags.clone(),
        is_system: config.is_system,
        created_by: config.created_by.clone(),
    }
}

fn from_document(document: ConfigurationDocument) -> Result<FilterConfiguration, SchemaError> {
    let filter_type: FilterType = document
        .filter_type
        .as_deref()
        .ok_or_else(|| SchemaError::Invalid("configuration is missing its type".to_string()))?
        .parse()?;

    let criteria = document
        .criteria
        .into_iter()
        .map(criterion_from_document)
        .collect::<Result<Vec<_>, _>>()?;

    let complex_expression = document
        .complex_expression
        .map(|expression| expression_from_document(expression, 1))
        .transpose()?;

    if let Some(expression) = &complex_expression {
        expression.check_structure(MAX_EXPRESSION_DEPTH)?;
    }

    Ok(FilterConfiguration {
        name: document.name,
        description: document.description,
        schema_version: document.schema_version,
        created_at: document.created_at,
        last_modified: document.last_modified,
        filter_type,
        criteria,
        complex_expression,
        tags: document.tags,
        is_system: document.is_system,
        created_by: document.created_by,
    })
}

fn criterion_to_document(criterion: &Criterion) -> CriterionDocument {
    CriterionDocument {
        field: criterion.field.clone(),
        operator: criterion.operator.canonical_name().to_string(),
        value: criterion.value.clone(),
        value_to: criterion.value_to.clone(),
    }
}

fn criterion_from_document(document: CriterionDocument) -> Result<Criterion, SchemaError> {
    let operator: ComparisonOperator = document.operator.parse()?;
    let mut criterion = Criterion::new(document.field, operator, document.value);
    criterion.value_to = document.value_to;
    Ok(criterion)
}

fn expression_to_document(node: &ExpressionNode) -> ExpressionDocument {
    match node {
        ExpressionNode::Leaf(criterion) => ExpressionDocument {
            node_type: "Leaf".to_string(),
            criterion: Some(criterion_to_document(criterion)),
            operator: None,
            children: None,
            description: None,
        },
        ExpressionNode::Composite {
            operator,
            children,
            description,
        } => ExpressionDocument {
            node_type: "Composite".to_string(),
            criterion: None,
            operator: Some(operator.canonical_name().to_string()),
            children: Some(children.iter().map(expression_to_document).collect()),
            description: description.clone(),
        },
    }
}

fn expression_from_document(
    document: ExpressionDocument,
    depth: usize,
) -> Result<ExpressionNode, SchemaError> {
    use crate::errors::ExpressionError;

    if depth > MAX_EXPRESSION_DEPTH {
        return Err(SchemaError::Malformed(ExpressionError::DepthExceeded {
            max: MAX_EXPRESSION_DEPTH,
        }));
    }

    match document.node_type.as_str() {
        "Leaf" => {
            let criterion = document
                .criterion
                .ok_or(SchemaError::Malformed(ExpressionError::MissingCriterion))?;
            Ok(ExpressionNode::Leaf(criterion_from_document(criterion)?))
        }
        "Composite" => {
            let operator: LogicalOperator = document
                .operator
                .as_deref()
                .ok_or(SchemaError::Malformed(ExpressionError::MissingOperator))?
                .parse()?;
            let children = document
                .children
                .unwrap_or_default()
                .into_iter()
                .map(|child| expression_from_document(child, depth + 1))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ExpressionNode::Composite {
                operator,
                children,
                description: document.description,
            })
        }
        other => Err(SchemaError::Malformed(ExpressionError::UnknownNodeType(
            other.to_string(),
        ))),
    }
}
