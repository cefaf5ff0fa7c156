//! Mapping of backend validation rejections onto draft fields
//!
//! A 400 body is keyed by backend field name. Each value may be a string, a
//! list, or a nested object (per-row errors keyed by field or index). Every
//! top-level entry collapses into one readable message.

use crate::models::ValidationErrorMap;
use serde_json::Value;

/// Backend error value as a tagged tree
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorNode {
    Text(String),
    List(Vec<ErrorNode>),
    Map(Vec<(String, ErrorNode)>),
    /// Numbers, booleans and nulls carry no usable message
    Unsupported,
}

impl From<&Value> for ErrorNode {
    fn from(value: &Value) -> Self {
        match value {
            Value::String(s) => ErrorNode::Text(s.clone()),
            Value::Array(items) => ErrorNode::List(items.iter().map(ErrorNode::from).collect()),
            Value::Object(entries) => ErrorNode::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), ErrorNode::from(v)))
                    .collect(),
            ),
            _ => ErrorNode::Unsupported,
        }
    }
}

impl ErrorNode {
    /// Collapse the tree into one message
    pub fn flatten(&self) -> String {
        match self {
            ErrorNode::Text(text) => text.clone(),
            ErrorNode::List(items) => items
                .iter()
                .map(ErrorNode::flatten)
                .collect::<Vec<_>>()
                .join(", "),
            ErrorNode::Map(entries) => entries
                .iter()
                .map(|(key, node)| {
                    if is_index(key) {
                        node.flatten()
                    } else {
                        format!("{}: {}", field_label(key), node.flatten())
                    }
                })
                .collect::<Vec<_>>()
                .join("; "),
            ErrorNode::Unsupported => "Invalid error format".to_string(),
        }
    }
}

fn is_index(key: &str) -> bool {
    let key = key.trim();
    key.is_empty() || key.parse::<f64>().is_ok_and(|n| !n.is_nan())
}

/// `academic_histories` → `Academic Histories`
pub fn field_label(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut label = String::with_capacity(spaced.len());
    let mut at_word_start = true;
    for c in spaced.chars() {
        let is_word = c.is_alphanumeric();
        if is_word && at_word_start {
            label.extend(c.to_uppercase());
        } else {
            label.push(c);
        }
        at_word_start = !is_word;
    }
    label
}

/// Backend field name to draft field key; unknown names pass through
pub fn draft_key(backend_key: &str) -> &str {
    match backend_key {
        "full_name" => "fullName",
        "father_name" => "fatherName",
        "grandfather_name" => "grandfatherName",
        "date_of_birth" => "birthDate",
        "country_of_residence" => "nationality",
        "email" => "email",
        "academic_histories" => "academicRecords",
        "university_choices" => "universityPrograms",
        "documents" => "documentUploads",
        other => other,
    }
}

/// One line of the aggregated error notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMessage {
    pub field_label: String,
    pub message: String,
}

impl std::fmt::Display for FieldMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field_label, self.message)
    }
}

/// A mapped validation rejection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rejection {
    pub errors: ValidationErrorMap,
    /// In response-body order
    pub messages: Vec<FieldMessage>,
}

/// Map a 400 body onto draft fields.
///
/// Bodies that are not objects (a bare list or string) are reported under
/// `non_field_errors`, which no step owns.
pub fn map_rejection(body: &Value) -> Rejection {
    let entries: Vec<(String, ErrorNode)> = match body {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| (k.clone(), ErrorNode::from(v)))
            .collect(),
        other => vec![("non_field_errors".to_string(), ErrorNode::from(other))],
    };

    let mut rejection = Rejection::default();
    for (backend_key, node) in entries {
        let message = node.flatten();
        rejection.errors.insert(draft_key(&backend_key), message.clone());
        rejection.messages.push(FieldMessage {
            field_label: field_label(&backend_key),
            message,
        });
    }
    rejection
}
