//! Request validation.
//!
//! Request bodies arrive as loosely-typed JSON. They are checked against a
//! declarative [`Schema`] and either turned into typed values or rejected
//! with the first [`Violation`] found. Fields are checked in schema order,
//! then unknown keys in lexical order, so the reported violation is
//! deterministic.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::domain::{HttpMethod, TaskChanges, TaskId, TaskUri};

// =============================================================================
// Violation
// =============================================================================

/// What was wrong with a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// Path identifier is not a UUID.
    InvalidUuid,
    /// Body is not a JSON object.
    NotAnObject,
    /// Required field is missing.
    Required,
    /// Field is present but not a string.
    NotAString,
    /// Field is an empty string.
    Empty,
    /// Field is not a valid URI.
    InvalidUri,
    /// Field is not one of the allowed values.
    NotOneOf(&'static [&'static str]),
    /// Field is not part of the schema.
    NotAllowed,
}

/// The first constraint a request broke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Name of the offending field (`"value"` for the body itself).
    pub field: String,
    pub kind: ViolationKind,
}

impl Violation {
    /// Creates a new violation.
    #[must_use]
    pub fn new(field: impl Into<String>, kind: ViolationKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }

    /// Returns the client-facing message.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let field = &self.field;
        match self.kind {
            ViolationKind::InvalidUuid => write!(formatter, "\"{field}\" is not a valid uuid"),
            ViolationKind::NotAnObject => write!(formatter, "\"{field}\" must be of type object"),
            ViolationKind::Required => write!(formatter, "\"{field}\" is required"),
            ViolationKind::NotAString => write!(formatter, "\"{field}\" must be a string"),
            ViolationKind::Empty => write!(formatter, "\"{field}\" is not allowed to be empty"),
            ViolationKind::InvalidUri => write!(formatter, "\"{field}\" must be a valid uri"),
            ViolationKind::NotOneOf(choices) => write!(
                formatter,
                "\"{field}\" must be one of [{}]",
                choices.join(", ")
            ),
            ViolationKind::NotAllowed => write!(formatter, "\"{field}\" is not allowed"),
        }
    }
}

impl std::error::Error for Violation {}

// =============================================================================
// Schema
// =============================================================================

/// Constraint applied to a single field's value.
#[derive(Debug, Clone, Copy)]
pub enum FieldRule {
    /// Non-empty string.
    Text,
    /// Non-empty string holding an absolute URI.
    Uri,
    /// String equal to one of the listed values (case-sensitive).
    OneOf(&'static [&'static str]),
}

/// A validated field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Uri(TaskUri),
    /// Index into the `OneOf` choice list.
    Choice(usize),
}

impl FieldRule {
    fn check(self, name: &str, value: &Value) -> Result<FieldValue, Violation> {
        match self {
            // Any value outside the list, whatever its type, is reported
            // against the list.
            Self::OneOf(choices) => value
                .as_str()
                .and_then(|text| choices.iter().position(|choice| *choice == text))
                .map(FieldValue::Choice)
                .ok_or_else(|| Violation::new(name, ViolationKind::NotOneOf(choices))),
            Self::Text => match value {
                Value::String(text) if text.is_empty() => {
                    Err(Violation::new(name, ViolationKind::Empty))
                }
                Value::String(text) => Ok(FieldValue::Text(text.clone())),
                _ => Err(Violation::new(name, ViolationKind::NotAString)),
            },
            Self::Uri => match value {
                Value::String(text) if text.is_empty() => {
                    Err(Violation::new(name, ViolationKind::Empty))
                }
                Value::String(text) => TaskUri::parse(text.as_str())
                    .map(FieldValue::Uri)
                    .map_err(|_| Violation::new(name, ViolationKind::InvalidUri)),
                _ => Err(Violation::new(name, ViolationKind::NotAString)),
            },
        }
    }
}

/// A named field with its rule.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub rule: FieldRule,
    pub required: bool,
}

impl FieldSpec {
    /// A field that may be omitted.
    #[must_use]
    pub const fn optional(name: &'static str, rule: FieldRule) -> Self {
        Self {
            name,
            rule,
            required: false,
        }
    }

    /// A field that must be present.
    #[must_use]
    pub const fn required(name: &'static str, rule: FieldRule) -> Self {
        Self {
            name,
            rule,
            required: true,
        }
    }
}

/// Declarative object schema. Keys outside the schema are rejected.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    fields: &'static [FieldSpec],
}

impl Schema {
    /// Creates a schema from its fields, in checking order.
    #[must_use]
    pub const fn new(fields: &'static [FieldSpec]) -> Self {
        Self { fields }
    }

    /// Checks `value` and returns the validated fields that were present.
    ///
    /// # Errors
    ///
    /// Returns the first [`Violation`] encountered.
    pub fn validate(&self, value: &Value) -> Result<ValidatedFields, Violation> {
        let Value::Object(object) = value else {
            return Err(Violation::new("value", ViolationKind::NotAnObject));
        };

        let mut validated = BTreeMap::new();
        for spec in self.fields {
            match object.get(spec.name) {
                Some(field_value) => {
                    validated.insert(spec.name, spec.rule.check(spec.name, field_value)?);
                }
                None if spec.required => {
                    return Err(Violation::new(spec.name, ViolationKind::Required));
                }
                None => {}
            }
        }

        let unknown = object
            .keys()
            .filter(|key| !self.fields.iter().any(|spec| spec.name == key.as_str()))
            .min();
        if let Some(key) = unknown {
            return Err(Violation::new(key.as_str(), ViolationKind::NotAllowed));
        }

        Ok(ValidatedFields(validated))
    }
}

/// Fields that passed a [`Schema`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedFields(BTreeMap<&'static str, FieldValue>);

impl ValidatedFields {
    /// Removes and returns a text field.
    pub fn take_text(&mut self, name: &str) -> Option<String> {
        match self.0.remove(name) {
            Some(FieldValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// Removes and returns a URI field.
    pub fn take_uri(&mut self, name: &str) -> Option<TaskUri> {
        match self.0.remove(name) {
            Some(FieldValue::Uri(uri)) => Some(uri),
            _ => None,
        }
    }

    /// Removes and returns the index of a choice field.
    pub fn take_choice(&mut self, name: &str) -> Option<usize> {
        match self.0.remove(name) {
            Some(FieldValue::Choice(index)) => Some(index),
            _ => None,
        }
    }
}

// =============================================================================
// Task Schemas
// =============================================================================

/// Body of `PATCH /tasks/{id}`.
pub const TASK_UPDATE_SCHEMA: Schema = Schema::new(&[
    FieldSpec::optional("title", FieldRule::Text),
    FieldSpec::optional("uri", FieldRule::Uri),
    FieldSpec::optional("method", FieldRule::OneOf(HttpMethod::NAMES)),
]);

/// Body of `POST /tasks`.
pub const TASK_CREATE_SCHEMA: Schema = Schema::new(&[
    FieldSpec::required("title", FieldRule::Text),
    FieldSpec::optional("uri", FieldRule::Uri),
    FieldSpec::optional("method", FieldRule::OneOf(HttpMethod::NAMES)),
]);

/// Validated create task data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTaskFields {
    pub title: String,
    pub uri: Option<TaskUri>,
    pub method: Option<HttpMethod>,
}

/// Parses the `id` path parameter.
///
/// # Errors
///
/// Returns an `InvalidUuid` violation for anything that is not a UUID.
pub fn parse_task_id(raw: &str) -> Result<TaskId, Violation> {
    TaskId::parse(raw).map_err(|_| Violation::new("id", ViolationKind::InvalidUuid))
}

/// Validates a `PATCH /tasks/{id}` body into a partial update.
///
/// # Errors
///
/// Returns the first [`Violation`] of [`TASK_UPDATE_SCHEMA`].
pub fn validate_update_payload(body: &Value) -> Result<TaskChanges, Violation> {
    let mut fields = TASK_UPDATE_SCHEMA.validate(body)?;
    Ok(TaskChanges {
        title: fields.take_text("title"),
        uri: fields.take_uri("uri"),
        method: take_method(&mut fields),
    })
}

/// Validates a `POST /tasks` body.
///
/// # Errors
///
/// Returns the first [`Violation`] of [`TASK_CREATE_SCHEMA`].
pub fn validate_create_payload(body: &Value) -> Result<NewTaskFields, Violation> {
    let mut fields = TASK_CREATE_SCHEMA.validate(body)?;
    let Some(title) = fields.take_text("title") else {
        return Err(Violation::new("title", ViolationKind::Required));
    };
    Ok(NewTaskFields {
        title,
        uri: fields.take_uri("uri"),
        method: take_method(&mut fields),
    })
}

fn take_method(fields: &mut ValidatedFields) -> Option<HttpMethod> {
    fields
        .take_choice("method")
        .and_then(|index| HttpMethod::ALL.get(index).copied())
}

// =============================================================================
// Tests
// =============================================================================
