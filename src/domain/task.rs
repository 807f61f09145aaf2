//! Task domain model.
//!
//! A task describes a single HTTP call to be made on behalf of its owner:
//! a title, an optional target URI, and an optional HTTP method.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::user::UserId;

// =============================================================================
// Value Objects - Newtypes
// =============================================================================

/// Unique identifier for a task.
///
/// This is a newtype wrapper around UUID to provide type safety.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Creates a `TaskId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Generates a new `TaskId` with a randomly generated UUID (v4).
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a `TaskId` from any textual UUID form.
    ///
    /// Hyphenated, simple (32 hex digits), braced and `urn:uuid:` forms are
    /// all accepted, case-insensitively. Two forms of the same UUID yield
    /// the same `TaskId`.
    ///
    /// # Errors
    ///
    /// Returns `uuid::Error` when the input is not a UUID.
    pub fn parse(value: &str) -> Result<Self, uuid::Error> {
        Uuid::try_parse(value).map(Self)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A timestamp wrapper for `DateTime<Utc>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a `Timestamp` from a `DateTime<Utc>`.
    #[must_use]
    pub const fn from_datetime(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }

    /// Returns the inner `DateTime<Utc>`.
    #[must_use]
    pub const fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns the current time as a `Timestamp`.
    ///
    /// **Note**: This is an impure function (side effect: system clock).
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Formats the timestamp as RFC 3339, as used in API responses.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0.format("%Y-%m-%d %H:%M:%S UTC"))
    }
}

/// Errors produced when a string is not an acceptable task URI.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UriError {
    /// The value carries leading or trailing whitespace.
    #[error("URI must not contain surrounding whitespace")]
    SurroundingWhitespace,

    /// The value contains a character URIs never carry unencoded.
    #[error("URI must not contain {0:?}")]
    InvalidCharacter(char),

    /// A `%` is not followed by two hex digits.
    #[error("URI contains a malformed percent-encoding")]
    InvalidPercentEncoding,

    /// The value names a host without the `//` authority marker.
    #[error("URI authority must follow \"//\"")]
    MissingAuthorityMarker,

    /// The value does not parse as an absolute URI.
    #[error("invalid URI: {0}")]
    Invalid(#[from] url::ParseError),
}

/// Returns true for characters RFC 3986 allows outside percent-encodings.
const fn is_uri_char(character: char) -> bool {
    character.is_ascii_alphanumeric()
        || matches!(
            character,
            '-' | '.' | '_' | '~' | ':' | '/' | '?' | '#' | '[' | ']' | '@' | '!' | '$' | '&'
                | '\'' | '(' | ')' | '*' | '+' | ',' | ';' | '=' | '%'
        )
}

/// Checks `value` against the RFC 3986 character set and percent-encoding rules.
fn check_uri_syntax(value: &str) -> Result<(), UriError> {
    if let Some(character) = value.chars().find(|character| !is_uri_char(*character)) {
        return Err(UriError::InvalidCharacter(character));
    }

    let bytes = value.as_bytes();
    for (index, _) in value.match_indices('%') {
        let well_formed = bytes
            .get(index + 1..index + 3)
            .is_some_and(|digits| digits.iter().all(u8::is_ascii_hexdigit));
        if !well_formed {
            return Err(UriError::InvalidPercentEncoding);
        }
    }
    Ok(())
}

/// A syntactically valid, absolute URI.
///
/// The original text is kept as given; `url` is only used to check it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskUri(String);

impl TaskUri {
    /// Validates and wraps a URI string.
    ///
    /// # Errors
    ///
    /// Returns `UriError` if the value has surrounding whitespace, holds
    /// characters outside RFC 3986, or lacks a well-formed scheme or authority.
    pub fn parse(value: impl Into<String>) -> Result<Self, UriError> {
        let value: String = value.into();
        if value.trim() != value {
            return Err(UriError::SurroundingWhitespace);
        }
        check_uri_syntax(&value)?;

        let parsed = url::Url::parse(&value)?;
        // `url` repairs `http:host` and `http:/host` into `http://host`.
        let authority_marker = format!("{}://", parsed.scheme());
        let has_marker = value
            .get(..authority_marker.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(&authority_marker));
        if parsed.has_authority() && !has_marker {
            return Err(UriError::MissingAuthorityMarker);
        }
        Ok(Self(value))
    }

    /// Returns the URI as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TaskUri {
    type Error = UriError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<TaskUri> for String {
    fn from(uri: TaskUri) -> Self {
        uri.0
    }
}

impl std::fmt::Display for TaskUri {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(&self.0)
    }
}

// =============================================================================
// Enums
// =============================================================================

/// HTTP method a task is executed with.
///
/// Only lowercase names are recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Every method, in canonical order.
    pub const ALL: [Self; 5] = [Self::Get, Self::Post, Self::Put, Self::Patch, Self::Delete];

    /// Wire names of every method, in canonical order.
    pub const NAMES: &'static [&'static str] = &["get", "post", "put", "patch", "delete"];

    /// Returns the wire name of the method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Patch => "patch",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

// =============================================================================
// Task
// =============================================================================

/// The task entity.
///
/// `task_id` and `owner_id` are fixed at creation; everything else changes
/// only through [`Task::apply_changes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_field_names)]
pub struct Task {
    /// Unique identifier for the task.
    pub task_id: TaskId,
    /// User that created the task.
    pub owner_id: UserId,
    /// Title of the task.
    pub title: String,
    /// Target URI.
    pub uri: Option<TaskUri>,
    /// HTTP method used against `uri`.
    pub method: Option<HttpMethod>,
    /// Timestamp when the task was created.
    pub created_at: Timestamp,
    /// Timestamp of the last change that altered a field.
    pub updated_at: Timestamp,
}

impl Task {
    /// Creates a new task with no URI and no method.
    #[must_use]
    pub fn new(
        task_id: TaskId,
        owner_id: UserId,
        title: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            task_id,
            owner_id,
            title: title.into(),
            uri: None,
            method: None,
            created_at: timestamp.clone(),
            updated_at: timestamp,
        }
    }

    /// Returns a new task with the given URI.
    #[must_use]
    pub fn with_uri(self, uri: TaskUri) -> Self {
        Self {
            uri: Some(uri),
            ..self
        }
    }

    /// Returns a new task with the given method.
    #[must_use]
    pub fn with_method(self, method: HttpMethod) -> Self {
        Self {
            method: Some(method),
            ..self
        }
    }

    /// Returns true if `user_id` owns this task.
    #[must_use]
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.owner_id == user_id
    }

    /// Merges a partial update into the task.
    ///
    /// Fields absent from `changes` are left untouched. `updated_at` moves
    /// to `now` only when some field actually changes, so applying the same
    /// changes twice leaves the task as the first application did.
    #[must_use]
    pub fn apply_changes(self, changes: &TaskChanges, now: Timestamp) -> Self {
        if !changes.differs_from(&self) {
            return self;
        }

        Self {
            title: changes.title.clone().unwrap_or(self.title),
            uri: changes.uri.clone().or(self.uri),
            method: changes.method.or(self.method),
            updated_at: now,
            ..self
        }
    }
}

// =============================================================================
// Partial Update
// =============================================================================

/// A validated partial update.
///
/// `None` means "leave the field as it is".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub uri: Option<TaskUri>,
    pub method: Option<HttpMethod>,
}

impl TaskChanges {
    /// Returns a copy with a new title.
    #[must_use]
    pub fn with_title(self, title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..self
        }
    }

    /// Returns a copy with a new URI.
    #[must_use]
    pub fn with_uri(self, uri: TaskUri) -> Self {
        Self {
            uri: Some(uri),
            ..self
        }
    }

    /// Returns a copy with a new method.
    #[must_use]
    pub fn with_method(self, method: HttpMethod) -> Self {
        Self {
            method: Some(method),
            ..self
        }
    }

    /// Returns true if applying these changes would alter `task`.
    #[must_use]
    pub fn differs_from(&self, task: &Task) -> bool {
        self.title.as_ref().is_some_and(|title| title != &task.title)
            || self
                .uri
                .as_ref()
                .is_some_and(|uri| task.uri.as_ref() != Some(uri))
            || self
                .method
                .is_some_and(|method| task.method != Some(method))
    }
}

// =============================================================================
// Tests
// =============================================================================
