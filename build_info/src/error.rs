//! Error types for build-info assembly and documents.

use std::fmt;

/// The fields a build cannot be recorded without.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequiredField {
    Name,
    Number,
    Started,
}

impl RequiredField {
    /// Checked in this order; the first blank one is reported.
    pub const ALL: [RequiredField; 3] = [Self::Name, Self::Number, Self::Started];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Number => "number",
            Self::Started => "started",
        }
    }
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::Name => "Build must have a name",
            Self::Number => "Build number must be set",
            Self::Started => "Build start time must be set",
        };
        f.write_str(message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildInfoError {
    /// A required field is missing or blank.
    #[error("{0}")]
    Invalid(RequiredField),

    #[error("invalid build start time {value:?}: {source}")]
    StartedFormat {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("build-info document: {0}")]
    Json(#[from] serde_json::Error),
}

impl BuildInfoError {
    /// The missing field, when this is a validation failure.
    pub fn missing_field(&self) -> Option<RequiredField> {
        match self {
            Self::Invalid(field) => Some(*field),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BuildInfoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_messages() {
        assert_eq!(
            BuildInfoError::Invalid(RequiredField::Name).to_string(),
            "Build must have a name"
        );
        assert_eq!(
            BuildInfoError::Invalid(RequiredField::Number).to_string(),
            "Build number must be set"
        );
        assert_eq!(
            BuildInfoError::Invalid(RequiredField::Started).to_string(),
            "Build start time must be set"
        );
    }

    #[test]
    fn test_missing_field() {
        let err = BuildInfoError::Invalid(RequiredField::Started);
        assert_eq!(err.missing_field(), Some(RequiredField::Started));
        assert_eq!(RequiredField::Started.as_str(), "started");
    }
}
