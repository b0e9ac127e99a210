//! Validation of dilemma and precedent records.

use crate::types::{Dilemma, Precedent, ReasoningPath};

/// A record is missing something it needs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Required field is empty
    #[error("{record} is missing required field '{field}'")]
    MissingField {
        record: &'static str,
        field: &'static str,
    },

    /// Reasoning path cannot be used
    #[error("Reasoning path {index} of precedent '{precedent}' is unusable: {reason}")]
    UnusablePath {
        precedent: String,
        index: usize,
        reason: String,
    },
}

impl Dilemma {
    /// Check required fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingField {
                record: "dilemma",
                field: "title",
            });
        }
        Ok(())
    }
}

impl Precedent {
    /// Check the dilemma plus id and every stored path.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.dilemma.validate()?;
        if self.dilemma.id.trim().is_empty() {
            return Err(ValidationError::MissingField {
                record: "precedent",
                field: "id",
            });
        }

        for (index, path) in self.reasoning_paths.iter().enumerate() {
            if let Some(reason) = path.unusable_reason() {
                return Err(ValidationError::UnusablePath {
                    precedent: self.dilemma.id.clone(),
                    index,
                    reason: reason.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl ReasoningPath {
    /// Whether the path has a framework and a conclusion.
    pub fn is_usable(&self) -> bool {
        self.unusable_reason().is_none()
    }

    fn unusable_reason(&self) -> Option<&'static str> {
        if self.framework.trim().is_empty() {
            Some("missing framework")
        } else if self.conclusion.trim().is_empty() {
            Some("missing conclusion")
        } else {
            None
        }
    }
}
