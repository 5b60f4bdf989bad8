//! Query value object

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// A user query submitted to the orchestrator (Value Object)
///
/// Guaranteed non-blank; surrounding whitespace is trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Query {
    content: String,
}

impl Query {
    pub fn try_new(content: impl Into<String>) -> Result<Self, DomainError> {
        let content = content.into();
        let trimmed = content.trim();
        if trimmed.is_empty() {
            Err(DomainError::EmptyQuery)
        } else {
            Ok(Self {
                content: trimmed.to_string(),
            })
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn into_content(self) -> String {
        self.content
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.content)
    }
}

impl TryFrom<String> for Query {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Query::try_new(s)
    }
}

impl TryFrom<&str> for Query {
    type Error = DomainError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Query::try_new(s)
    }
}

impl From<Query> for String {
    fn from(q: Query) -> Self {
        q.content
    }
}
