//! Context excerpt and query models.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Narrows which documents a search considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContextKind {
    /// Every document.
    #[default]
    All,
    /// Everything except the task checklist.
    Notes,
    /// Only the task checklist.
    Tasks,
}

impl ContextKind {
    /// Whether `path` belongs to this kind, given the task checklist path.
    pub fn admits(self, path: &str, tasks_file: &str) -> bool {
        match self {
            Self::All => true,
            Self::Notes => path != tasks_file,
            Self::Tasks => path == tasks_file,
        }
    }
}

impl FromStr for ContextKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "notes" => Ok(Self::Notes),
            "tasks" => Ok(Self::Tasks),
            other => Err(format!("unknown context kind: {other}")),
        }
    }
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::All => "all",
            Self::Notes => "notes",
            Self::Tasks => "tasks",
        };
        f.write_str(label)
    }
}

/// A ranked excerpt of a vault document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContextExcerpt {
    pub excerpt: String,
    /// Vault-relative document path.
    pub path: String,
    /// Relevance in `[0, 1]`.
    pub score: f32,
}

impl ContextExcerpt {
    pub fn new(excerpt: impl Into<String>, path: impl Into<String>, score: f32) -> Self {
        Self {
            excerpt: excerpt.into(),
            path: path.into(),
            score: clamp_score(score),
        }
    }
}

/// Force a score into `[0, 1]`; NaN becomes 0.
pub(crate) fn clamp_score(score: f32) -> f32 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}
