//! Generated feedback content attached to a review.
//!
//! Feedback is produced upstream and never modified once a review exists.

use super::ParseSeverityError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity of a single feedback item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Blocking problem.
    Error,
    /// Non-blocking concern.
    Warning,
    /// Informational remark.
    Info,
}

impl Severity {
    /// All severities, most severe first.
    pub const ALL: [Self; 3] = [Self::Error, Self::Warning, Self::Info];

    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "error" => Ok(Self::Error),
            "warning" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            _ => Err(ParseSeverityError(value.to_owned())),
        }
    }
}

/// One finding from the feedback generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackItem {
    severity: Severity,
    category: String,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    line_number: Option<u32>,
}

impl FeedbackItem {
    /// Creates a feedback item without a source location.
    #[must_use]
    pub fn new(
        severity: Severity,
        category: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            file_path: None,
            line_number: None,
        }
    }

    /// Attaches the file the finding refers to.
    #[must_use]
    pub fn with_file_path(mut self, file_path: impl Into<String>) -> Self {
        self.file_path = Some(file_path.into());
        self
    }

    /// Attaches the line the finding refers to.
    #[must_use]
    pub const fn with_line_number(mut self, line_number: u32) -> Self {
        self.line_number = Some(line_number);
        self
    }

    /// Returns the severity.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.severity
    }

    /// Returns the category label.
    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Returns the message text.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the referenced file path, if any.
    #[must_use]
    pub fn file_path(&self) -> Option<&str> {
        self.file_path.as_deref()
    }

    /// Returns the referenced line number, if any.
    #[must_use]
    pub const fn line_number(&self) -> Option<u32> {
        self.line_number
    }
}

/// Branch expectations the generator applied when producing feedback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectationsApplied {
    description: String,
    checks: Vec<String>,
}

impl ExpectationsApplied {
    /// Creates an expectations record.
    #[must_use]
    pub fn new(description: impl Into<String>, checks: impl IntoIterator<Item = String>) -> Self {
        Self {
            description: description.into(),
            checks: checks.into_iter().collect(),
        }
    }

    /// Returns the expectation set description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the ordered check descriptions.
    #[must_use]
    pub fn checks(&self) -> &[String] {
        &self.checks
    }
}
