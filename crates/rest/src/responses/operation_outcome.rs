//! OperationOutcome response generation.
//!
//! Every error response body is an OperationOutcome listing one issue per
//! problem found.

use serde_json::Value;

/// Issue severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    /// Error - processing has failed.
    Error,
    /// Warning - processing succeeded but with concerns.
    Warning,
    /// Information - informational message.
    Information,
}

impl IssueSeverity {
    /// Returns the wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueSeverity::Error => "error",
            IssueSeverity::Warning => "warning",
            IssueSeverity::Information => "information",
        }
    }
}

/// Issue type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueType {
    /// Invalid content.
    Invalid,
    /// Structural issue.
    Structure,
    /// Required element missing.
    Required,
    /// Element holds the wrong value.
    Value,
    /// Resource not found.
    NotFound,
    /// Resource was deleted.
    Deleted,
    /// Conflict with existing state.
    Conflict,
    /// Content or operation not supported.
    NotSupported,
    /// Transient failure; the request may succeed later.
    Transient,
    /// Unexpected server-side failure.
    Exception,
}

impl IssueType {
    /// Returns the code string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::Invalid => "invalid",
            IssueType::Structure => "structure",
            IssueType::Required => "required",
            IssueType::Value => "value",
            IssueType::NotFound => "not-found",
            IssueType::Deleted => "deleted",
            IssueType::Conflict => "conflict",
            IssueType::NotSupported => "not-supported",
            IssueType::Transient => "transient",
            IssueType::Exception => "exception",
        }
    }
}

/// An issue in an OperationOutcome.
#[derive(Debug, Clone)]
pub struct Issue {
    /// The severity of the issue.
    pub severity: IssueSeverity,
    /// The type/code of the issue.
    pub code: IssueType,
    /// Human-readable description.
    pub details: String,
    /// Path to the offending element, e.g. `Patient.id`.
    pub expression: Option<String>,
}

impl Issue {
    /// Creates a new issue.
    pub fn new(severity: IssueSeverity, code: IssueType, details: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            details: details.into(),
            expression: None,
        }
    }

    /// Creates an error issue.
    pub fn error(code: IssueType, details: impl Into<String>) -> Self {
        Self::new(IssueSeverity::Error, code, details)
    }

    /// Sets the expression (location).
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    /// Converts to JSON.
    pub fn to_json(&self) -> Value {
        let mut issue = serde_json::json!({
            "severity": self.severity.as_str(),
            "code": self.code.as_str(),
            "details": {
                "text": self.details
            }
        });

        if let Some(expr) = &self.expression {
            issue["expression"] = serde_json::json!([expr]);
        }

        issue
    }
}

/// Builder for OperationOutcome resources.
#[derive(Debug, Default)]
pub struct OperationOutcomeBuilder {
    issues: Vec<Issue>,
}

impl OperationOutcomeBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an issue.
    pub fn add_issue(mut self, issue: Issue) -> Self {
        self.issues.push(issue);
        self
    }

    /// Adds an error issue.
    pub fn error(self, code: IssueType, details: impl Into<String>) -> Self {
        self.add_issue(Issue::error(code, details))
    }

    /// Builds the OperationOutcome resource.
    pub fn build(self) -> Value {
        let issues: Vec<Value> = self.issues.iter().map(|i| i.to_json()).collect();

        serde_json::json!({
            "resourceType": "OperationOutcome",
            "issue": issues
        })
    }

    /// Returns true if there are any error issues.
    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.severity == IssueSeverity::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_to_json() {
        let issue = Issue::error(IssueType::NotFound, "Resource not found");
        let json = issue.to_json();

        assert_eq!(json["severity"], "error");
        assert_eq!(json["code"], "not-found");
        assert_eq!(json["details"]["text"], "Resource not found");
        assert!(json.get("expression").is_none());
    }

    #[test]
    fn test_issue_with_expression() {
        let issue = Issue::error(IssueType::Required, "The id element is missing.")
            .with_expression("Patient.id");
        let json = issue.to_json();

        assert_eq!(json["expression"][0], "Patient.id");
    }

    #[test]
    fn test_builder() {
        let builder = OperationOutcomeBuilder::new()
            .error(IssueType::Required, "The id element is missing.")
            .add_issue(Issue::new(
                IssueSeverity::Warning,
                IssueType::Value,
                "Unexpected value",
            ));
        assert!(builder.has_errors());

        let outcome = builder.build();
        assert_eq!(outcome["resourceType"], "OperationOutcome");
        assert_eq!(outcome["issue"].as_array().unwrap().len(), 2);
        assert_eq!(outcome["issue"][1]["severity"], "warning");
    }

    #[test]
    fn test_empty_builder_has_no_errors() {
        assert!(!OperationOutcomeBuilder::new().has_errors());
    }
}
