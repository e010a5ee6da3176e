/// Errors returned by tools and the dispatcher.
///
/// None of these ever escape a dispatch: the dispatcher renders them into a
/// failed [`crate::ToolResult`] the model can read.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Tool name was not found in registry.
    #[error("Unknown tool: {0}")]
    ToolNotFound(String),
    /// Tool received missing or malformed input fields.
    #[error("invalid input: {0}")]
    InvalidArguments(String),
    /// Tool ran and failed.
    #[error("{0}")]
    ExecutionFailed(String),
    /// Tool refused by policy or sandbox rules.
    #[error("not allowed: {0}")]
    PermissionDenied(String),
}

impl ToolError {
    /// Short label used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ToolNotFound(_) => "not_found",
            Self::InvalidArguments(_) => "invalid_arguments",
            Self::ExecutionFailed(_) => "execution_failed",
            Self::PermissionDenied(_) => "permission_denied",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ToolError;
    use pretty_assertions::assert_eq;

    #[test]
    fn unknown_tool_renders_model_facing_text() {
        let err = ToolError::ToolNotFound("launch_rocket".to_string());
        assert_eq!(err.to_string(), "Unknown tool: launch_rocket");
        assert_eq!(err.kind(), "not_found");
    }
}
