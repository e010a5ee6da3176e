//! Allow/deny matching of tool names.

use globset::{Glob, GlobSet, GlobSetBuilder};
use scribe_rs_config::ToolPolicy;
use scribe_rs_protocol::ToolError;

/// Compiled form of [`ToolPolicy`]. Deny wins over allow.
#[derive(Debug, Clone)]
pub struct ToolPolicyMatcher {
    allow: GlobSet,
    deny: GlobSet,
}

impl ToolPolicyMatcher {
    pub fn compile(policy: &ToolPolicy) -> Result<Self, ToolError> {
        Ok(Self {
            allow: build_set(&policy.allow)?,
            deny: build_set(&policy.deny)?,
        })
    }

    pub fn allow_all() -> Result<Self, ToolError> {
        Self::compile(&ToolPolicy::allow_all())
    }

    pub fn is_allowed(&self, name: &str) -> bool {
        self.allow.is_match(name) && !self.deny.is_match(name)
    }
}

fn build_set(patterns: &[String]) -> Result<GlobSet, ToolError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|err| {
            ToolError::InvalidArguments(format!("invalid tool pattern {pattern:?}: {err}"))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|err| ToolError::InvalidArguments(format!("invalid tool policy: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deny_overrides_allow() {
        let matcher = ToolPolicyMatcher::compile(&ToolPolicy {
            allow: vec!["vault_*".to_string(), "task_*".to_string()],
            deny: vec!["vault_delete".to_string()],
        })
        .expect("policy");

        assert!(matcher.is_allowed("vault_read"));
        assert!(matcher.is_allowed("task_add"));
        assert!(!matcher.is_allowed("vault_delete"));
        assert!(!matcher.is_allowed("send_message"));
    }

    #[test]
    fn empty_allow_list_blocks_everything() {
        let matcher = ToolPolicyMatcher::compile(&ToolPolicy {
            allow: Vec::new(),
            deny: Vec::new(),
        })
        .expect("policy");
        assert!(!matcher.is_allowed("vault_read"));
    }

    #[test]
    fn malformed_pattern_is_rejected() {
        let err = ToolPolicyMatcher::compile(&ToolPolicy {
            allow: vec!["vault_[".to_string()],
            deny: Vec::new(),
        })
        .expect_err("invalid");
        match err {
            ToolError::InvalidArguments(message) => assert!(message.contains("vault_[")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
