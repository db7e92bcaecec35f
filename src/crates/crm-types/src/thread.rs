//! Thread identity: the `(thread_id, namespace)` pair that uniquely
//! identifies a checkpoint lineage (spec §3, §4.2).

use serde::{Deserialize, Serialize};

/// A thread id plus an optional namespace, identifying one checkpoint
/// lineage. The parent Coordinator lineage uses an empty namespace; each
/// domain subgraph runs under `"<domain>_subgraph"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadRef {
    pub thread_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl ThreadRef {
    pub fn parent(thread_id: impl Into<String>) -> Self {
        Self { thread_id: thread_id.into(), namespace: None }
    }

    pub fn namespaced(thread_id: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self { thread_id: thread_id.into(), namespace: Some(namespace.into()) }
    }

    /// Default thread id for a turn that didn't supply an explicit one:
    /// `session_id:org_id`.
    pub fn default_id(session_id: &str, org_id: &str) -> String {
        format!("{session_id}:{org_id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_id_combines_session_and_org() {
        assert_eq!(ThreadRef::default_id("sess-1", "org-9"), "sess-1:org-9");
    }

    #[test]
    fn parent_has_no_namespace() {
        let t = ThreadRef::parent("sess-1:org-9");
        assert!(t.namespace.is_none());
    }
}
