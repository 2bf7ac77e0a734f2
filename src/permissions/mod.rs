//! Advisory document-access annotation
//!
//! Retrieved documents are flagged with whether the requesting user holds
//! access. The flag is informational metadata for the caller: unpermitted
//! text stays in the assembled context. A failed permission lookup yields an
//! empty permitted set (every flag false) and never blocks the chat turn.

use crate::error::Result;
use crate::meta::MetaDb;
use crate::search::RetrievedChunk;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;
use tracing::warn;

/// Source of per-user document permissions
#[async_trait]
pub trait PermissionSource: Send + Sync {
    /// The set of document ids the user may access
    async fn permitted_doc_ids(&self, user_id: i64) -> Result<HashSet<i64>>;
}

#[async_trait]
impl PermissionSource for MetaDb {
    async fn permitted_doc_ids(&self, user_id: i64) -> Result<HashSet<i64>> {
        MetaDb::permitted_doc_ids(self, user_id).await
    }
}

/// Per-document access annotation for one retrieval call
#[derive(Debug, Clone, Serialize)]
pub struct DocAccess {
    pub doc_id: i64,
    pub permitted: bool,
}

/// Annotate retrieved chunks with the user's access, one entry per distinct
/// document in retrieval rank order. Lookup failure fails closed.
pub async fn annotate_access(
    source: &dyn PermissionSource,
    user_id: i64,
    chunks: &[RetrievedChunk],
) -> Vec<DocAccess> {
    let permitted = match source.permitted_doc_ids(user_id).await {
        Ok(ids) => ids,
        Err(e) => {
            warn!(
                "Permission lookup failed for user {}, treating all documents as unpermitted: {}",
                user_id, e
            );
            HashSet::new()
        }
    };

    let mut seen = HashSet::new();
    chunks
        .iter()
        .filter(|chunk| seen.insert(chunk.doc_id))
        .map(|chunk| DocAccess {
            doc_id: chunk.doc_id,
            permitted: permitted.contains(&chunk.doc_id),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct FixedPermissions(HashSet<i64>);

    #[async_trait]
    impl PermissionSource for FixedPermissions {
        async fn permitted_doc_ids(&self, _user_id: i64) -> Result<HashSet<i64>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenPermissions;

    #[async_trait]
    impl PermissionSource for BrokenPermissions {
        async fn permitted_doc_ids(&self, _user_id: i64) -> Result<HashSet<i64>> {
            Err(Error::Other("lookup unavailable".to_string()))
        }
    }

    fn chunk(doc_id: i64) -> RetrievedChunk {
        RetrievedChunk {
            doc_id,
            text: format!("text for {doc_id}"),
            score: 0.5,
        }
    }

    #[tokio::test]
    async fn test_annotations_follow_permission_set() {
        let source = FixedPermissions([10].into_iter().collect());
        let chunks = vec![chunk(10), chunk(20)];

        let access = annotate_access(&source, 1, &chunks).await;

        assert_eq!(access.len(), 2);
        assert!(access[0].permitted);
        assert!(!access[1].permitted);
    }

    #[tokio::test]
    async fn test_duplicate_documents_annotated_once() {
        let source = FixedPermissions(HashSet::new());
        let chunks = vec![chunk(10), chunk(10), chunk(20)];

        let access = annotate_access(&source, 1, &chunks).await;

        assert_eq!(access.len(), 2);
        assert_eq!(access[0].doc_id, 10);
        assert_eq!(access[1].doc_id, 20);
    }

    #[tokio::test]
    async fn test_lookup_failure_fails_closed() {
        let chunks = vec![chunk(10)];

        let access = annotate_access(&BrokenPermissions, 1, &chunks).await;

        assert_eq!(access.len(), 1);
        assert!(!access[0].permitted);
    }
}
