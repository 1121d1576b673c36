//! Best-effort audit recorder. A failed audit write is logged and swallowed;
//! it never fails the business action it describes.

use tracing::warn;

use tempo_db::{AuditEntry, AuditRepository};

/// Thin wrapper giving services a fire-and-forget `record`.
#[derive(Debug, Clone)]
pub struct Auditor {
    repository: AuditRepository,
}

impl Auditor {
    pub fn new(repository: AuditRepository) -> Self {
        Auditor { repository }
    }

    /// Writes the entry, swallowing failures.
    pub async fn record(&self, entry: AuditEntry) {
        if let Err(err) = self.repository.insert(&entry).await {
            warn!(action = %entry.action, error = %err, "audit write failed");
        }
    }
}
