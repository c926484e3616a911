//! Auditable record metadata shared by persisted models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Creation/modification metadata embedded in every persisted record.
///
/// # Example
///
/// ```
/// use overtime_engine::models::AuditRecord;
///
/// let mut audit = AuditRecord::new("system");
/// assert_eq!(audit.revision, 1);
/// audit.touch("payroll_admin");
/// assert_eq!(audit.revision, 2);
/// assert_eq!(audit.updated_by, "payroll_admin");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// Who created the record.
    pub created_by: String,
    /// When the record was last changed.
    pub updated_at: DateTime<Utc>,
    /// Who last changed the record.
    pub updated_by: String,
    /// Monotonic revision counter, used for optimistic concurrency checks.
    pub revision: u64,
}

impl AuditRecord {
    /// Creates metadata for a record created now by `actor`.
    pub fn new(actor: impl Into<String>) -> Self {
        let actor = actor.into();
        let now = Utc::now();
        Self {
            created_at: now,
            created_by: actor.clone(),
            updated_at: now,
            updated_by: actor,
            revision: 1,
        }
    }

    /// Records a modification by `actor`.
    pub fn touch(&mut self, actor: impl Into<String>) {
        self.updated_at = Utc::now();
        self.updated_by = actor.into();
        self.revision += 1;
    }
}

impl Default for AuditRecord {
    fn default() -> Self {
        Self::new("system")
    }
}
