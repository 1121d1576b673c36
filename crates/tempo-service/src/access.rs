//! # Access Scopes
//!
//! One capability-resolution step per request: the actor's role collapses
//! into a scope, and every operation asks the same question of it.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  employee ──► SelfOnly(actor_id)       own records only                 │
//! │  manager  ──► Department(name)         anyone in the department         │
//! │  admin    ──► All                      anyone                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tempo_core::{Employee, Role};

use crate::error::{ServiceError, ServiceResult};

/// What an actor may reach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessScope {
    /// The actor's own records only.
    SelfOnly(String),
    /// Any employee in the named department.
    Department(String),
    /// Any employee.
    All,
}

impl AccessScope {
    /// Resolves the scope an actor operates under.
    pub fn for_actor(actor: &Employee) -> Self {
        match actor.role {
            Role::Admin => AccessScope::All,
            Role::Manager => AccessScope::Department(actor.department.clone()),
            Role::Employee => AccessScope::SelfOnly(actor.id.clone()),
        }
    }

    /// True when the scope covers the target employee.
    pub fn allows(&self, target: &Employee) -> bool {
        match self {
            AccessScope::All => true,
            AccessScope::Department(department) => target.department == *department,
            AccessScope::SelfOnly(actor_id) => target.id == *actor_id,
        }
    }

    /// [`allows`](Self::allows) as a hard gate.
    pub fn ensure(&self, target: &Employee) -> ServiceResult<()> {
        if self.allows(target) {
            Ok(())
        } else {
            Err(ServiceError::forbidden(format!(
                "actor scope does not cover employee {}",
                target.id
            )))
        }
    }
}

/// Privileged gate for operations that are never self-service (manual
/// debits, approvals, corrections).
pub fn ensure_privileged(actor: &Employee) -> ServiceResult<()> {
    if actor.role.is_privileged() {
        Ok(())
    } else {
        Err(ServiceError::forbidden(
            "operation requires a manager or admin role",
        ))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
