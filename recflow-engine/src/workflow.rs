//! Moderation workflow.
//!
//! A [`TransitionTable`] lists which operation may move a record from which
//! status, and which permission the actor must hold. The guards
//! ([`WorkflowEngine::can_edit`], [`WorkflowEngine::can_submit`]) are shared by
//! every entity kind and parameterized only by the table.
//!
//! The checks here are a fast local rejection. The record service remains
//! the authority and may still answer with a conflict.

use chrono::{DateTime, Utc};
use recflow_types::RecordStatus;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A permission an actor may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Read,
    Write,
    Delete,
    Approve,
}

impl Permission {
    pub const ALL: [Permission; 4] = [
        Permission::Read,
        Permission::Write,
        Permission::Delete,
        Permission::Approve,
    ];

    const fn bit(self) -> u8 {
        match self {
            Permission::Read => 1,
            Permission::Write => 2,
            Permission::Delete => 4,
            Permission::Approve => 8,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::Write => "write",
            Permission::Delete => "delete",
            Permission::Approve => "approve",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of permissions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PermissionSet(u8);

impl PermissionSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn all() -> Self {
        Self(0b1111)
    }

    #[must_use]
    pub const fn with(self, permission: Permission) -> Self {
        Self(self.0 | permission.bit())
    }

    pub const fn contains(self, permission: Permission) -> bool {
        self.0 & permission.bit() != 0
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

/// The user performing an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub name: String,
    pub permissions: PermissionSet,
}

impl Actor {
    /// Creates an actor without permissions.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permissions: PermissionSet::empty(),
        }
    }

    /// Grants a permission.
    #[must_use]
    pub fn grant(mut self, permission: Permission) -> Self {
        self.permissions = self.permissions.with(permission);
        self
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(permission)
    }
}

/// A workflow operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Save,
    Submit,
    Approve,
    Reject,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Save => "save",
            Operation::Submit => "submit",
            Operation::Approve => "approve",
            Operation::Reject => "reject",
            Operation::Delete => "delete",
        })
    }
}

/// Reasons the workflow refuses an operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("record in status {0} can no longer be edited")]
    Locked(RecordStatus),

    #[error("{operation} is not allowed from status {status}")]
    InvalidTransition {
        operation: Operation,
        status: RecordStatus,
    },

    #[error("{operation} requires the {permission} permission")]
    PermissionDenied {
        operation: Operation,
        permission: Permission,
    },

    #[error("status changes only through workflow operations")]
    StatusNotEditable,
}

/// One row of a transition table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: Vec<RecordStatus>,
    pub operation: Operation,
    pub permission: Permission,
    /// Target status; `None` keeps the current one.
    pub to: Option<RecordStatus>,
}

/// Entity-specific list of permitted transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTable {
    initial: RecordStatus,
    locked: Vec<RecordStatus>,
    moderated: bool,
    transitions: Vec<Transition>,
}

impl TransitionTable {
    /// The moderation workflow: draft, submit, approve or reject.
    pub fn moderated() -> Self {
        use RecordStatus::{Approved, Draft, Expired, Rejected, RequestToEdit, Submitted};
        let editable = vec![Draft, Rejected, RequestToEdit];
        Self {
            initial: Draft,
            locked: vec![Approved, Expired],
            moderated: true,
            transitions: vec![
                Transition {
                    from: editable.clone(),
                    operation: Operation::Save,
                    permission: Permission::Write,
                    to: None,
                },
                Transition {
                    from: editable,
                    operation: Operation::Submit,
                    permission: Permission::Write,
                    to: Some(Submitted),
                },
                Transition {
                    from: vec![Submitted],
                    operation: Operation::Approve,
                    permission: Permission::Approve,
                    to: Some(Approved),
                },
                Transition {
                    from: vec![Submitted],
                    operation: Operation::Reject,
                    permission: Permission::Approve,
                    to: Some(Rejected),
                },
            ],
        }
    }

    /// Entities without moderation: saved freely while active or inactive.
    pub fn simple() -> Self {
        use RecordStatus::{Active, Approved, Expired, Inactive};
        Self {
            initial: Active,
            locked: vec![Approved, Expired],
            moderated: false,
            transitions: vec![Transition {
                from: vec![Active, Inactive],
                operation: Operation::Save,
                permission: Permission::Write,
                to: None,
            }],
        }
    }

    /// Status of a newly created record.
    pub fn initial(&self) -> RecordStatus {
        self.initial
    }

    /// Whether status changes are reserved to workflow operations.
    pub fn is_moderated(&self) -> bool {
        self.moderated
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// The row allowing `operation` from `status`, if any.
    pub fn find(&self, operation: Operation, status: RecordStatus) -> Option<&Transition> {
        self.transitions
            .iter()
            .find(|t| t.operation == operation && t.from.contains(&status))
    }
}

/// Evaluates workflow guards against a transition table.
#[derive(Debug, Clone)]
pub struct WorkflowEngine {
    table: TransitionTable,
}

impl WorkflowEngine {
    pub fn new(table: TransitionTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    /// True unless the status is one of the table's locked states.
    pub fn can_edit(&self, status: RecordStatus) -> bool {
        !self.table.locked.contains(&status)
    }

    /// Same rule as [`Self::can_edit`]; a separate entry point for submission.
    pub fn can_submit(&self, status: RecordStatus) -> bool {
        self.can_edit(status)
    }

    pub fn is_submitted(&self, status: RecordStatus) -> bool {
        status == RecordStatus::Submitted
    }

    /// Checks `operation` from `status` for `actor` and returns the target status.
    ///
    /// A record without a recognised status is treated as being in the
    /// table's initial status. Deletion is not gated by status, only by the
    /// delete permission.
    pub fn authorize(
        &self,
        operation: Operation,
        status: Option<RecordStatus>,
        actor: &Actor,
    ) -> Result<RecordStatus, WorkflowError> {
        let status = status.unwrap_or(self.table.initial);

        if operation == Operation::Delete {
            return if actor.has(Permission::Delete) {
                Ok(status)
            } else {
                Err(WorkflowError::PermissionDenied {
                    operation,
                    permission: Permission::Delete,
                })
            };
        }

        let guard_ok = match operation {
            Operation::Save => self.can_edit(status),
            Operation::Submit => self.can_submit(status),
            Operation::Approve | Operation::Reject => self.is_submitted(status),
            Operation::Delete => true,
        };
        if !guard_ok {
            return Err(match operation {
                Operation::Save | Operation::Submit => WorkflowError::Locked(status),
                _ => WorkflowError::InvalidTransition { operation, status },
            });
        }

        let transition = self
            .table
            .find(operation, status)
            .ok_or(WorkflowError::InvalidTransition { operation, status })?;

        if !actor.has(transition.permission) {
            return Err(WorkflowError::PermissionDenied {
                operation,
                permission: transition.permission,
            });
        }

        Ok(transition.to.unwrap_or(status))
    }

    /// Whether the control for `operation` should be enabled.
    pub fn permitted(&self, operation: Operation, status: Option<RecordStatus>, actor: &Actor) -> bool {
        self.authorize(operation, status, actor).is_ok()
    }

    /// Every operation the actor may perform from `status`.
    pub fn available_operations(&self, status: Option<RecordStatus>, actor: &Actor) -> Vec<Operation> {
        [
            Operation::Save,
            Operation::Submit,
            Operation::Approve,
            Operation::Reject,
            Operation::Delete,
        ]
        .into_iter()
        .filter(|op| self.permitted(*op, status, actor))
        .collect()
    }

    /// Status as displayed, including the scheduled publish step.
    ///
    /// Publishing happens outside the engine: an approved record whose
    /// `publishedAt` has passed reads as published.
    pub fn effective_status(
        status: RecordStatus,
        published_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> RecordStatus {
        match (status, published_at) {
            (RecordStatus::Approved, Some(at)) if at <= now => RecordStatus::Published,
            _ => status,
        }
    }
}
