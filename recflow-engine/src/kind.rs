//! Entity kinds managed through the engine.

use crate::filter::Filter;
use crate::workflow::{TransitionTable, WorkflowEngine};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A kind of record with its own service endpoint and search view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Article,
    Category,
    Content,
    Job,
    Contact,
    User,
    Role,
    AuditLog,
}

impl EntityKind {
    pub const ALL: [EntityKind; 8] = [
        EntityKind::Article,
        EntityKind::Category,
        EntityKind::Content,
        EntityKind::Job,
        EntityKind::Contact,
        EntityKind::User,
        EntityKind::Role,
        EntityKind::AuditLog,
    ];

    /// Default service path relative to the base URL.
    pub const fn path(self) -> &'static str {
        match self {
            EntityKind::Article => "articles",
            EntityKind::Category => "categories",
            EntityKind::Content => "contents",
            EntityKind::Job => "jobs",
            EntityKind::Contact => "contacts",
            EntityKind::User => "users",
            EntityKind::Role => "roles",
            EntityKind::AuditLog => "audit-logs",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            EntityKind::Article => "article",
            EntityKind::Category => "category",
            EntityKind::Content => "content",
            EntityKind::Job => "job",
            EntityKind::Contact => "contact",
            EntityKind::User => "user",
            EntityKind::Role => "role",
            EntityKind::AuditLog => "audit_log",
        }
    }

    /// Filter keys whose query parameters accumulate into a set.
    pub fn multi_value_keys(self) -> &'static [&'static str] {
        match self {
            EntityKind::Article => &["status", "articleType"],
            EntityKind::Job => &["status", "jobType"],
            EntityKind::Contact => &["status", "contactType"],
            EntityKind::Role => &["status", "userType"],
            EntityKind::AuditLog => &["status", "auditLogType"],
            EntityKind::Category | EntityKind::Content | EntityKind::User => &["status"],
        }
    }

    /// Audit logs only support search and load.
    pub const fn is_read_only(self) -> bool {
        matches!(self, EntityKind::AuditLog)
    }

    /// Whether records go through the moderation workflow.
    pub const fn is_moderated(self) -> bool {
        matches!(self, EntityKind::Article | EntityKind::Content)
    }

    pub fn transition_table(self) -> TransitionTable {
        if self.is_moderated() {
            TransitionTable::moderated()
        } else {
            TransitionTable::simple()
        }
    }

    pub fn workflow(self) -> WorkflowEngine {
        WorkflowEngine::new(self.transition_table())
    }

    /// Filter of a freshly opened search view.
    ///
    /// Simple kinds show active records only until the user widens the filter.
    pub fn default_filter(self, limit: u32) -> Filter {
        let filter = Filter::new(limit);
        if self.is_moderated() || self.is_read_only() {
            filter
        } else {
            filter.with_values("status", ["A"])
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    /// Accepts the singular name or the service path.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted || k.path().replace('-', "_") == wanted)
            .ok_or_else(|| format!("unknown entity kind: {s}"))
    }
}
