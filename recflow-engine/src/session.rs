//! Editing one record.
//!
//! An [`EditSession`] owns two snapshots: the baseline last confirmed by the
//! service and the edited copy. Saving sends either the full record or only
//! the diff, classifies the answer and, on success, the returned record
//! becomes the new baseline.

use crate::config::{EngineConfig, SaveStrategy};
use crate::diff;
use crate::error::{EngineError, EngineResult};
use crate::kind::EntityKind;
use crate::notice::Notice;
use crate::outcome::{Conflict, Outcome, ResultInterpreter};
use crate::service::RecordService;
use crate::workflow::{Actor, Operation, WorkflowEngine, WorkflowError};
use recflow_types::{Record, RecordStatus, STATUS_FIELD};
use serde_json::{Map, Value};
use tracing::{debug, info};

/// Whether the record already exists on the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    New,
    Edit,
}

/// One record under edit.
#[derive(Debug, Clone)]
pub struct EditSession {
    kind: EntityKind,
    mode: SessionMode,
    original: Record,
    edited: Record,
    workflow: WorkflowEngine,
    config: EngineConfig,
    closed: bool,
}

impl EditSession {
    /// Starts editing a record that does not exist yet.
    ///
    /// A record without a status gets the workflow's initial status.
    pub fn new(kind: EntityKind, record: Record, config: EngineConfig) -> Self {
        let workflow = kind.workflow();
        let record = match record.status() {
            Some(_) => record,
            None => record.with_status(workflow.table().initial()),
        };
        Self {
            kind,
            mode: SessionMode::New,
            original: record.clone(),
            edited: record,
            workflow,
            config,
            closed: false,
        }
    }

    /// Starts editing a record loaded from the service.
    pub fn open(kind: EntityKind, record: Record, config: EngineConfig) -> Self {
        Self {
            kind,
            mode: SessionMode::Edit,
            original: record.clone(),
            edited: record,
            workflow: kind.workflow(),
            config,
            closed: false,
        }
    }

    /// Loads a record and opens it. `None` when the service does not have it.
    pub async fn load(
        kind: EntityKind,
        service: &dyn RecordService,
        id: &str,
        config: EngineConfig,
    ) -> EngineResult<Option<Self>> {
        let record = service.load(id).await?;
        if record.is_none() {
            debug!("{} {} not found", kind, id);
        }
        Ok(record.map(|r| Self::open(kind, r, config)))
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Baseline as last confirmed by the service.
    pub fn original(&self) -> &Record {
        &self.original
    }

    pub fn edited(&self) -> &Record {
        &self.edited
    }

    pub fn id(&self) -> &str {
        self.edited.id()
    }

    pub fn status(&self) -> Option<RecordStatus> {
        self.original.status()
    }

    pub fn workflow(&self) -> &WorkflowEngine {
        &self.workflow
    }

    /// Closed after an approve, reject or delete took effect.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Operations `actor` may currently perform.
    pub fn available_operations(&self, actor: &Actor) -> Vec<Operation> {
        if self.closed {
            return Vec::new();
        }
        let mut ops = self.workflow.available_operations(self.status(), actor);
        if self.kind.is_read_only() {
            ops.clear();
        }
        if self.mode == SessionMode::New {
            ops.retain(|op| matches!(op, Operation::Save | Operation::Submit));
        }
        ops
    }

    /// Replaces one field of the edited snapshot.
    ///
    /// The id never changes; on moderated kinds neither does the status.
    pub fn set(&mut self, key: &str, value: Value) -> EngineResult<()> {
        self.ensure_open()?;
        if key == STATUS_FIELD && self.workflow.table().is_moderated() {
            return Err(WorkflowError::StatusNotEditable.into());
        }
        self.edited = self.edited.with_field(key, value)?;
        Ok(())
    }

    /// Removes one field from the edited snapshot.
    pub fn unset(&mut self, key: &str) -> EngineResult<()> {
        self.ensure_open()?;
        if key == STATUS_FIELD && self.workflow.table().is_moderated() {
            return Err(WorkflowError::StatusNotEditable.into());
        }
        self.edited = self.edited.without_field(key)?;
        Ok(())
    }

    /// Whether leaving the view would lose edits.
    pub fn has_changes(&self) -> bool {
        diff::has_difference(&self.original, &self.edited)
    }

    /// Fields that a save would send.
    pub fn changes(&self) -> Map<String, Value> {
        diff::diff(
            &self.original,
            &self.edited,
            &self.config.immutable_key_refs(),
        )
    }

    /// Discards edits.
    pub fn revert(&mut self) {
        self.edited = self.original.clone();
    }

    /// Saves the edited snapshot.
    ///
    /// An unchanged record answers [`Notice::NoChanges`] without calling the
    /// service.
    pub async fn save(
        &mut self,
        service: &dyn RecordService,
        actor: &Actor,
    ) -> EngineResult<Notice> {
        self.ensure_writable()?;
        self.workflow
            .authorize(Operation::Save, self.status(), actor)?;

        let outcome = match self.mode {
            SessionMode::New => {
                let raw = service.create(&self.edited).await?;
                ResultInterpreter::classify(raw, &self.edited)
            }
            SessionMode::Edit => {
                let changes = self.changes();
                if changes.is_empty() {
                    debug!("No changes to save for {} {}", self.kind, self.id());
                    return Ok(Notice::NoChanges);
                }
                self.send(service, &self.edited, &changes).await?
            }
        };

        Ok(self.settle(outcome, Notice::Saved))
    }

    /// Saves the edited snapshot with status `submitted`.
    pub async fn submit(
        &mut self,
        service: &dyn RecordService,
        actor: &Actor,
    ) -> EngineResult<Notice> {
        self.ensure_writable()?;
        let target = self
            .workflow
            .authorize(Operation::Submit, self.status(), actor)?;
        let submitted = self.edited.with_status(target);

        let outcome = match self.mode {
            SessionMode::New => {
                let raw = service.create(&submitted).await?;
                ResultInterpreter::classify(raw, &submitted)
            }
            SessionMode::Edit => {
                let changes = diff::diff(
                    &self.original,
                    &submitted,
                    &self.config.immutable_key_refs(),
                );
                self.send(service, &submitted, &changes).await?
            }
        };

        Ok(self.settle(outcome, Notice::Submitted))
    }

    /// Approves the submitted record.
    pub async fn approve(
        &mut self,
        service: &dyn RecordService,
        actor: &Actor,
    ) -> EngineResult<Notice> {
        let target = self.authorize_decision(Operation::Approve, actor)?;
        let code = service.approve(self.id()).await?;
        Ok(self.decide(code, target, Notice::Approved, Notice::ApproveConflict))
    }

    /// Rejects the submitted record.
    pub async fn reject(
        &mut self,
        service: &dyn RecordService,
        actor: &Actor,
    ) -> EngineResult<Notice> {
        let target = self.authorize_decision(Operation::Reject, actor)?;
        let code = service.reject(self.id()).await?;
        Ok(self.decide(code, target, Notice::Rejected, Notice::RejectConflict))
    }

    /// Deletes the record, whatever its status.
    pub async fn delete(
        &mut self,
        service: &dyn RecordService,
        actor: &Actor,
    ) -> EngineResult<Notice> {
        self.ensure_writable()?;
        self.ensure_saved("delete")?;
        self.workflow
            .authorize(Operation::Delete, self.status(), actor)?;

        let code = service.delete(self.id()).await?;
        let notice = match ResultInterpreter::classify_decision(code) {
            Outcome::Success(_) => {
                self.closed = true;
                Notice::Deleted
            }
            Outcome::NotFound => Notice::NotFound,
            _ => Notice::DeleteFailed,
        };
        info!("Delete {} {}: {}", self.kind, self.id(), notice.resource_key());
        Ok(notice)
    }

    async fn send(
        &self,
        service: &dyn RecordService,
        submitted: &Record,
        changes: &Map<String, Value>,
    ) -> EngineResult<Outcome<Record>> {
        let raw = match self.config.save_strategy {
            SaveStrategy::Patch => {
                let body = diff::patch_payload(submitted.id(), changes);
                service.patch(submitted.id(), &body).await?
            }
            SaveStrategy::Update => service.update(submitted).await?,
        };
        Ok(ResultInterpreter::classify(raw, submitted))
    }

    fn settle(&mut self, outcome: Outcome<Record>, success: Notice) -> Notice {
        let notice = match outcome {
            Outcome::Success(record) => {
                self.original = record.clone();
                self.edited = record;
                self.mode = SessionMode::Edit;
                success
            }
            Outcome::ValidationFailed(errors) => Notice::ValidationFailed(errors),
            Outcome::NotFound if self.mode == SessionMode::New => Notice::DuplicateKey,
            Outcome::NotFound => Notice::NotFound,
            Outcome::Conflict(_) => Notice::VersionConflict,
        };
        info!("Save {} {}: {}", self.kind, self.id(), notice.resource_key());
        notice
    }

    fn decide(
        &mut self,
        code: i64,
        target: RecordStatus,
        success: Notice,
        conflict: Notice,
    ) -> Notice {
        let notice = match ResultInterpreter::classify_decision(code) {
            Outcome::Success(_) => {
                self.original = self.original.with_status(target);
                self.edited = self.original.clone();
                self.closed = true;
                success
            }
            Outcome::NotFound => Notice::NotFound,
            Outcome::Conflict(Conflict::Approver) => Notice::ApproverConflict,
            Outcome::Conflict(Conflict::Version(_)) | Outcome::ValidationFailed(_) => conflict,
        };
        info!("Decision on {} {}: {}", self.kind, self.id(), notice.resource_key());
        notice
    }

    fn authorize_decision(
        &self,
        operation: Operation,
        actor: &Actor,
    ) -> EngineResult<RecordStatus> {
        self.ensure_writable()?;
        self.ensure_saved(&operation.to_string())?;
        Ok(self.workflow.authorize(operation, self.status(), actor)?)
    }

    fn ensure_open(&self) -> EngineResult<()> {
        if self.closed {
            return Err(EngineError::SessionState(format!(
                "{} {} is closed",
                self.kind,
                self.id()
            )));
        }
        Ok(())
    }

    fn ensure_writable(&self) -> EngineResult<()> {
        self.ensure_open()?;
        if self.kind.is_read_only() {
            return Err(EngineError::ReadOnly(self.kind.to_string()));
        }
        Ok(())
    }

    fn ensure_saved(&self, operation: &str) -> EngineResult<()> {
        if self.mode == SessionMode::New {
            return Err(EngineError::SessionState(format!(
                "cannot {operation} a record that was never saved"
            )));
        }
        Ok(())
    }
}
