use pretty_assertions::assert_eq;
use recflow_engine::service::mock::{Call, MockFailure, MockRecordService};
use recflow_engine::{
    Actor, EditSession, EngineConfig, EngineError, EntityKind, Notice, Operation, Permission,
    RawResult, SaveStrategy, SessionMode, WorkflowError,
};
use recflow_types::{FieldError, Record, RecordId, RecordStatus};
use serde_json::json;

fn article(status: &str) -> Record {
    Record::from_value(json!({
        "id": "art-1",
        "title": "Hello",
        "body": "text",
        "status": status
    }))
    .unwrap()
}

fn writer() -> Actor {
    Actor::new("writer").grant(Permission::Read).grant(Permission::Write)
}

fn approver() -> Actor {
    writer().grant(Permission::Approve)
}

fn admin() -> Actor {
    approver().grant(Permission::Delete)
}

fn open(record: Record) -> EditSession {
    EditSession::open(EntityKind::Article, record, EngineConfig::default())
}

// ── Editing ──────────────────────────────────────────────────────

#[test]
fn set_creates_new_snapshot() {
    let mut session = open(article("draft"));
    assert!(!session.has_changes());
    session.set("title", json!("Changed")).unwrap();
    assert!(session.has_changes());
    assert_eq!(session.original().get_str("/title"), Some("Hello"));
    assert_eq!(session.edited().get_str("/title"), Some("Changed"));
    session.revert();
    assert!(!session.has_changes());
}

#[test]
fn id_cannot_change() {
    let mut session = open(article("draft"));
    assert!(matches!(
        session.set("id", json!("other")),
        Err(EngineError::Record(_))
    ));
}

#[test]
fn moderated_status_is_not_directly_editable() {
    let mut session = open(article("draft"));
    assert!(matches!(
        session.set("status", json!("approved")),
        Err(EngineError::Workflow(WorkflowError::StatusNotEditable))
    ));
}

#[test]
fn simple_kind_status_is_editable() {
    let record = Record::from_value(json!({"id": "c-1", "name": "News", "status": "A"})).unwrap();
    let mut session = EditSession::open(EntityKind::Category, record, EngineConfig::default());
    session.set("status", json!("I")).unwrap();
    assert_eq!(session.changes().get("status"), Some(&json!("I")));
}

#[test]
fn new_record_gets_initial_status() {
    let record = Record::new(RecordId::parse("art-9").unwrap());
    let session = EditSession::new(EntityKind::Article, record, EngineConfig::default());
    assert_eq!(session.mode(), SessionMode::New);
    assert_eq!(session.status(), Some(RecordStatus::Draft));
}

// ── Save ─────────────────────────────────────────────────────────

#[tokio::test]
async fn unchanged_save_makes_no_call() {
    let service = MockRecordService::with_records([article("draft")]);
    let mut session = open(article("draft"));

    let notice = session.save(&service, &writer()).await.unwrap();
    assert_eq!(notice, Notice::NoChanges);
    assert_eq!(notice.resource_key(), "msg_no_change");
    assert_eq!(service.call_count(), 0);
}

#[tokio::test]
async fn save_patches_only_changed_fields() {
    let service = MockRecordService::with_records([article("draft")]);
    let mut session = open(article("draft"));
    session.set("title", json!("New title")).unwrap();

    let notice = session.save(&service, &writer()).await.unwrap();
    assert_eq!(notice, Notice::Saved);
    assert_eq!(
        service.calls(),
        vec![Call::Patch {
            id: "art-1".into(),
            fields: vec!["id".into(), "title".into()],
        }]
    );
    assert!(!session.has_changes());
    assert_eq!(session.original().get_str("/title"), Some("New title"));
    assert_eq!(
        service.get("art-1").unwrap().get_str("/title"),
        Some("New title")
    );
}

#[tokio::test]
async fn update_strategy_sends_full_record() {
    let service = MockRecordService::with_records([article("draft")]);
    let config = EngineConfig {
        save_strategy: SaveStrategy::Update,
        ..Default::default()
    };
    let mut session = EditSession::open(EntityKind::Article, article("draft"), config);
    session.set("body", json!("more")).unwrap();

    assert_eq!(session.save(&service, &writer()).await.unwrap(), Notice::Saved);
    assert_eq!(service.calls(), vec![Call::Update("art-1".into())]);
}

#[tokio::test]
async fn save_reports_validation_errors_and_keeps_edits() {
    let service = MockRecordService::with_records([article("draft")]);
    let errors = vec![FieldError::new("title", "maxlength")];
    service.script_raw(RawResult::Errors(errors.clone()));

    let mut session = open(article("draft"));
    session.set("title", json!("x".repeat(500))).unwrap();
    let notice = session.save(&service, &writer()).await.unwrap();

    assert_eq!(notice, Notice::ValidationFailed(errors.clone()));
    assert_eq!(notice.field_errors(), errors.as_slice());
    assert!(session.has_changes());
}

#[tokio::test]
async fn save_conflict_and_not_found() {
    let service = MockRecordService::with_records([article("draft")]);
    let mut session = open(article("draft"));
    session.set("title", json!("t2")).unwrap();

    service.script_raw(RawResult::Code(-1));
    let notice = session.save(&service, &writer()).await.unwrap();
    assert_eq!(notice, Notice::VersionConflict);
    assert_eq!(
        notice.to_string(),
        "Data has been changed by someone. Please refresh screen and continue."
    );

    service.script_raw(RawResult::Code(0));
    assert_eq!(session.save(&service, &writer()).await.unwrap(), Notice::NotFound);
}

#[tokio::test]
async fn positive_ack_rebases_on_submitted_snapshot() {
    let service = MockRecordService::with_records([article("draft")]);
    service.script_raw(RawResult::Code(1));
    let mut session = open(article("draft"));
    session.set("title", json!("acked")).unwrap();

    assert_eq!(session.save(&service, &writer()).await.unwrap(), Notice::Saved);
    assert_eq!(session.original().get_str("/title"), Some("acked"));
}

#[tokio::test]
async fn create_then_duplicate() {
    let service = MockRecordService::new();
    let record = Record::new(RecordId::parse("art-2").unwrap())
        .with_field("title", json!("First"))
        .unwrap();

    let mut session = EditSession::new(EntityKind::Article, record.clone(), EngineConfig::default());
    assert_eq!(session.save(&service, &writer()).await.unwrap(), Notice::Saved);
    assert_eq!(session.mode(), SessionMode::Edit);

    let mut again = EditSession::new(EntityKind::Article, record, EngineConfig::default());
    let notice = again.save(&service, &writer()).await.unwrap();
    assert_eq!(notice, Notice::DuplicateKey);
    assert_eq!(notice.resource_key(), "error_duplicate_key");
}

#[tokio::test]
async fn save_requires_write_permission() {
    let service = MockRecordService::with_records([article("draft")]);
    let mut session = open(article("draft"));
    session.set("title", json!("x")).unwrap();

    let err = session
        .save(&service, &Actor::new("reader").grant(Permission::Read))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Workflow(WorkflowError::PermissionDenied { .. })
    ));
    assert_eq!(service.call_count(), 0);
}

#[tokio::test]
async fn approved_record_cannot_be_saved() {
    let service = MockRecordService::with_records([article("approved")]);
    let mut session = open(article("approved"));
    session.set("title", json!("x")).unwrap();

    let err = session.save(&service, &approver()).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Workflow(WorkflowError::Locked(RecordStatus::Approved))
    ));
    assert_eq!(service.call_count(), 0);
}

#[tokio::test]
async fn transport_errors_propagate() {
    let service = MockRecordService::with_records([article("draft")]);
    service.set_failure(Some(MockFailure::Unauthorized));
    let mut session = open(article("draft"));
    session.set("title", json!("x")).unwrap();

    let err = session.save(&service, &writer()).await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(session.has_changes());
}

// ── Submit ───────────────────────────────────────────────────────

#[tokio::test]
async fn submit_moves_draft_to_submitted() {
    let service = MockRecordService::with_records([article("draft")]);
    let mut session = open(article("draft"));
    session.set("title", json!("ready")).unwrap();

    let notice = session.submit(&service, &writer()).await.unwrap();
    assert_eq!(notice, Notice::Submitted);
    assert_eq!(session.status(), Some(RecordStatus::Submitted));
    assert_eq!(
        service.get("art-1").unwrap().status(),
        Some(RecordStatus::Submitted)
    );
}

#[tokio::test]
async fn simple_kind_cannot_submit() {
    let record = Record::from_value(json!({"id": "c-1", "status": "A"})).unwrap();
    let service = MockRecordService::with_records([record.clone()]);
    let mut session = EditSession::open(EntityKind::Category, record, EngineConfig::default());

    let err = session.submit(&service, &admin()).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Workflow(WorkflowError::InvalidTransition { .. })
    ));
}

// ── Approve / reject ─────────────────────────────────────────────

#[tokio::test]
async fn approve_submitted_record() {
    let service = MockRecordService::with_records([article("submitted")]);
    let mut session = open(article("submitted"));

    let notice = session.approve(&service, &approver()).await.unwrap();
    assert_eq!(notice, Notice::Approved);
    assert_eq!(session.status(), Some(RecordStatus::Approved));
    assert!(session.is_closed());
    assert_eq!(service.calls(), vec![Call::Approve("art-1".into())]);
}

#[tokio::test]
async fn racing_approver_gets_approver_conflict() {
    let service = MockRecordService::with_records([article("submitted")]);
    service.script_code(-2);
    let mut session = open(article("submitted"));

    let notice = session.approve(&service, &approver()).await.unwrap();
    assert_eq!(notice, Notice::ApproverConflict);
    assert_eq!(notice.resource_key(), "msg_approver_conflict");
    assert!(!session.is_closed());
}

#[tokio::test]
async fn reject_outcomes() {
    let service = MockRecordService::with_records([article("submitted")]);
    let mut session = open(article("submitted"));

    service.script_code(0);
    assert_eq!(session.reject(&service, &approver()).await.unwrap(), Notice::NotFound);

    service.script_code(-1);
    assert_eq!(
        session.reject(&service, &approver()).await.unwrap(),
        Notice::RejectConflict
    );

    assert_eq!(session.reject(&service, &approver()).await.unwrap(), Notice::Rejected);
    assert_eq!(session.status(), Some(RecordStatus::Rejected));
}

#[tokio::test]
async fn writer_cannot_approve() {
    let service = MockRecordService::with_records([article("submitted")]);
    let mut session = open(article("submitted"));
    assert!(session.approve(&service, &writer()).await.is_err());
    assert_eq!(service.call_count(), 0);
}

#[tokio::test]
async fn closed_session_rejects_further_edits() {
    let service = MockRecordService::with_records([article("submitted")]);
    let mut session = open(article("submitted"));
    session.approve(&service, &approver()).await.unwrap();
    assert!(matches!(
        session.set("title", json!("late")),
        Err(EngineError::SessionState(_))
    ));
    assert!(session.available_operations(&admin()).is_empty());
}

// ── Delete ───────────────────────────────────────────────────────

#[tokio::test]
async fn delete_ignores_workflow_state() {
    let service = MockRecordService::with_records([article("approved")]);
    let mut session = open(article("approved"));

    assert_eq!(session.delete(&service, &admin()).await.unwrap(), Notice::Deleted);
    assert!(service.get("art-1").is_none());
    assert!(session.is_closed());
}

#[tokio::test]
async fn delete_outcomes() {
    let service = MockRecordService::new();
    let mut session = open(article("draft"));
    assert_eq!(session.delete(&service, &admin()).await.unwrap(), Notice::NotFound);

    service.script_code(-1);
    assert_eq!(
        session.delete(&service, &admin()).await.unwrap(),
        Notice::DeleteFailed
    );
}

#[tokio::test]
async fn delete_requires_permission_and_saved_record() {
    let service = MockRecordService::with_records([article("draft")]);
    let mut session = open(article("draft"));
    assert!(matches!(
        session.delete(&service, &approver()).await,
        Err(EngineError::Workflow(WorkflowError::PermissionDenied { .. }))
    ));

    let fresh = Record::new(RecordId::parse("art-5").unwrap());
    let mut new_session = EditSession::new(EntityKind::Article, fresh, EngineConfig::default());
    assert!(matches!(
        new_session.delete(&service, &admin()).await,
        Err(EngineError::SessionState(_))
    ));
    assert_eq!(service.call_count(), 0);
}

#[tokio::test]
async fn audit_logs_are_read_only() {
    let record = Record::from_value(json!({"id": "log-1", "action": "login"})).unwrap();
    let service = MockRecordService::with_records([record.clone()]);
    let mut session = EditSession::open(EntityKind::AuditLog, record, EngineConfig::default());
    session.set("action", json!("logout")).unwrap();

    assert!(matches!(
        session.save(&service, &admin()).await,
        Err(EngineError::ReadOnly(_))
    ));
    assert!(session.available_operations(&admin()).is_empty());
}

#[tokio::test]
async fn load_missing_record_is_none() {
    let service = MockRecordService::with_records([article("draft")]);
    let missing = EditSession::load(EntityKind::Article, &service, "nope", EngineConfig::default())
        .await
        .unwrap();
    assert!(missing.is_none());

    let found = EditSession::load(EntityKind::Article, &service, "art-1", EngineConfig::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        found.available_operations(&writer()),
        vec![Operation::Save, Operation::Submit]
    );
}
