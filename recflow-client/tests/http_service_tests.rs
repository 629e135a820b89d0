use pretty_assertions::assert_eq;
use recflow_client::HttpRecordService;
use recflow_engine::{
    Actor, EditSession, EngineConfig, EngineError, EntityKind, Filter, HistoryPager, Notice,
    PagedQueryClient, Permission, RawResult, RecordService, Sort,
};
use recflow_types::{FieldError, Record, RecordStatus};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn service(server: &MockServer) -> HttpRecordService {
    HttpRecordService::new(format!("{}/articles", server.uri()), Duration::from_secs(5)).unwrap()
}

fn record(value: Value) -> Record {
    Record::from_value(value).unwrap()
}

fn history(id: &str) -> Value {
    json!({
        "id": id,
        "author": "editor",
        "time": "2024-03-01T10:00:00Z",
        "action": "update",
        "data": {"id": "a-1", "title": id}
    })
}

// ── Search ──────────────────────────────────────────────────────

#[tokio::test]
async fn search_encodes_filter_paging_and_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/articles"))
        .and(query_param("q", "rust lang"))
        .and(query_param("limit", "60"))
        .and(query_param("page", "2"))
        .and(query_param("sort", "-title"))
        .and(query_param("fields", "title,status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": [{"id": "a-1", "title": "Rust"}],
            "total": 61
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut filter = Filter::new(24).with_value("q", "rust lang");
    filter.sort = Some(Sort::descending("title"));
    let fields = vec!["title".to_string(), "status".to_string()];
    let result = service(&server)
        .await
        .search(&filter, 60, 2, &fields)
        .await
        .unwrap();
    assert_eq!(result.total, 61);
    assert_eq!(result.list[0].id(), "a-1");
}

#[tokio::test]
async fn search_repeats_multi_value_keys() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/articles"))
        .and(query_param("status", "draft"))
        .and(query_param("status", "submitted"))
        .and(query_param_is_missing("fields"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"list": [], "total": 0})))
        .expect(1)
        .mount(&server)
        .await;

    let filter = Filter::new(24).with_values("status", ["draft", "submitted"]);
    let result = service(&server)
        .await
        .search(&filter, 24, 1, &[])
        .await
        .unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn search_server_error_is_transport() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/articles"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = service(&server)
        .await
        .search(&Filter::default(), 24, 1, &[])
        .await
        .unwrap_err();
    assert!(err.is_transport());
    assert!(err.to_string().contains("boom"));
}

#[tokio::test]
async fn search_through_query_client_builds_summary() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/articles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": [{"id": "a-25"}, {"id": "a-26"}],
            "total": 26
        })))
        .mount(&server)
        .await;

    let client = PagedQueryClient::new(Arc::new(service(&server).await));
    let page = client.search(&Filter::default(), 24, 2, &[]).await.unwrap();
    assert_eq!(
        page.summary().to_string(),
        "Items 25 to 26 of 26. Page 2 of 2."
    );
}

// ── Load ────────────────────────────────────────────────────────

#[tokio::test]
async fn load_returns_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/articles/a-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "a-1", "title": "Hello", "status": "draft"})),
        )
        .mount(&server)
        .await;

    let loaded = service(&server).await.load("a-1").await.unwrap().unwrap();
    assert_eq!(loaded.get_str("/title"), Some("Hello"));
    assert_eq!(loaded.status(), Some(RecordStatus::Draft));
}

#[tokio::test]
async fn load_missing_or_gone_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/articles/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/articles/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let svc = service(&server).await;
    assert_eq!(svc.load("missing").await.unwrap(), None);
    assert_eq!(svc.load("gone").await.unwrap(), None);
}

#[tokio::test]
async fn load_escapes_id_in_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/articles/a%2Fb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "a/b"})))
        .mount(&server)
        .await;

    let loaded = service(&server).await.load("a/b").await.unwrap().unwrap();
    assert_eq!(loaded.id(), "a/b");
}

// ── Mutations ───────────────────────────────────────────────────

#[tokio::test]
async fn create_posts_record_and_returns_it() {
    let server = MockServer::start().await;
    let payload = json!({"id": "c-1", "name": "News"});
    Mock::given(method("POST"))
        .and(path("/articles"))
        .and(body_json(&payload))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"id": "c-1", "name": "News", "version": 1})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let result = service(&server).await.create(&record(payload)).await.unwrap();
    match result {
        RawResult::Record(saved) => assert_eq!(saved.get("version"), Some(&json!(1))),
        other => panic!("expected record, got {other:?}"),
    }
}

#[tokio::test]
async fn create_conflict_is_zero() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/articles"))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;

    let result = service(&server)
        .await
        .create(&record(json!({"id": "dup"})))
        .await
        .unwrap();
    assert_eq!(result, RawResult::Code(0));
}

#[tokio::test]
async fn update_status_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/articles/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/articles/stale"))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/articles/bad"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!([
            {"field": "title", "code": "required"}
        ])))
        .mount(&server)
        .await;

    let svc = service(&server).await;
    assert_eq!(
        svc.update(&record(json!({"id": "gone"}))).await.unwrap(),
        RawResult::Code(0)
    );
    assert_eq!(
        svc.update(&record(json!({"id": "stale"}))).await.unwrap(),
        RawResult::Code(-1)
    );
    assert_eq!(
        svc.update(&record(json!({"id": "bad"}))).await.unwrap(),
        RawResult::Errors(vec![FieldError::new("title", "required")])
    );
}

#[tokio::test]
async fn patch_sends_only_partial_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/articles/a-1"))
        .and(body_json(json!({"id": "a-1", "title": "New"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "a-1", "title": "New"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut partial = Map::new();
    partial.insert("id".into(), json!("a-1"));
    partial.insert("title".into(), json!("New"));
    let result = service(&server).await.patch("a-1", &partial).await.unwrap();
    assert!(matches!(result, RawResult::Record(_)));
}

#[tokio::test]
async fn patch_numeric_body_is_code() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/articles/a-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(-1)))
        .mount(&server)
        .await;

    let result = service(&server).await.patch("a-1", &Map::new()).await.unwrap();
    assert_eq!(result, RawResult::Code(-1));
}

#[tokio::test]
async fn mutation_without_body_is_acknowledged() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/articles/a-1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/articles/a-1"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let svc = service(&server).await;
    let mut partial = Map::new();
    partial.insert("title".into(), json!("x"));
    assert_eq!(svc.patch("a-1", &partial).await.unwrap(), RawResult::Code(1));
    assert_eq!(
        svc.update(&record(json!({"id": "a-1"}))).await.unwrap(),
        RawResult::Code(1)
    );
}

#[tokio::test]
async fn empty_error_list_is_unexpected() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/articles/a-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/articles/a-1"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!([])))
        .mount(&server)
        .await;

    let svc = service(&server).await;
    let err = svc.patch("a-1", &Map::new()).await.unwrap_err();
    assert!(matches!(err, EngineError::UnexpectedResult(_)));
    let err = svc.update(&record(json!({"id": "a-1"}))).await.unwrap_err();
    assert!(matches!(err, EngineError::UnexpectedResult(_)));
}

#[tokio::test]
async fn unauthorized_and_forbidden_are_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/articles/a-1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/articles/a-1"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let svc = service(&server).await;
    let err = svc.update(&record(json!({"id": "a-1"}))).await.unwrap_err();
    assert!(err.is_unauthorized());
    let err = svc.delete("a-1").await.unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn bearer_token_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/articles/a-1"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "a-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let svc = service(&server).await.with_auth_token("secret");
    assert!(svc.load("a-1").await.unwrap().is_some());
}

// ── Approve / reject / delete ───────────────────────────────────

#[tokio::test]
async fn approve_returns_server_code() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/articles/a-1/approve"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(1)))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(service(&server).await.approve("a-1").await.unwrap(), 1);
}

#[tokio::test]
async fn reject_conflict_forwards_code_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/articles/a-1/reject"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!(-2)))
        .mount(&server)
        .await;

    assert_eq!(service(&server).await.reject("a-1").await.unwrap(), -2);
}

#[tokio::test]
async fn approve_missing_is_zero() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/articles/gone/approve"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    assert_eq!(service(&server).await.approve("gone").await.unwrap(), 0);
}

#[tokio::test]
async fn approve_other_error_is_raised() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/articles/a-1/approve"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = service(&server).await.approve("a-1").await.unwrap_err();
    assert!(err.is_transport());
}

#[tokio::test]
async fn approve_non_numeric_body_is_unexpected() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/articles/a-1/approve"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let err = service(&server).await.approve("a-1").await.unwrap_err();
    assert!(err.is_transport());
}

#[tokio::test]
async fn delete_empty_body_is_success() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/articles/a-1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/articles/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let svc = service(&server).await;
    assert_eq!(svc.delete("a-1").await.unwrap(), 1);
    assert_eq!(svc.delete("gone").await.unwrap(), 0);
}

// ── History ─────────────────────────────────────────────────────

#[tokio::test]
async fn history_pages_by_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/articles/a-1/history"))
        .and(query_param("limit", "3"))
        .and(query_param_is_missing("historyId"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            history("h7"),
            history("h6"),
            history("h5")
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/articles/a-1/history"))
        .and(query_param("historyId", "h5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([history("h4")])))
        .mount(&server)
        .await;

    let client = PagedQueryClient::new(Arc::new(service(&server).await));
    let mut pager = HistoryPager::new("a-1", 3);
    assert_eq!(pager.load_first(&client).await.unwrap(), 3);
    assert_eq!(pager.next_page_token(), Some("h5"));
    assert_eq!(pager.load_more(&client).await.unwrap(), 1);
    assert!(!pager.has_more());
    let ids: Vec<&str> = pager.entries().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["h7", "h6", "h5", "h4"]);
    assert_eq!(
        pager.entries()[0].data.as_ref().and_then(|d| d.get_str("/title")),
        Some("h7")
    );
}

// ── Edit session over HTTP ──────────────────────────────────────

#[tokio::test]
async fn session_save_patches_diff_and_rebases() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/articles/a-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "a-1", "title": "Old", "body": "text", "status": "draft"
        })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/articles/a-1"))
        .and(body_json(json!({"id": "a-1", "title": "New"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "a-1", "title": "New", "body": "text", "status": "draft"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let svc = service(&server).await;
    let mut session = EditSession::load(EntityKind::Article, &svc, "a-1", EngineConfig::default())
        .await
        .unwrap()
        .unwrap();
    session.set("title", json!("New")).unwrap();

    let editor = Actor::new("editor").grant(Permission::Write);
    assert_eq!(session.save(&svc, &editor).await.unwrap(), Notice::Saved);
    assert!(!session.has_changes());
    assert_eq!(session.save(&svc, &editor).await.unwrap(), Notice::NoChanges);
}

#[tokio::test]
async fn session_save_with_no_content_keeps_submitted_values() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/articles/a-1"))
        .and(body_json(json!({"id": "a-1", "title": "New"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let svc = service(&server).await;
    let loaded = record(json!({"id": "a-1", "title": "Old", "status": "draft"}));
    let mut session = EditSession::open(EntityKind::Article, loaded, EngineConfig::default());
    session.set("title", json!("New")).unwrap();

    let editor = Actor::new("editor").grant(Permission::Write);
    assert_eq!(session.save(&svc, &editor).await.unwrap(), Notice::Saved);
    assert_eq!(session.original().get("title"), Some(&json!("New")));
    assert!(!session.has_changes());
}

#[tokio::test]
async fn session_approve_race_reports_approver_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/articles/a-1/approve"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!(-2)))
        .mount(&server)
        .await;

    let svc = service(&server).await;
    let submitted = record(json!({"id": "a-1", "status": "submitted"}));
    let mut session = EditSession::open(EntityKind::Article, submitted, EngineConfig::default());
    let approver = Actor::new("boss").grant(Permission::Approve);
    assert_eq!(
        session.approve(&svc, &approver).await.unwrap(),
        Notice::ApproverConflict
    );
}
