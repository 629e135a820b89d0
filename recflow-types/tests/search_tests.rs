use recflow_types::{HistoryEntry, Record, SearchResult};
use serde_json::json;

#[test]
fn search_result_total_defaults_to_zero() {
    let r: SearchResult = serde_json::from_value(json!({"list": [{"id": "a"}]})).unwrap();
    assert_eq!(r.total, 0);
    assert_eq!(r.list.len(), 1);
    assert!(!r.is_empty());
}

#[test]
fn search_result_empty() {
    let r: SearchResult = SearchResult::empty();
    assert!(r.is_empty());
    assert_eq!(r, SearchResult::default());
}

#[test]
fn search_result_rejects_records_without_id() {
    let r = serde_json::from_value::<SearchResult>(json!({"list": [{"title": "x"}], "total": 1}));
    assert!(r.is_err());
}

#[test]
fn history_entry_parses_rfc3339_time() {
    let entry: HistoryEntry = serde_json::from_value(json!({
        "id": "h-3",
        "author": "mai",
        "time": "2024-05-01T10:00:00Z",
        "action": "approve",
        "data": {"id": "art-1", "status": "approved"}
    }))
    .unwrap();
    assert_eq!(entry.id, "h-3");
    assert_eq!(entry.time.to_rfc3339(), "2024-05-01T10:00:00+00:00");
    assert_eq!(entry.data.as_ref().map(Record::id), Some("art-1"));
}

#[test]
fn history_entry_data_is_optional() {
    let entry: HistoryEntry = serde_json::from_value(json!({
        "id": "h-4",
        "author": "mai",
        "time": "2024-05-01T10:00:00Z",
        "action": "delete"
    }))
    .unwrap();
    assert!(entry.data.is_none());
    let back = serde_json::to_value(&entry).unwrap();
    assert!(back.get("data").is_none());
}
