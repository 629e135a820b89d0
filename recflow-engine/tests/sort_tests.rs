use pretty_assertions::assert_eq;
use recflow_engine::{handle_sort, remove_sort_status, Sort, SortDirection, SortState};

#[test]
fn same_column_cycles_asc_desc_unsorted() {
    let s0 = SortState::unsorted();

    let c1 = handle_sort("title", &s0);
    assert_eq!(c1.state.to_sort(), Some(Sort::ascending("title")));
    assert_eq!(c1.cleared, None);

    let c2 = handle_sort("title", &c1.state);
    assert_eq!(c2.state.to_sort(), Some(Sort::descending("title")));
    assert_eq!(c2.cleared, None);

    let c3 = handle_sort("title", &c2.state);
    assert!(!c3.state.is_active());
    assert_eq!(c3.state.target(), None);
    assert_eq!(c3.cleared.as_deref(), Some("title"));
}

#[test]
fn other_column_resets_to_ascending_and_clears_previous() {
    let a = handle_sort("title", &SortState::unsorted()).state;
    let b = handle_sort("publishedAt", &a);
    assert_eq!(b.state.to_sort(), Some(Sort::ascending("publishedAt")));
    assert_eq!(b.cleared.as_deref(), Some("title"));
    assert_eq!(b.state.indicator("title"), None);
    assert_eq!(b.state.indicator("publishedAt"), Some(SortDirection::Ascending));
}

#[test]
fn other_column_after_descending_starts_ascending() {
    let desc = SortState::sorted("title", SortDirection::Descending);
    let next = handle_sort("author", &desc);
    assert_eq!(next.state.direction(), Some(SortDirection::Ascending));
    assert_eq!(next.state.field(), Some("author"));
}

#[test]
fn exactly_one_column_marked() {
    let mut state = SortState::unsorted();
    for column in ["a", "b", "b", "c", "a", "a", "a"] {
        state = handle_sort(column, &state).state;
        let marked = ["a", "b", "c"]
            .iter()
            .filter(|c| state.indicator(c).is_some())
            .count();
        assert!(marked <= 1);
        assert_eq!(marked == 1, state.is_active());
    }
}

#[test]
fn remove_sort_status_clears_marked_column() {
    let state = SortState::sorted("title", SortDirection::Descending);
    let change = remove_sort_status(&state);
    assert!(!change.state.is_active());
    assert_eq!(change.cleared.as_deref(), Some("title"));
    assert_eq!(remove_sort_status(&SortState::unsorted()).cleared, None);
}

#[test]
fn from_sort_restores_state() {
    let state = SortState::from_sort(Some(&Sort::descending("views")));
    assert_eq!(state.target(), Some("views"));
    assert_eq!(state.indicator("views"), Some(SortDirection::Descending));
    assert_eq!(SortState::from_sort(None), SortState::unsorted());
}

#[test]
fn sort_param_round_trip() {
    assert_eq!(Sort::descending("title").to_param(), "-title");
    assert_eq!(Sort::ascending("title").to_param(), "title");
    assert_eq!(Sort::parse("+title"), Some(Sort::ascending("title")));
    assert_eq!(Sort::parse("-"), None);
}
