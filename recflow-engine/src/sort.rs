//! Column sort state of a search view.
//!
//! Clicking the same column cycles ascending, descending, unsorted. Clicking
//! another column starts over at ascending on that column. At most one column
//! carries an indicator at any time.

use crate::filter::{Sort, SortDirection};

/// Sort field, direction and the column currently marked in the header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortState {
    field: Option<String>,
    direction: Option<SortDirection>,
    target: Option<String>,
}

impl SortState {
    /// No column sorted.
    pub fn unsorted() -> Self {
        Self::default()
    }

    /// Sorted on `field`; the column is marked.
    pub fn sorted(field: impl Into<String>, direction: SortDirection) -> Self {
        let field = field.into();
        Self {
            target: Some(field.clone()),
            field: Some(field),
            direction: Some(direction),
        }
    }

    /// Restores the state from a decoded filter's sort.
    pub fn from_sort(sort: Option<&Sort>) -> Self {
        match sort {
            Some(sort) => Self::sorted(sort.field.clone(), sort.direction),
            None => Self::unsorted(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.field.is_some()
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn direction(&self) -> Option<SortDirection> {
        self.direction
    }

    /// The column showing an indicator.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// The sort to send with the next query.
    pub fn to_sort(&self) -> Option<Sort> {
        match (&self.field, self.direction) {
            (Some(field), Some(direction)) => Some(Sort {
                field: field.clone(),
                direction,
            }),
            _ => None,
        }
    }

    /// Indicator for `column`, if it is the marked one.
    pub fn indicator(&self, column: &str) -> Option<SortDirection> {
        if self.target.as_deref() == Some(column) {
            self.direction
        } else {
            None
        }
    }
}

/// New sort state plus the column whose indicator must be removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortChange {
    pub state: SortState,
    pub cleared: Option<String>,
}

/// Applies a header click on `clicked`.
pub fn handle_sort(clicked: &str, state: &SortState) -> SortChange {
    if state.field.as_deref() == Some(clicked) {
        return match state.direction {
            Some(SortDirection::Ascending) => SortChange {
                state: SortState::sorted(clicked, SortDirection::Descending),
                cleared: None,
            },
            _ => SortChange {
                state: SortState::unsorted(),
                cleared: Some(clicked.to_string()),
            },
        };
    }

    SortChange {
        state: SortState::sorted(clicked, SortDirection::Ascending),
        cleared: state.target.clone(),
    }
}

/// Clears the sort entirely (explicit search click).
pub fn remove_sort_status(state: &SortState) -> SortChange {
    SortChange {
        state: SortState::unsorted(),
        cleared: state.target.clone(),
    }
}
