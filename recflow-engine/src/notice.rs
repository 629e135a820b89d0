//! User-facing messages.
//!
//! The engine never formats localized text itself; each notice exposes the
//! stable resource key a UI looks up. `Display` gives the English default.

use recflow_types::FieldError;
use std::fmt;

/// Result of an edit-session operation as shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Saved,
    Submitted,
    NoChanges,
    ValidationFailed(Vec<FieldError>),
    NotFound,
    VersionConflict,
    DuplicateKey,
    Approved,
    Rejected,
    ApproverConflict,
    ApproveConflict,
    RejectConflict,
    Deleted,
    DeleteFailed,
}

impl Notice {
    /// Stable message key.
    pub fn resource_key(&self) -> &'static str {
        match self {
            Notice::Saved => "msg_save_success",
            Notice::Submitted => "msg_submit_success",
            Notice::NoChanges => "msg_no_change",
            Notice::ValidationFailed(_) => "error_validation",
            Notice::NotFound => "error_not_found",
            Notice::VersionConflict => "error_conflict",
            Notice::DuplicateKey => "error_duplicate_key",
            Notice::Approved => "msg_approve_success",
            Notice::Rejected => "msg_reject_success",
            Notice::ApproverConflict => "msg_approver_conflict",
            Notice::ApproveConflict => "msg_approve_conflict",
            Notice::RejectConflict => "msg_reject_conflict",
            Notice::Deleted => "msg_delete_success",
            Notice::DeleteFailed => "msg_delete_failed",
        }
    }

    /// True for notices shown as an error.
    pub fn is_error(&self) -> bool {
        !matches!(
            self,
            Notice::Saved
                | Notice::Submitted
                | Notice::NoChanges
                | Notice::Approved
                | Notice::Rejected
                | Notice::Deleted
        )
    }

    /// Field errors carried by a validation failure.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Notice::ValidationFailed(errors) => errors,
            _ => &[],
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Notice::Saved => "Data have been saved successfully",
            Notice::Submitted => "Data have been submitted successfully",
            Notice::NoChanges => "You do not change anything.",
            Notice::ValidationFailed(errors) => {
                return write!(f, "{} field(s) are invalid", errors.len());
            }
            Notice::NotFound => "Not found.",
            Notice::VersionConflict => {
                "Data has been changed by someone. Please refresh screen and continue."
            }
            Notice::DuplicateKey => "The id is duplicated.",
            Notice::Approved => "Data have been approved successfully",
            Notice::Rejected => "Data have been rejected successfully",
            Notice::ApproverConflict => "Data have been approved or rejected by another approver.",
            Notice::ApproveConflict => {
                "Data have been changed. Please refresh screen and try to approve again."
            }
            Notice::RejectConflict => {
                "Data have been changed. Please refresh screen and try to reject again."
            }
            Notice::Deleted => "Data have been deleted successfully",
            Notice::DeleteFailed => "This item was not deleted successfully",
        };
        f.write_str(text)
    }
}

/// Summary line under a result table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSummary {
    NoData,
    Page {
        from: u64,
        to: u64,
        total: u64,
        page: u32,
        pages: u64,
    },
}

impl SearchSummary {
    /// Builds the summary of one page holding `len` rows.
    pub fn new(total: u64, page: u32, limit: u32, len: usize) -> Self {
        if total == 0 || len == 0 {
            return SearchSummary::NoData;
        }
        let limit = u64::from(limit.max(1));
        let offset = u64::from(page.saturating_sub(1)) * limit;
        SearchSummary::Page {
            from: offset + 1,
            to: offset + len as u64,
            total,
            page,
            pages: total.div_ceil(limit),
        }
    }

    pub fn resource_key(&self) -> &'static str {
        match self {
            SearchSummary::NoData => "msg_no_data_found",
            SearchSummary::Page { .. } => "msg_search_result_page_sequence",
        }
    }
}

impl fmt::Display for SearchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchSummary::NoData => f.write_str("No data found."),
            SearchSummary::Page {
                from,
                to,
                total,
                page,
                pages,
            } => write!(
                f,
                "Items {from} to {to} of {total}. Page {page} of {pages}."
            ),
        }
    }
}
