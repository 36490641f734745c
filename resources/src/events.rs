//! Notification list handler.

use cloudmock_core::envelope::Response;
use cloudmock_core::error::MockError;
use cloudmock_runtime::{MatchedRequest, MockState};

/// `GET /v4/account/events`, newest first
///
/// # Errors
///
/// Validation errors for bad paging parameters or filters.
pub fn list(state: &MockState, request: &MatchedRequest<'_>) -> Result<Response, MockError> {
    let page = request.page_request(state.config())?;
    let query = request.list_query()?;
    let mut events = state.events();
    events.reverse();
    Response::page(&page.paginate(query.apply(events)?))
}
