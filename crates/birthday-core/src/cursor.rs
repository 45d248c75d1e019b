//! Page cursor: resumable traversal of a cursor-paginated list endpoint
//!
//! # States
//!
//! ```text
//! NotStarted ──start()──▶ InProgress { page_token: None }
//!                              │ fetch_next(): page with nextPageToken = t
//!                              ▼
//!                         InProgress { page_token: Some(t) }
//!                              │ fetch_next(): page without nextPageToken
//!                              ▼
//!                          Exhausted ──fetch_next()──▶ Ok(None), no request
//! ```
//!
//! `start()` may be called again from any state; it re-authorizes and
//! rewinds to the first page. The page token lives only in cursor state,
//! never in the base request, so a restart cannot resend a stale token.

use tracing::debug;

use crate::model::{ListRequest, ListResponse};
use crate::service::{Authorizer, ContactService};
use crate::{Error, Result};

/// Position of a cursor in its traversal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorState {
    NotStarted,
    /// `None` means the first page has not been requested yet
    InProgress { page_token: Option<String> },
    Exhausted,
}

pub struct PageCursor<A: Authorizer> {
    authorizer: A,
    request: ListRequest,
    service: Option<A::Service>,
    state: CursorState,
    pages_fetched: usize,
}

impl<A: Authorizer> PageCursor<A> {
    pub fn new(authorizer: A, mut request: ListRequest) -> Self {
        request.page_token = None;
        Self {
            authorizer,
            request,
            service: None,
            state: CursorState::NotStarted,
            pages_fetched: 0,
        }
    }

    /// Acquire a fresh authorized session and rewind to the first page
    pub fn start(&mut self) -> Result<()> {
        self.service = Some(self.authorizer.authorize()?);
        self.state = CursorState::InProgress { page_token: None };
        self.pages_fetched = 0;
        debug!(resource = %self.request.resource_name, "page cursor started");
        Ok(())
    }

    /// Fetch the next page, or `Ok(None)` once the final page has been returned
    ///
    /// Service errors are returned as-is and leave the cursor where it was.
    pub fn fetch_next(&mut self) -> Result<Option<ListResponse>> {
        let page_token = match &self.state {
            CursorState::NotStarted => return Err(Error::CursorNotStarted),
            CursorState::Exhausted => return Ok(None),
            CursorState::InProgress { page_token } => page_token.clone(),
        };
        let service = self.service.as_mut().ok_or(Error::CursorNotStarted)?;

        let request = ListRequest {
            page_token,
            ..self.request.clone()
        };
        debug!(
            page = self.pages_fetched + 1,
            token = request.page_token.as_deref().unwrap_or("<first>"),
            "listing contacts"
        );
        let page = service.list(&request)?;

        self.pages_fetched += 1;
        self.state = match &page.next_page_token {
            Some(token) => CursorState::InProgress {
                page_token: Some(token.clone()),
            },
            None => CursorState::Exhausted,
        };
        Ok(Some(page))
    }

    /// Start (or restart) and iterate lazily over every page
    pub fn pages(&mut self) -> Result<Pages<'_, A>> {
        self.start()?;
        Ok(Pages {
            cursor: self,
            failed: false,
        })
    }

    pub fn state(&self) -> &CursorState {
        &self.state
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// The authorized session of the current traversal, for write-back
    pub fn service_mut(&mut self) -> Option<&mut A::Service> {
        self.service.as_mut()
    }
}

/// Iterator over the pages of one traversal; stops after the first error
pub struct Pages<'a, A: Authorizer> {
    cursor: &'a mut PageCursor<A>,
    failed: bool,
}

impl<A: Authorizer> Iterator for Pages<'_, A> {
    type Item = Result<ListResponse>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.cursor.fetch_next() {
            Ok(Some(page)) => Some(Ok(page)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
