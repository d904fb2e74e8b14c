use crate::client::FetchError;
use crate::data_models::{FilterState, SearchResponse};
use crate::pagination::{self, Direction, PageWindow};
use crate::query::{QueryParams, serialize_query};

pub const PAGE_LIMIT: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Loading,
    Loaded,
    /// Last fetch failed; carries the message shown to the user.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("a search is already in progress")]
    Busy,

    #[error("cannot go to the {0} page from here")]
    NavigationNotPermitted(Direction),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    pub keyword: String,
    pub filters: FilterState,
}

/// A request the session has committed to. Hand `query` to the service and
/// pass the outcome back to [`SearchSession::settle`] with the same `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSearch {
    pub id: u64,
    pub offset: u64,
    pub query: QueryParams,
}

#[derive(Debug)]
pub enum Settlement {
    Loaded,
    Failed(FetchError),
    /// The outcome did not belong to the request in flight and was dropped.
    Ignored,
}

#[derive(Debug)]
struct InFlight {
    id: u64,
    offset: u64,
    restore_offset: u64,
    criteria: SearchCriteria,
}

/// State of one search session: criteria being edited, the page on screen and
/// the request in flight, if any. Performs no I/O.
#[derive(Debug)]
pub struct SearchSession {
    keyword: String,
    filters: FilterState,
    offset: u64,
    limit: u64,
    state: SessionState,
    last_response: Option<SearchResponse>,
    active: Option<SearchCriteria>,
    in_flight: Option<InFlight>,
    next_id: u64,
}

impl Default for SearchSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchSession {
    pub fn new() -> Self {
        Self::with_limit(PAGE_LIMIT)
    }

    pub fn with_limit(limit: u64) -> Self {
        Self {
            keyword: String::new(),
            filters: FilterState::new(),
            offset: 0,
            limit: limit.max(1),
            state: SessionState::Idle,
            last_response: None,
            active: None,
            in_flight: None,
            next_id: 1,
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn set_keyword(&mut self, keyword: impl Into<String>) {
        self.keyword = keyword.into();
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    /// Filters stay editable while a fetch is in flight; the edits apply to
    /// the next submit.
    pub fn filters_mut(&mut self) -> &mut FilterState {
        &mut self.filters
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == SessionState::Loading
    }

    pub fn last_response(&self) -> Option<&SearchResponse> {
        self.last_response.as_ref()
    }

    pub fn active_criteria(&self) -> Option<&SearchCriteria> {
        self.active.as_ref()
    }

    fn known_total(&self) -> u64 {
        self.last_response.as_ref().map_or(0, |r| r.total)
    }

    pub fn can_go_previous(&self) -> bool {
        !self.is_loading() && self.active.is_some() && pagination::can_go_previous(self.offset)
    }

    pub fn can_go_next(&self) -> bool {
        !self.is_loading()
            && self.active.is_some()
            && pagination::can_go_next(self.known_total(), self.offset, self.limit)
    }

    pub fn page_window(&self) -> Option<PageWindow> {
        self.last_response
            .as_ref()
            .map(|r| PageWindow::new(r.total, self.offset, self.limit, r.contents.len()))
    }

    pub fn begin_submit(&mut self) -> Result<PendingSearch, SessionError> {
        if self.is_loading() {
            log::debug!("submit ignored, request {:?} in flight", self.in_flight_id());
            return Err(SessionError::Busy);
        }

        let criteria = SearchCriteria {
            keyword: self.keyword.clone(),
            filters: self.filters.clone(),
        };
        Ok(self.issue(criteria, 0))
    }

    pub fn begin_navigate(&mut self, direction: Direction) -> Result<PendingSearch, SessionError> {
        if self.is_loading() {
            log::debug!("{direction} ignored, request {:?} in flight", self.in_flight_id());
            return Err(SessionError::Busy);
        }

        let criteria = match &self.active {
            Some(criteria)
                if pagination::can_go(direction, self.known_total(), self.offset, self.limit) =>
            {
                criteria.clone()
            }
            _ => return Err(SessionError::NavigationNotPermitted(direction)),
        };

        let offset = pagination::next_offset(self.offset, self.limit, direction);
        Ok(self.issue(criteria, offset))
    }

    fn issue(&mut self, criteria: SearchCriteria, offset: u64) -> PendingSearch {
        let id = self.next_id;
        self.next_id += 1;

        let query = serialize_query(&criteria.keyword, &criteria.filters, offset, self.limit);
        self.in_flight = Some(InFlight {
            id,
            offset,
            restore_offset: self.offset,
            criteria,
        });
        self.offset = offset;
        self.state = SessionState::Loading;

        PendingSearch { id, offset, query }
    }

    fn in_flight_id(&self) -> Option<u64> {
        self.in_flight.as_ref().map(|f| f.id)
    }

    /// Applies the outcome of request `id`. On failure the page on screen,
    /// its offset and its criteria are kept.
    pub fn settle(&mut self, id: u64, outcome: Result<SearchResponse, FetchError>) -> Settlement {
        let in_flight = match self.in_flight.take() {
            Some(f) if f.id == id => f,
            other => {
                log::warn!(
                    "dropping outcome of request {id}, in flight: {:?}",
                    other.as_ref().map(|f| f.id)
                );
                self.in_flight = other;
                return Settlement::Ignored;
            }
        };

        match outcome {
            Ok(response) => {
                log::info!(
                    "request {id} loaded {} of {} results at offset {}",
                    response.contents.len(),
                    response.total,
                    in_flight.offset
                );
                self.offset = in_flight.offset;
                self.active = Some(in_flight.criteria);
                self.last_response = Some(response);
                self.state = SessionState::Loaded;
                Settlement::Loaded
            }
            Err(e) => {
                log::error!("request {id} failed: {:#}", e);
                self.offset = in_flight.restore_offset;
                self.state = SessionState::Failed(e.to_string());
                Settlement::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_models::{Category, ResultItem, ResultMetadata};
    use crate::query::params;

    fn page(total: u64, count: usize) -> SearchResponse {
        SearchResponse {
            total,
            contents: (0..count)
                .map(|i| ResultItem {
                    title: format!("Article {i}"),
                    content: "body".to_string(),
                    metadata: ResultMetadata {
                        title: "Magazine".to_string(),
                        author: "Author".to_string(),
                        publication_date: "2020-01-01".to_string(),
                        category: Category::Science,
                    },
                })
                .collect(),
        }
    }

    fn failure() -> FetchError {
        FetchError::Status(reqwest::StatusCode::BAD_GATEWAY)
    }

    fn value<'a>(pending: &'a PendingSearch, name: &str) -> Option<&'a str> {
        pending
            .query
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    fn loaded(total: u64) -> SearchSession {
        let mut session = SearchSession::new();
        let pending = session.begin_submit().unwrap();
        session.settle(pending.id, Ok(page(total, 10)));
        session
    }

    #[test]
    fn test_new_session_is_idle_and_empty() {
        let session = SearchSession::new();
        assert_eq!(session.state(), &SessionState::Idle);
        assert_eq!(session.offset(), 0);
        assert_eq!(session.limit(), PAGE_LIMIT);
        assert!(session.last_response().is_none());
        assert!(!session.can_go_next());
        assert!(!session.can_go_previous());
    }

    #[test]
    fn test_submit_enters_loading() {
        let mut session = SearchSession::new();
        session.set_keyword("climate");
        let pending = session.begin_submit().unwrap();
        assert!(session.is_loading());
        assert_eq!(value(&pending, params::KEYWORD), Some("climate"));
        assert_eq!(value(&pending, params::LIMIT), Some("10"));
    }

    #[test]
    fn test_submit_resets_offset() {
        let mut session = loaded(50);
        let pending = session.begin_navigate(Direction::Next).unwrap();
        session.settle(pending.id, Ok(page(50, 10)));
        assert_eq!(session.offset(), 10);

        let pending = session.begin_submit().unwrap();
        assert_eq!(pending.offset, 0);
        assert_eq!(value(&pending, params::OFFSET), Some("0"));
        assert_eq!(session.offset(), 0);
    }

    #[test]
    fn test_submit_while_loading_has_no_effect() {
        let mut session = SearchSession::new();
        let first = session.begin_submit().unwrap();
        session.set_keyword("changed");

        assert_eq!(session.begin_submit(), Err(SessionError::Busy));
        assert_eq!(
            session.begin_navigate(Direction::Next),
            Err(SessionError::Busy)
        );
        assert!(session.is_loading());

        session.settle(first.id, Ok(page(3, 3)));
        assert_eq!(session.state(), &SessionState::Loaded);
        assert!(session.begin_submit().is_ok());
    }

    #[test]
    fn test_navigation_is_gated() {
        let mut session = loaded(25);
        assert_eq!(
            session.begin_navigate(Direction::Prev),
            Err(SessionError::NavigationNotPermitted(Direction::Prev))
        );

        let pending = session.begin_navigate(Direction::Next).unwrap();
        assert_eq!(pending.offset, 10);
        session.settle(pending.id, Ok(page(25, 10)));

        let pending = session.begin_navigate(Direction::Next).unwrap();
        assert_eq!(pending.offset, 20);
        session.settle(pending.id, Ok(page(25, 5)));

        assert!(!session.can_go_next());
        assert_eq!(
            session.begin_navigate(Direction::Next),
            Err(SessionError::NavigationNotPermitted(Direction::Next))
        );
        assert_eq!(session.state(), &SessionState::Loaded);

        let pending = session.begin_navigate(Direction::Prev).unwrap();
        assert_eq!(pending.offset, 10);
    }

    #[test]
    fn test_navigation_before_any_search_is_rejected() {
        let mut session = SearchSession::new();
        assert!(session.begin_navigate(Direction::Next).is_err());
        assert_eq!(session.state(), &SessionState::Idle);
    }

    #[test]
    fn test_navigation_keeps_submitted_criteria() {
        let mut session = SearchSession::new();
        session.set_keyword("climate");
        let pending = session.begin_submit().unwrap();
        session.settle(pending.id, Ok(page(30, 10)));

        session.set_keyword("edited but not submitted");
        session.filters_mut().toggle_category(Category::Food);

        let pending = session.begin_navigate(Direction::Next).unwrap();
        assert_eq!(value(&pending, params::KEYWORD), Some("climate"));
        assert_eq!(value(&pending, params::CATEGORY), None);
    }

    #[test]
    fn test_failure_preserves_prior_data() {
        let mut session = loaded(25);
        let before = session.last_response().cloned();

        let pending = session.begin_navigate(Direction::Next).unwrap();
        assert_eq!(session.offset(), 10);
        let settlement = session.settle(pending.id, Err(failure()));

        assert!(matches!(settlement, Settlement::Failed(_)));
        assert!(matches!(session.state(), SessionState::Failed(_)));
        assert_eq!(session.last_response().cloned(), before);
        assert_eq!(session.offset(), 0);
        assert!(session.can_go_next());
    }

    #[test]
    fn test_failed_session_accepts_new_submit() {
        let mut session = SearchSession::new();
        let pending = session.begin_submit().unwrap();
        session.settle(pending.id, Err(failure()));
        assert!(session.last_response().is_none());

        let pending = session.begin_submit().unwrap();
        session.settle(pending.id, Ok(page(1, 1)));
        assert_eq!(session.state(), &SessionState::Loaded);
    }

    #[test]
    fn test_unknown_outcome_is_ignored() {
        let mut session = SearchSession::new();
        let pending = session.begin_submit().unwrap();

        let settlement = session.settle(pending.id + 100, Ok(page(9, 9)));
        assert!(matches!(settlement, Settlement::Ignored));
        assert!(session.is_loading());

        session.settle(pending.id, Ok(page(1, 1)));
        assert!(matches!(
            session.settle(pending.id, Ok(page(2, 2))),
            Settlement::Ignored
        ));
        assert_eq!(session.last_response().map(|r| r.total), Some(1));
    }

    #[test]
    fn test_page_window_follows_offset() {
        let mut session = loaded(25);
        let pending = session.begin_navigate(Direction::Next).unwrap();
        session.settle(pending.id, Ok(page(25, 10)));
        let window = session.page_window().unwrap();
        assert_eq!((window.first, window.last, window.page), (11, 20, 2));
    }
}
