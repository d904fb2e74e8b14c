use std::sync::Arc;

use tokio::sync::mpsc;

use crate::client::{FetchError, SearchService};
use crate::data_models::{FilterState, SearchResponse};
use crate::pagination::Direction;
use crate::session::{PendingSearch, SearchSession, SessionError, Settlement};

/// Where the controller sends its user-visible effects.
pub trait SessionView {
    fn render(&mut self, session: &SearchSession);

    fn scroll_to_top(&mut self);

    /// A fetch failed. Must reach the user; nothing else reports it.
    fn alert(&mut self, message: &str);
}

#[derive(Debug)]
pub struct Completion {
    pub id: u64,
    pub outcome: Result<SearchResponse, FetchError>,
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("search failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("search ended without a response")]
    NoResponse,
}

/// Drives a [`SearchSession`] against a [`SearchService`].
///
/// Fetches run on spawned tokio tasks and report through the channel returned
/// by [`SearchController::new`]; whoever owns the event loop hands each
/// [`Completion`] back to [`SearchController::settle`]. The session accepts at
/// most one request at a time, so there is never more than one task running.
pub struct SearchController<S: SearchService + ?Sized, V: SessionView> {
    session: SearchSession,
    service: Arc<S>,
    view: V,
    completion_tx: mpsc::UnboundedSender<Completion>,
}

impl<S, V> SearchController<S, V>
where
    S: SearchService + ?Sized + 'static,
    V: SessionView,
{
    pub fn new(service: Arc<S>, view: V) -> (Self, mpsc::UnboundedReceiver<Completion>) {
        Self::with_session(service, view, SearchSession::new())
    }

    pub fn with_session(
        service: Arc<S>,
        view: V,
        session: SearchSession,
    ) -> (Self, mpsc::UnboundedReceiver<Completion>) {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let controller = SearchController {
            session,
            service,
            view,
            completion_tx,
        };
        (controller, completion_rx)
    }

    pub fn session(&self) -> &SearchSession {
        &self.session
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn into_view(self) -> V {
        self.view
    }

    pub fn set_keyword(&mut self, keyword: impl Into<String>) {
        self.session.set_keyword(keyword);
    }

    pub fn filters_mut(&mut self) -> &mut FilterState {
        self.session.filters_mut()
    }

    pub fn rerender(&mut self) {
        self.view.render(&self.session);
    }

    pub fn submit(&mut self) -> Result<u64, SessionError> {
        let pending = self.session.begin_submit()?;
        Ok(self.dispatch(pending))
    }

    pub fn navigate(&mut self, direction: Direction) -> Result<u64, SessionError> {
        let pending = self.session.begin_navigate(direction)?;
        Ok(self.dispatch(pending))
    }

    fn dispatch(&mut self, pending: PendingSearch) -> u64 {
        let PendingSearch { id, offset, query } = pending;
        log::info!("issuing request {id} at offset {offset}");

        let service = self.service.clone();
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let outcome = service.search(&query).await;
            if tx.send(Completion { id, outcome }).is_err() {
                log::warn!("request {id} finished after its session was dropped");
            }
        });

        self.view.render(&self.session);
        id
    }

    pub fn settle(&mut self, completion: Completion) -> Settlement {
        let settlement = self.session.settle(completion.id, completion.outcome);
        match &settlement {
            Settlement::Loaded => {
                self.view.scroll_to_top();
                self.view.render(&self.session);
            }
            Settlement::Failed(e) => {
                self.view.render(&self.session);
                self.view.alert(&format!("Search failed. {e}"));
            }
            Settlement::Ignored => {}
        }
        settlement
    }

    /// Waits for the request in flight and settles it. Returns `None` if
    /// nothing is in flight.
    pub async fn settle_next(
        &mut self,
        completions: &mut mpsc::UnboundedReceiver<Completion>,
    ) -> Option<Settlement> {
        while self.session.is_loading() {
            let completion = completions.recv().await?;
            match self.settle(completion) {
                Settlement::Ignored => continue,
                settled => return Some(settled),
            }
        }
        None
    }

    /// Submits, then walks forward to the 1-based `page`, stopping at the last
    /// page the total allows. Returns the page reached.
    pub async fn load_page(
        &mut self,
        completions: &mut mpsc::UnboundedReceiver<Completion>,
        page: u64,
    ) -> Result<u64, LoadError> {
        self.submit()?;
        self.await_loaded(completions).await?;

        let mut reached = 1;
        while reached < page {
            if !self.session.can_go_next() {
                log::info!("stopping at page {reached} of the requested {page}");
                break;
            }
            self.navigate(Direction::Next)?;
            self.await_loaded(completions).await?;
            reached += 1;
        }
        Ok(reached)
    }

    async fn await_loaded(
        &mut self,
        completions: &mut mpsc::UnboundedReceiver<Completion>,
    ) -> Result<(), LoadError> {
        match self.settle_next(completions).await {
            Some(Settlement::Loaded) => Ok(()),
            Some(Settlement::Failed(e)) => Err(LoadError::Fetch(e)),
            Some(Settlement::Ignored) | None => Err(LoadError::NoResponse),
        }
    }
}
