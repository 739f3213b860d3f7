// Pagination + search state machine sitting between the repository and the screen
//
// All state lives behind one mutex that is only held while a transition is
// applied. Network calls run on spawned tasks and report back through
// `complete`, which checks the session epoch before touching anything.
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::{
    models::{Event, EventPage, PageMetadata},
    repository::{DomainResult, EventRepository},
};

/// Shorter queries don't trigger a search. Product call, not an API limit.
pub const MIN_SEARCH_QUERY_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchMode {
    Browse,
    Search(String),
}

impl FetchMode {
    pub fn is_search(&self) -> bool {
        matches!(self, FetchMode::Search(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    Fetching,
    Exhausted,
    Errored,
}

/// Everything the presentation layer gets told
///
/// A session reset always emits `EventsCleared`, and a reset that also
/// crosses between browse and search follows it with `SearchModeChanged`.
/// Seeing the pair means the listing started over in the new mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// Events new to this session, in first-seen order
    EventsAppended(Vec<Event>),
    /// The session was replaced; drop whatever is on screen
    EventsCleared,
    LoadingChanged(bool),
    ExhaustedChanged(bool),
    /// User-facing message, never the raw error
    ErrorOccurred(String),
    SearchModeChanged(bool),
    EventSelected(Event),
}

/// Read-only copy of the current session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub mode: FetchMode,
    pub state: FetchState,
    pub current_page: u32,
    pub total_pages: Option<u32>,
    pub is_loading: bool,
    pub is_exhausted: bool,
    pub events: Vec<Event>,
}

/// Receiving end of the controller's event stream
///
/// Drop it (or call `dispose`) to unsubscribe.
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<ControllerEvent>,
}

impl Subscription {
    /// Wait for the next event. `None` once the controller is gone.
    pub async fn recv(&mut self) -> Option<ControllerEvent> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<ControllerEvent> {
        self.receiver.try_recv().ok()
    }

    /// Everything queued right now
    pub fn drain(&mut self) -> Vec<ControllerEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    pub fn dispose(self) {}
}

/// One (mode, query, page counter) lifetime
struct FetchSession {
    epoch: u64,
    mode: FetchMode,
    state: FetchState,
    current_page: u32,
    total_pages: Option<u32>,
    events: Vec<Event>,
    seen: HashSet<String>,
    in_flight: Option<AbortHandle>,
}

impl FetchSession {
    fn new(mode: FetchMode, epoch: u64) -> Self {
        Self {
            epoch,
            mode,
            state: FetchState::Idle,
            current_page: 0,
            total_pages: None,
            events: Vec::new(),
            seen: HashSet::new(),
            in_flight: None,
        }
    }

    fn is_loading(&self) -> bool {
        self.state == FetchState::Fetching
    }

    fn is_exhausted(&self) -> bool {
        self.state == FetchState::Exhausted
    }

    /// Append events we haven't seen yet, returning just those
    fn append_unique(&mut self, events: Vec<Event>) -> Vec<Event> {
        let fresh: Vec<Event> = events
            .into_iter()
            .filter(|event| self.seen.insert(event.id.clone()))
            .collect();
        self.events.extend(fresh.iter().cloned());
        fresh
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            mode: self.mode.clone(),
            state: self.state,
            current_page: self.current_page,
            total_pages: self.total_pages,
            is_loading: self.is_loading(),
            is_exhausted: self.is_exhausted(),
            events: self.events.clone(),
        }
    }
}

struct Inner {
    session: FetchSession,
    subscribers: Vec<mpsc::UnboundedSender<ControllerEvent>>,
}

impl Inner {
    /// Fan out to every live subscriber, forgetting the ones that hung up
    fn emit(&mut self, event: ControllerEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}

struct Shared {
    repository: Arc<dyn EventRepository>,
    runtime: Handle,
    inner: Mutex<Inner>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Nothing that can panic runs between two session writes, so a
        // poisoned lock still holds usable state
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply the result of a fetch, unless the session moved on without it
    fn complete(&self, epoch: u64, page: u32, result: DomainResult<EventPage>) {
        let mut inner = self.lock();

        if inner.session.epoch != epoch {
            debug!("Dropping page {} from superseded session {}", page, epoch);
            return;
        }

        inner.session.in_flight = None;

        match result {
            Ok(event_page) => {
                // The first total we learn is the one we paginate against
                let reported = event_page.page_meta.total_pages;
                let total_pages = *inner.session.total_pages.get_or_insert(reported);
                if reported != total_pages {
                    debug!(
                        "Page {} reports {} pages, keeping the first known total of {}",
                        page, reported, total_pages
                    );
                }
                let page_meta = PageMetadata {
                    total_pages,
                    ..event_page.page_meta
                };

                let exhausted = event_page.is_empty()
                    || page_meta.is_last_page(page)
                    || event_page.is_short();

                if !event_page.is_empty() {
                    inner.session.current_page = page + 1;
                }

                let received = event_page.events.len();
                let fresh = inner.session.append_unique(event_page.events);
                debug!(
                    "Page {} brought {} events, {} new (session {})",
                    page,
                    received,
                    fresh.len(),
                    epoch
                );

                if !fresh.is_empty() {
                    inner.emit(ControllerEvent::EventsAppended(fresh));
                }

                if exhausted {
                    info!(
                        "All pages fetched: {} events in total",
                        inner.session.events.len()
                    );
                    inner.session.state = FetchState::Exhausted;
                    inner.emit(ControllerEvent::ExhaustedChanged(true));
                } else {
                    inner.session.state = FetchState::Idle;
                }
            }
            Err(err) => {
                warn!("Fetching page {} failed: {}", page, err);
                inner.session.state = FetchState::Errored;
                inner.emit(ControllerEvent::ErrorOccurred(err.user_message().to_string()));
            }
        }

        inner.emit(ControllerEvent::LoadingChanged(false));
    }
}

/// The pagination/search controller
///
/// Cheap to clone; every clone drives the same session. Commands never
/// block on the network and may come from any thread: fetches are spawned
/// onto the runtime the controller was built with.
#[derive(Clone)]
pub struct EventsController {
    shared: Arc<Shared>,
}

impl EventsController {
    /// Starts in browse mode on page 0. Nothing is fetched until asked.
    ///
    /// # Panics
    ///
    /// Outside a Tokio runtime. Use [`EventsController::with_runtime`] there.
    pub fn new(repository: Arc<dyn EventRepository>) -> Self {
        Self::with_runtime(repository, Handle::current())
    }

    /// Like `new`, but fetches run on `runtime`
    pub fn with_runtime(repository: Arc<dyn EventRepository>, runtime: Handle) -> Self {
        Self {
            shared: Arc::new(Shared {
                repository,
                runtime,
                inner: Mutex::new(Inner {
                    session: FetchSession::new(FetchMode::Browse, 0),
                    subscribers: Vec::new(),
                }),
            }),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.shared.lock().subscribers.push(sender);
        Subscription { receiver }
    }

    /// Ask for the next page. Returns whether a fetch actually started.
    ///
    /// Dropped (not queued) while a fetch is in flight or once the listing
    /// is exhausted. From `Errored` this retries the page that failed.
    pub fn request_next_page(&self) -> bool {
        let mut inner = self.shared.lock();
        self.start_fetch(&mut inner)
    }

    /// Switch to searching for `query`
    ///
    /// Queries under four characters are ignored outright: no reset, no
    /// fetch. Anything longer starts a fresh search session and fetches its
    /// first page. Returns whether that happened.
    pub fn set_search_query(&self, query: &str) -> bool {
        if query.chars().count() < MIN_SEARCH_QUERY_LEN {
            debug!("Ignoring short search query {:?}", query);
            return false;
        }

        let mut inner = self.shared.lock();
        Self::replace_session(&mut inner, FetchMode::Search(query.to_string()));
        self.start_fetch(&mut inner)
    }

    /// Enter or leave search mode. Always a full reset, never a fetch.
    pub fn set_search_active(&self, active: bool) {
        let mode = if active {
            FetchMode::Search(String::new())
        } else {
            FetchMode::Browse
        };

        let mut inner = self.shared.lock();
        Self::replace_session(&mut inner, mode);
    }

    /// Look up an event in the current session and announce the selection
    pub fn select_event(&self, id: &str) -> Option<Event> {
        let mut inner = self.shared.lock();

        let Some(event) = inner.session.events.iter().find(|e| e.id == id).cloned() else {
            warn!("Selected event {} is not in the current session", id);
            return None;
        };

        inner.emit(ControllerEvent::EventSelected(event.clone()));
        Some(event)
    }

    /// Start over in the same mode without fetching
    pub fn reset(&self) {
        let mut inner = self.shared.lock();
        let mode = inner.session.mode.clone();
        Self::replace_session(&mut inner, mode);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.lock().session.snapshot()
    }

    fn start_fetch(&self, inner: &mut Inner) -> bool {
        let session = &mut inner.session;

        match session.state {
            FetchState::Fetching => {
                debug!("Fetch already in flight, dropping request");
                return false;
            }
            FetchState::Exhausted => {
                debug!("Nothing left to fetch, dropping request");
                return false;
            }
            FetchState::Idle | FetchState::Errored => {}
        }

        if let FetchMode::Search(query) = &session.mode {
            if query.chars().count() < MIN_SEARCH_QUERY_LEN {
                debug!("No usable search query yet, dropping request");
                return false;
            }
        }

        let epoch = session.epoch;
        let page = session.current_page;
        let mode = session.mode.clone();
        debug!("Fetching page {} in {:?} (session {})", page, mode, epoch);

        // Spawn before touching the session. The task can't apply its
        // result until this lock is released.
        let shared = Arc::clone(&self.shared);
        let handle = self.shared.runtime.spawn(async move {
            let result = match &mode {
                FetchMode::Browse => shared.repository.fetch_page(page).await,
                FetchMode::Search(query) => shared.repository.search_page(query, page).await,
            };
            shared.complete(epoch, page, result);
        });

        session.state = FetchState::Fetching;
        session.in_flight = Some(handle.abort_handle());
        inner.emit(ControllerEvent::LoadingChanged(true));
        true
    }

    /// Swap in a fresh session, cancelling whatever the old one had in flight
    fn replace_session(inner: &mut Inner, mode: FetchMode) {
        let next_epoch = inner.session.epoch + 1;
        let old = std::mem::replace(&mut inner.session, FetchSession::new(mode, next_epoch));

        if let Some(handle) = old.in_flight {
            debug!("Cancelling in-flight fetch from session {}", old.epoch);
            handle.abort();
        }

        let now_search = inner.session.mode.is_search();
        debug!("Session {} replaced by {:?}", old.epoch, inner.session.mode);

        if old.state == FetchState::Fetching {
            inner.emit(ControllerEvent::LoadingChanged(false));
        }
        if old.state == FetchState::Exhausted {
            inner.emit(ControllerEvent::ExhaustedChanged(false));
        }
        inner.emit(ControllerEvent::EventsCleared);
        if old.mode.is_search() != now_search {
            inner.emit(ControllerEvent::SearchModeChanged(now_search));
        }
    }
}
