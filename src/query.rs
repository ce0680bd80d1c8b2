//! Async query coordinator with request fencing.
//!
//! A `Query<T>` tracks the state of one page-level data need: idle, pending,
//! success or error. Each trigger bumps a request id; a result is applied
//! only if its request id is still the latest, so a slow, superseded request
//! can never overwrite the answer to a newer one.
//!
//! # Example
//!
//! ```ignore
//! let query = Query::new();
//!
//! // Fire and forget from a key handler
//! let api = api.clone();
//! query.spawn(move || async move { api.list_employees(&filter).await });
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // In render
//! match query.status() {
//!     QueryStatus::Pending => render_spinner(),
//!     QueryStatus::Success => query.with_data(|data| render_data(data)),
//!     QueryStatus::Error => render_error(query.error()),
//!     QueryStatus::Idle => {}
//! }
//! ```

use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Lifecycle of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryStatus {
  /// Query has not been started, or was reset
  #[default]
  Idle,
  /// Latest request has not settled
  Pending,
  /// Latest request succeeded
  Success,
  /// Latest request failed
  Error,
}

/// Snapshot of a query's state.
#[derive(Debug, Clone)]
pub struct QueryState<T> {
  pub status: QueryStatus,
  /// Last successful result. Kept when a later request fails so stale data
  /// can be shown next to the error.
  pub data: Option<T>,
  pub error: Option<String>,
  /// Id of the latest trigger (or reset).
  pub request_id: u64,
  /// Bumped on every visible change, drives `poll`.
  version: u64,
}

impl<T> Default for QueryState<T> {
  fn default() -> Self {
    Self {
      status: QueryStatus::Idle,
      data: None,
      error: None,
      request_id: 0,
      version: 0,
    }
  }
}

/// Outcome of a triggered request, as seen by its caller.
///
/// `None` means the request was superseded by a newer trigger or a reset and
/// its result was discarded.
pub type Settled<T> = Option<Result<T, String>>;

/// Async query coordinator.
///
/// Query<T> encapsulates:
/// - Idle/pending/success/error state shared between clones
/// - Request fencing, so only the latest trigger's result is applied
///
/// It never retries on its own; retrying is calling `execute` again.
pub struct Query<T> {
  state: Arc<Mutex<QueryState<T>>>,
  /// Last version observed by `poll` through this handle.
  seen_version: u64,
}

impl<T> Query<T>
where
  T: Clone + Send + 'static,
{
  pub fn new() -> Self {
    Self {
      state: Arc::new(Mutex::new(QueryState::default())),
      seen_version: 0,
    }
  }

  /// Trigger a request and wait for it.
  ///
  /// The request id is taken and the state set to pending when this is
  /// called, not when the returned future is first polled, so triggers are
  /// ordered by call order. On settle the result is applied only if no newer
  /// trigger or reset happened meanwhile.
  pub fn execute<F, Fut>(&self, f: F) -> impl Future<Output = Settled<T>>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, String>>,
  {
    let request_id = self.begin();
    let future = f();
    let state = Arc::clone(&self.state);

    async move {
      let result = future.await;
      settle(&state, request_id, result)
    }
  }

  /// Trigger a request on the tokio runtime without waiting for it.
  pub fn spawn<F, Fut>(&self, f: F) -> JoinHandle<Settled<T>>
  where
    F: FnOnce() -> Fut + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    tokio::spawn(self.execute(f))
  }

  /// Back to idle. Clears data and error and fences out anything in flight.
  pub fn reset(&self) {
    let mut state = self.state.lock();
    state.request_id += 1;
    state.status = QueryStatus::Idle;
    state.data = None;
    state.error = None;
    state.version += 1;
  }

  fn begin(&self) -> u64 {
    let mut state = self.state.lock();
    state.request_id += 1;
    state.status = QueryStatus::Pending;
    state.version += 1;
    state.request_id
  }

  /// Check whether the state changed since the last poll through this
  /// handle. Call this in your event loop tick handler.
  pub fn poll(&mut self) -> bool {
    let version = self.state.lock().version;
    let changed = version != self.seen_version;
    self.seen_version = version;
    changed
  }

  /// Borrow the current data without cloning it.
  pub fn with_data<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
    let state = self.state.lock();
    f(state.data.as_ref())
  }

  pub fn data(&self) -> Option<T> {
    self.state.lock().data.clone()
  }

  pub fn status(&self) -> QueryStatus {
    self.state.lock().status
  }

  pub fn error(&self) -> Option<String> {
    self.state.lock().error.clone()
  }

  pub fn request_id(&self) -> u64 {
    self.state.lock().request_id
  }

  /// Check if the latest request is still running.
  pub fn is_loading(&self) -> bool {
    self.status() == QueryStatus::Pending
  }

  /// Check if the latest request failed.
  pub fn is_error(&self) -> bool {
    self.status() == QueryStatus::Error
  }
}

fn settle<T: Clone>(
  state: &Mutex<QueryState<T>>,
  request_id: u64,
  result: Result<T, String>,
) -> Settled<T> {
  let mut state = state.lock();
  if state.request_id != request_id {
    debug!(
      "discarding result of request {} (latest is {})",
      request_id, state.request_id
    );
    return None;
  }

  match &result {
    Ok(data) => {
      state.status = QueryStatus::Success;
      state.data = Some(data.clone());
      state.error = None;
    }
    Err(e) => {
      state.status = QueryStatus::Error;
      state.error = Some(e.clone());
    }
  }
  state.version += 1;

  Some(result)
}

impl<T> Default for Query<T>
where
  T: Clone + Send + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

// Clones share state; each clone polls independently.
impl<T> Clone for Query<T> {
  fn clone(&self) -> Self {
    Self {
      state: Arc::clone(&self.state),
      seen_version: self.seen_version,
    }
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &*self.state.lock())
      .finish_non_exhaustive()
  }
}
