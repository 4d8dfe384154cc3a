//! Reactive data loading for a single URL.
//!
//! `DataLoader` tracks the loading/error/data state of one request target.
//! Pointing it at a new URL starts a fetch on a background task; results
//! come back over an MPSC channel and are applied by `poll` or `settle`.
//!
//! Each fetch cycle is tagged with a generation number. Changing the URL
//! aborts the in-flight task, and any result that still arrives from an
//! older generation is discarded, so a slow response can never overwrite
//! the state of a newer request.

use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::api::{ApiClient, ApiError, INVALID_URL_MESSAGE};

/// Buffer size for the result channel.
/// Superseded tasks are aborted, so only a handful of results can be queued.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Observable state of a load.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    pub data: Option<T>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            error: None,
        }
    }
}

/// Where a loader is in its `Idle -> Loading -> {Success, Error}` cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    Loading,
    Success,
    Error,
}

impl<T> FetchState<T> {
    pub fn phase(&self) -> LoadPhase {
        if self.is_loading {
            LoadPhase::Loading
        } else if self.error.is_some() {
            LoadPhase::Error
        } else if self.data.is_some() {
            LoadPhase::Success
        } else {
            LoadPhase::Idle
        }
    }
}

struct LoadResult<T> {
    generation: u64,
    result: Result<T, ApiError>,
}

pub struct DataLoader<T> {
    api: ApiClient,
    url: Option<String>,
    generation: u64,
    state: FetchState<T>,
    result_tx: mpsc::Sender<LoadResult<T>>,
    result_rx: mpsc::Receiver<LoadResult<T>>,
    in_flight: Option<JoinHandle<()>>,
}

impl<T> DataLoader<T>
where
    T: DeserializeOwned + Send + 'static,
{
    pub fn new(api: ApiClient) -> Self {
        let (result_tx, result_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        Self {
            api,
            url: None,
            generation: 0,
            state: FetchState::default(),
            result_tx,
            result_rx,
            in_flight: None,
        }
    }

    pub fn state(&self) -> &FetchState<T> {
        &self.state
    }

    /// Current request target, `None` until the first `set_url`
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Point the loader at `url`.
    ///
    /// Starts a new fetch cycle when the URL differs from the previous one and
    /// returns whether it did. An empty URL sets the `Invalid API URL` error
    /// without touching the network. Must be called within a Tokio runtime.
    pub fn set_url(&mut self, url: &str) -> bool {
        if self.url.as_deref() == Some(url) {
            return false;
        }
        self.url = Some(url.to_string());
        self.start();
        true
    }

    /// Run the current URL again, e.g. after a failure
    pub fn refetch(&mut self) {
        if self.url.is_some() {
            self.start();
        }
    }

    fn start(&mut self) {
        self.cancel_in_flight();
        self.generation += 1;
        // Drop anything still queued from older generations
        self.poll();

        let url = self.url.clone().unwrap_or_default();
        if url.is_empty() {
            debug!("Empty request target, skipping fetch");
            self.state.error = Some(INVALID_URL_MESSAGE.to_string());
            self.state.is_loading = false;
            return;
        }

        debug!(url = %url, generation = self.generation, "Starting fetch");
        self.state.is_loading = true;

        let api = self.api.clone();
        let tx = self.result_tx.clone();
        let generation = self.generation;

        self.in_flight = Some(tokio::spawn(async move {
            let result = api.fetch_json::<T>(&url).await;
            if let Err(e) = tx.send(LoadResult { generation, result }).await {
                error!(error = %e, "Failed to send load result - channel closed");
            }
        }));
    }

    fn cancel_in_flight(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            if !handle.is_finished() {
                debug!(generation = self.generation, "Aborting superseded fetch");
                handle.abort();
            }
        }
    }

    /// Whether a fetch task is still running. A task that ended without
    /// reporting back is not pending; `settle` resolves it.
    pub fn is_pending(&self) -> bool {
        self.in_flight
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Apply any results that have arrived. Returns true if the state changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(message) = self.result_rx.try_recv() {
            changed |= self.apply(message);
        }
        changed
    }

    /// Wait for the current fetch cycle to finish and return the final state
    pub async fn settle(&mut self) -> &FetchState<T> {
        if let Some(handle) = self.in_flight.take() {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    error!(error = %e, "Fetch task panicked");
                }
            }
        }
        self.poll();

        if self.state.is_loading {
            // The task ended without reporting back
            self.state.is_loading = false;
            self.state.error = Some("Request was interrupted".to_string());
        }
        &self.state
    }

    fn apply(&mut self, message: LoadResult<T>) -> bool {
        if message.generation != self.generation {
            debug!(
                stale = message.generation,
                current = self.generation,
                "Discarding stale fetch result"
            );
            return false;
        }

        match message.result {
            Ok(data) => {
                self.state.data = Some(data);
                self.state.error = None;
            }
            Err(e) => {
                warn!(error = %e, url = ?self.url, "Fetch failed");
                self.state.error = Some(e.to_string());
            }
        }
        self.state.is_loading = false;
        self.in_flight = None;
        true
    }
}

impl<T> Drop for DataLoader<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::auth::MemoryCookieStore;
    use crate::config::ApiCredentials;

    fn loader() -> DataLoader<Vec<String>> {
        let api = ApiClient::new(
            ApiCredentials::new("http://127.0.0.1:9", "key", "me@example.com"),
            Arc::new(MemoryCookieStore::new()),
        )
        .unwrap();
        DataLoader::new(api)
    }

    #[tokio::test]
    async fn test_task_ending_silently_is_not_pending() {
        let mut loader = loader();
        loader.generation = 1;
        loader.state.is_loading = true;
        // A task that finishes without sending a result
        loader.in_flight = Some(tokio::spawn(async {}));

        while loader.is_pending() {
            tokio::task::yield_now().await;
        }
        assert!(!loader.poll());
        assert!(loader.state().is_loading);

        let state = loader.settle().await;
        assert!(!state.is_loading);
        assert_eq!(state.error.as_deref(), Some("Request was interrupted"));
        assert!(!loader.is_pending());
    }

    #[test]
    fn test_phase() {
        let mut state: FetchState<u32> = FetchState::default();
        assert_eq!(state.phase(), LoadPhase::Idle);

        state.is_loading = true;
        assert_eq!(state.phase(), LoadPhase::Loading);

        state.is_loading = false;
        state.data = Some(1);
        assert_eq!(state.phase(), LoadPhase::Success);

        // A failure after a success keeps the data but reports the error
        state.error = Some("boom".to_string());
        assert_eq!(state.phase(), LoadPhase::Error);
    }

    #[test]
    fn test_empty_url_is_invalid() {
        let mut loader = loader();
        assert!(loader.set_url(""));

        let state = loader.state();
        assert_eq!(state.error.as_deref(), Some("Invalid API URL"));
        assert!(!state.is_loading);
        assert!(state.data.is_none());
        assert!(loader.in_flight.is_none());
    }

    #[test]
    fn test_same_url_is_not_rerun() {
        let mut loader = loader();
        assert!(loader.set_url(""));
        assert!(!loader.set_url(""));
        assert_eq!(loader.generation, 1);
    }

    #[test]
    fn test_stale_result_is_discarded() {
        let mut loader = loader();
        loader.generation = 2;
        loader.state.is_loading = true;

        let applied = loader.apply(LoadResult {
            generation: 1,
            result: Ok(vec!["old".to_string()]),
        });
        assert!(!applied);
        assert!(loader.state.data.is_none());
        assert!(loader.state.is_loading);

        let applied = loader.apply(LoadResult {
            generation: 2,
            result: Ok(vec!["new".to_string()]),
        });
        assert!(applied);
        assert_eq!(loader.state.data, Some(vec!["new".to_string()]));
        assert!(!loader.state.is_loading);
    }

    #[test]
    fn test_error_keeps_previous_data() {
        let mut loader = loader();
        loader.generation = 1;
        loader.state.data = Some(vec!["kept".to_string()]);
        loader.state.is_loading = true;

        loader.apply(LoadResult {
            generation: 1,
            result: Err(ApiError::InvalidInput),
        });
        assert_eq!(loader.state.data, Some(vec!["kept".to_string()]));
        assert_eq!(loader.state.error.as_deref(), Some("Invalid API URL"));
        assert!(!loader.state.is_loading);
    }
}
