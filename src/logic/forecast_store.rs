use crate::datasources::{ForecastRequest, ForecastSource};
use crate::error::{ClimaError, Result};
use crate::models::ForecastSeries;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Outcome of the latest background fetch
#[derive(Debug)]
pub enum FetchEvent {
    Loaded(Arc<ForecastSeries>),
    Failed(ClimaError),
}

struct Completion {
    generation: u64,
    result: Result<ForecastSeries>,
}

/// Holds the current forecast and runs refreshes in the background.
///
/// Every `request` bumps a generation counter and aborts the previous
/// task. Completions carry the generation they were started with, and
/// `poll` drops anything that is not from the latest request, so a slow
/// stale response can never replace fresher data.
pub struct ForecastStore {
    source: Arc<ForecastSource>,
    generation: u64,
    in_flight: Option<JoinHandle<()>>,
    tx: UnboundedSender<Completion>,
    rx: UnboundedReceiver<Completion>,
    current: Option<Arc<ForecastSeries>>,
    last_request: Option<ForecastRequest>,
}

impl ForecastStore {
    pub fn new(source: ForecastSource) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            source: Arc::new(source),
            generation: 0,
            in_flight: None,
            tx,
            rx,
            current: None,
            last_request: None,
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// One-shot fetch that bypasses the held state
    pub async fn fetch(&self, request: &ForecastRequest) -> Result<ForecastSeries> {
        self.source.fetch(request).await
    }

    /// Start a background fetch, superseding any fetch in flight. Invalid
    /// requests are rejected here and never spawn a task.
    pub fn request(&mut self, request: ForecastRequest) -> Result<u64> {
        request.validate()?;

        if let Some(handle) = self.in_flight.take() {
            handle.abort();
            tracing::debug!(generation = self.generation, "superseded in-flight fetch");
        }

        self.generation += 1;
        let generation = self.generation;
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();

        tracing::debug!(generation, point = %request.point, days = request.horizon_days, "fetch started");
        self.in_flight = Some(tokio::spawn(async move {
            let result = source.fetch(&request).await;
            // Receiver lives as long as the store
            let _ = tx.send(Completion { generation, result });
        }));
        self.last_request = Some(request);

        Ok(generation)
    }

    /// Re-issue the last request, if any
    pub fn retry(&mut self) -> Result<Option<u64>> {
        match self.last_request {
            Some(request) => self.request(request).map(Some),
            None => Ok(None),
        }
    }

    /// Non-blocking check for the latest completion. Stale completions are
    /// discarded. A failure leaves the previously loaded series in place.
    pub fn poll(&mut self) -> Option<FetchEvent> {
        loop {
            let completion = match self.rx.try_recv() {
                Ok(c) => c,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {
                    return self.take_lost_task();
                }
            };

            if completion.generation != self.generation {
                tracing::debug!(
                    stale = completion.generation,
                    latest = self.generation,
                    "discarding stale fetch result"
                );
                continue;
            }

            self.in_flight = None;
            return Some(self.complete(completion));
        }
    }

    fn complete(&mut self, completion: Completion) -> FetchEvent {
        match completion.result {
            Ok(series) => {
                tracing::debug!(
                    generation = completion.generation,
                    days = series.len(),
                    "fetch completed"
                );
                let series = Arc::new(series);
                self.current = Some(Arc::clone(&series));
                FetchEvent::Loaded(series)
            }
            Err(e) => {
                tracing::warn!(generation = completion.generation, "fetch failed: {}", e);
                FetchEvent::Failed(e)
            }
        }
    }

    /// A task that finished without sending (it panicked) would otherwise
    /// leave the store loading forever.
    fn take_lost_task(&mut self) -> Option<FetchEvent> {
        if !self.in_flight.as_ref().is_some_and(|h| h.is_finished()) {
            return None;
        }
        // The send happens before the task finishes
        while let Ok(completion) = self.rx.try_recv() {
            if completion.generation == self.generation {
                self.in_flight = None;
                return Some(self.complete(completion));
            }
        }
        self.in_flight = None;
        tracing::warn!(generation = self.generation, "fetch task ended without a result");
        Some(FetchEvent::Failed(ClimaError::ForecastUnavailable(
            "fetch task ended unexpectedly".into(),
        )))
    }

    /// The most recent request, whether or not it succeeded
    pub fn last_request(&self) -> Option<ForecastRequest> {
        self.last_request
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Last successfully loaded series
    pub fn current(&self) -> Option<Arc<ForecastSeries>> {
        self.current.clone()
    }

    #[cfg(test)]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for ForecastStore {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasources::test_server::{self, forecast_payload};
    use crate::datasources::ForecastApiClient;
    use crate::models::forecast::fixtures;
    use crate::models::{Crop, GeoPoint};
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::Value;
    use std::time::Duration;

    fn request(days: u32) -> ForecastRequest {
        ForecastRequest {
            point: GeoPoint::new(18.5204, 73.8567),
            horizon_days: days,
            crop: Crop::Rice,
        }
    }

    /// Two-day requests are slow, everything else answers at once;
    /// nine-day requests fail.
    async fn store() -> ForecastStore {
        let router = Router::new().route(
            "/forecast",
            post(|Json(req): Json<Value>| async move {
                let days = req["forecast_days"].as_u64().unwrap_or(1) as usize;
                if days == 2 {
                    tokio::time::sleep(Duration::from_millis(600)).await;
                }
                if days == 9 {
                    return Err(StatusCode::INTERNAL_SERVER_ERROR);
                }
                Ok(Json(forecast_payload(days)))
            }),
        );
        let base = test_server::spawn(router).await;
        let client =
            ForecastApiClient::new(format!("{}/forecast", base), Duration::from_secs(5)).unwrap();
        ForecastStore::new(ForecastSource::Api(client))
    }

    async fn next_event(store: &mut ForecastStore) -> FetchEvent {
        for _ in 0..300 {
            if let Some(event) = store.poll() {
                return event;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no fetch completion within 3s");
    }

    #[tokio::test]
    async fn loads_series() {
        let mut store = store().await;
        assert!(store.current().is_none());

        store.request(request(5)).unwrap();
        assert!(store.is_loading());

        match next_event(&mut store).await {
            FetchEvent::Loaded(series) => assert_eq!(series.len(), 5),
            FetchEvent::Failed(e) => panic!("fetch failed: {}", e),
        }
        assert!(!store.is_loading());
        assert_eq!(store.current().map(|s| s.len()), Some(5));
    }

    #[tokio::test]
    async fn last_request_wins() {
        let mut store = store().await;

        let slow = store.request(request(2)).unwrap();
        let fast = store.request(request(3)).unwrap();
        assert!(fast > slow);

        match next_event(&mut store).await {
            FetchEvent::Loaded(series) => assert_eq!(series.len(), 3),
            FetchEvent::Failed(e) => panic!("fetch failed: {}", e),
        }

        // Give the superseded request time to have finished were it alive
        tokio::time::sleep(Duration::from_millis(800)).await;
        assert!(store.poll().is_none());
        assert_eq!(store.current().map(|s| s.len()), Some(3));
    }

    #[tokio::test]
    async fn stale_completion_is_discarded() {
        let mut store = store().await;
        store.request(request(4)).unwrap();

        // A result from an older generation arriving late
        let stale = Completion {
            generation: store.generation() - 1,
            result: Ok(fixtures::ten_day_series()),
        };
        assert!(store.tx.send(stale).is_ok());

        match next_event(&mut store).await {
            FetchEvent::Loaded(series) => assert_eq!(series.len(), 4),
            FetchEvent::Failed(e) => panic!("fetch failed: {}", e),
        }
    }

    #[tokio::test]
    async fn failure_keeps_previous_series() {
        let mut store = store().await;
        store.request(request(5)).unwrap();
        next_event(&mut store).await;

        store.request(request(9)).unwrap();
        match next_event(&mut store).await {
            FetchEvent::Failed(ClimaError::ForecastUnavailable(_)) => {}
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(store.current().map(|s| s.len()), Some(5));

        // Retry re-issues the failed request
        assert!(store.retry().unwrap().is_some());
        assert!(matches!(next_event(&mut store).await, FetchEvent::Failed(_)));
    }

    #[tokio::test]
    async fn panicked_task_ends_loading() {
        let mut store = store().await;
        store.request(request(5)).unwrap();
        if let Some(handle) = store.in_flight.take() {
            handle.abort();
        }
        store.in_flight = Some(tokio::spawn(async { panic!("metrics blew up") }));

        match next_event(&mut store).await {
            FetchEvent::Failed(ClimaError::ForecastUnavailable(_)) => {}
            other => panic!("unexpected event {:?}", other),
        }
        assert!(!store.is_loading());
        assert!(store.retry().unwrap().is_some());
    }

    #[tokio::test]
    async fn invalid_request_does_not_start_a_fetch() {
        let mut store = store().await;
        let err = store.request(request(11)).unwrap_err();
        assert!(matches!(err, ClimaError::InvalidInput(_)));
        assert!(!store.is_loading());
        assert_eq!(store.generation(), 0);
        assert!(store.retry().unwrap().is_none());
    }
}
