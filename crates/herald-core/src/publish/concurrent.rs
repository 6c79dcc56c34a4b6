//! ConcurrentPublisher - 全 handler を同時に開始して全完了を待つ
//!
//! No ordering between handlers. The call never returns while an invocation
//! is still running, even if a sibling has already failed.

use async_trait::async_trait;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::{HandlerCall, NotificationPublisher};
use crate::error::MediatorError;

#[derive(Debug, Default, Clone, Copy)]
pub struct ConcurrentPublisher;

impl ConcurrentPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationPublisher for ConcurrentPublisher {
    async fn publish(
        &self,
        notification: &'static str,
        calls: Vec<Option<HandlerCall<'_>>>,
        _cancel: &CancellationToken,
    ) -> Result<(), MediatorError> {
        let (indices, pending): (Vec<usize>, Vec<_>) = calls
            .into_iter()
            .flatten()
            .map(|call| (call.index(), call.invoke()))
            .unzip();
        trace!(notification, handlers = pending.len(), "starting concurrent fan-out");

        let results = join_all(pending).await;

        let mut failures: Vec<MediatorError> = indices
            .into_iter()
            .zip(results)
            .filter_map(|(index, result)| {
                let err = result.err()?;
                debug!(notification, handler = index, error = %err, "notification handler failed");
                Some(err)
            })
            .collect();

        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.remove(0)),
            _ => Err(MediatorError::Aggregate(failures)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn call(index: usize, done: &Arc<AtomicUsize>, delay_ms: u64, fail: bool) -> HandlerCall<'static> {
        let done = done.clone();
        HandlerCall::new(index, move || {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                done.fetch_add(1, Ordering::SeqCst);
                if fail {
                    Err(MediatorError::handler(format!("handler {index} failed")))
                } else {
                    Ok(())
                }
            })
        })
    }

    #[tokio::test]
    async fn waits_for_siblings_before_reporting_failure() {
        let done = Arc::new(AtomicUsize::new(0));
        let calls = vec![
            Some(call(0, &done, 30, false)),
            Some(call(1, &done, 0, true)),
            Some(call(2, &done, 30, false)),
        ];

        let err = ConcurrentPublisher::new()
            .publish("Tick", calls, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "handler 1 failed");
        assert_eq!(done.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn handlers_overlap() {
        tokio::time::pause();

        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let calls = (0..4)
            .map(|index| {
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                Some(HandlerCall::new(index, move || {
                    Box::pin(async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Ok::<(), MediatorError>(())
                    })
                }))
            })
            .collect();

        ConcurrentPublisher::new()
            .publish("Tick", calls, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(peak.load(Ordering::SeqCst), 4);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn multiple_failures_are_aggregated_in_handler_order() {
        let done = Arc::new(AtomicUsize::new(0));
        let calls = vec![
            Some(call(0, &done, 20, true)),
            None,
            Some(call(2, &done, 0, true)),
        ];

        let err = ConcurrentPublisher::new()
            .publish("Tick", calls, &CancellationToken::new())
            .await
            .unwrap_err();
        let MediatorError::Aggregate(errors) = &err else {
            panic!("expected aggregate, got {err}");
        };
        assert_eq!(errors.len(), 2);
        assert_eq!(err.first_failure().to_string(), "handler 0 failed");
        assert_eq!(done.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_fan_out_succeeds() {
        ConcurrentPublisher::new()
            .publish("Tick", Vec::new(), &CancellationToken::new())
            .await
            .unwrap();
    }
}
