//! SequentialPublisher - handler を順番に await する
//!
//! Deterministic and fail-fast: the first failure stops the fan-out and the
//! remaining handlers are never started.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::{HandlerCall, NotificationPublisher};
use crate::error::MediatorError;

#[derive(Debug, Default, Clone, Copy)]
pub struct SequentialPublisher;

impl SequentialPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationPublisher for SequentialPublisher {
    async fn publish(
        &self,
        notification: &'static str,
        calls: Vec<Option<HandlerCall<'_>>>,
        cancel: &CancellationToken,
    ) -> Result<(), MediatorError> {
        for call in calls.into_iter().flatten() {
            // 次の handler を始める前にだけ確認する（実行中の handler は止めない）
            if cancel.is_cancelled() {
                debug!(notification, handler = call.index(), "fan-out cancelled");
                return Err(MediatorError::Cancelled);
            }

            let index = call.index();
            trace!(notification, handler = index, "invoking notification handler");
            if let Err(err) = call.invoke().await {
                debug!(notification, handler = index, error = %err, "notification handler failed");
                return Err(err);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<usize>>>;

    fn call(index: usize, log: &Log, fail: bool) -> HandlerCall<'static> {
        let log = log.clone();
        HandlerCall::new(index, move || {
            Box::pin(async move {
                log.lock().unwrap().push(index);
                if fail {
                    Err(MediatorError::handler(format!("handler {index} failed")))
                } else {
                    Ok(())
                }
            })
        })
    }

    #[tokio::test]
    async fn runs_handlers_in_order() {
        let log = Log::default();
        let calls = vec![Some(call(0, &log, false)), Some(call(1, &log, false)), Some(call(2, &log, false))];

        SequentialPublisher::new()
            .publish("Tick", calls, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(*log.lock().unwrap(), [0, 1, 2]);
    }

    #[tokio::test]
    async fn stops_at_first_failure() {
        let log = Log::default();
        let calls = vec![Some(call(0, &log, false)), Some(call(1, &log, true)), Some(call(2, &log, false))];

        let err = SequentialPublisher::new()
            .publish("Tick", calls, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "handler 1 failed");
        assert_eq!(*log.lock().unwrap(), [0, 1]);
    }

    #[tokio::test]
    async fn handlers_after_a_failure_are_never_called() {
        // 同期部分で記録し、future は即座に結果を返す
        let called = Log::default();
        let calls = (0..3)
            .map(|index| {
                let called = called.clone();
                Some(HandlerCall::new(index, move || {
                    called.lock().unwrap().push(index);
                    let result = if index == 1 {
                        Err(MediatorError::handler("second failed"))
                    } else {
                        Ok(())
                    };
                    Box::pin(futures::future::ready(result))
                        as futures::future::BoxFuture<'static, Result<(), MediatorError>>
                }))
            })
            .collect();

        let err = SequentialPublisher::new()
            .publish("Tick", calls, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "second failed");
        assert_eq!(*called.lock().unwrap(), [0, 1]);
    }

    #[tokio::test]
    async fn skips_empty_slots() {
        let log = Log::default();
        let calls = vec![None, Some(call(1, &log, false)), None];

        SequentialPublisher::new()
            .publish("Tick", calls, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(*log.lock().unwrap(), [1]);
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_next_handler() {
        let log = Log::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = SequentialPublisher::new()
            .publish("Tick", vec![Some(call(0, &log, false))], &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(log.lock().unwrap().is_empty());
    }
}
