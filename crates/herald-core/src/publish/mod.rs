//! Publish - notification の fan-out 戦略
//!
//! # 含まれる実装
//! - **SequentialPublisher**: one handler at a time, fail-fast (default)
//! - **ConcurrentPublisher**: all handlers at once, join barrier before reporting

pub mod sequential;
pub mod concurrent;

pub use self::sequential::SequentialPublisher;
pub use self::concurrent::ConcurrentPublisher;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::MediatorError;

type Invoke<'a> = Box<dyn FnOnce() -> BoxFuture<'a, Result<(), MediatorError>> + Send + 'a>;

/// One type-erased notification handler invocation that has not been made yet.
///
/// `handle` is only called when the publisher calls [`HandlerCall::invoke`],
/// so a publisher that stops early never touches the remaining handlers,
/// including any work a handler does before returning its future.
pub struct HandlerCall<'a> {
    index: usize,
    invoke: Invoke<'a>,
}

impl<'a> HandlerCall<'a> {
    pub fn new<F>(index: usize, invoke: F) -> Self
    where
        F: FnOnce() -> BoxFuture<'a, Result<(), MediatorError>> + Send + 'a,
    {
        Self {
            index,
            invoke: Box::new(invoke),
        }
    }

    /// Position of the handler in resolver order.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Call the handler and return its pending result.
    pub fn invoke(self) -> BoxFuture<'a, Result<(), MediatorError>> {
        (self.invoke)()
    }
}

/// Fan-out policy used by `Mediator::publish`.
///
/// `None` slots stand for handlers the resolver could not supply; both
/// built-in publishers skip them silently.
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    async fn publish(
        &self,
        notification: &'static str,
        calls: Vec<Option<HandlerCall<'_>>>,
        cancel: &CancellationToken,
    ) -> Result<(), MediatorError>;
}

/// Configuration-time selection of the fan-out policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStrategy {
    #[default]
    Sequential,
    Concurrent,
}

impl PublishStrategy {
    pub fn publisher(self) -> Arc<dyn NotificationPublisher> {
        match self {
            PublishStrategy::Sequential => Arc::new(SequentialPublisher::new()),
            PublishStrategy::Concurrent => Arc::new(ConcurrentPublisher::new()),
        }
    }
}
