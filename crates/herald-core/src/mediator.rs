//! Mediator - send / publish の単一の入口
//!
//! # フロー
//! 1. payload の具象型から `RequestDescriptor` を取得（TypeCache 経由）
//! 2. `HandlerResolver` から handler / behavior を取得
//! 3. request は pipeline で実行、notification は publisher に委譲
//! 4. 結果またはエラーをそのまま呼び出し元へ返す

use std::any::type_name;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, debug_span, trace};

use crate::cache::TypeCache;
use crate::contracts::{Notification, Request, RequestDescriptor, RequestKind, VoidRequest};
use crate::error::MediatorError;
use crate::pipeline::{RequestPipeline, VoidRequestPipeline};
use crate::publish::{HandlerCall, NotificationPublisher, PublishStrategy};
use crate::resolver::HandlerResolver;

/// Dispatches requests and notifications to the handlers supplied by `H`.
///
/// Cheap to clone; clones share the resolver, the publisher and the
/// descriptor cache.
pub struct Mediator<H> {
    resolver: Arc<H>,
    publisher: Arc<dyn NotificationPublisher>,
    descriptors: Arc<TypeCache<Arc<RequestDescriptor>>>,
}

impl<H> Clone for Mediator<H> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
            publisher: Arc::clone(&self.publisher),
            descriptors: Arc::clone(&self.descriptors),
        }
    }
}

impl<H: HandlerResolver> Mediator<H> {
    pub fn new(resolver: Arc<H>, publisher: Arc<dyn NotificationPublisher>) -> Self {
        Self {
            resolver,
            publisher,
            descriptors: Arc::new(TypeCache::new()),
        }
    }

    pub fn with_strategy(resolver: Arc<H>, strategy: PublishStrategy) -> Self {
        Self::new(resolver, strategy.publisher())
    }

    pub fn resolver(&self) -> &H {
        &self.resolver
    }

    /// Number of payload types dispatched so far.
    pub fn cached_types(&self) -> usize {
        self.descriptors.len()
    }

    /// Send a request and return its handler's response.
    pub async fn send_with_response<R: Request>(
        &self,
        request: R,
        cancel: &CancellationToken,
    ) -> Result<R::Response, MediatorError> {
        self.send_with_response_opt(Some(request), cancel).await
    }

    /// Like [`Mediator::send_with_response`], for callers holding a possibly
    /// absent request. `None` fails with `InvalidArgument` before any lookup.
    pub async fn send_with_response_opt<R: Request>(
        &self,
        request: Option<R>,
        cancel: &CancellationToken,
    ) -> Result<R::Response, MediatorError> {
        let request = request.ok_or_else(|| absent::<R>())?;
        let descriptor = self.descriptor::<R>(RequestKind::Response);
        let span = debug_span!("mediator.send", request = descriptor.type_name(), kind = "response");

        async {
            let handler = self
                .resolver
                .resolve_request_handler::<R>()
                .ok_or(MediatorError::HandlerNotFound(descriptor.type_name()))?;
            let pipeline = RequestPipeline::new(handler, self.resolver.resolve_behaviors::<R>());
            trace!(behaviors = pipeline.behavior_count(), "dispatching request");

            let result = pipeline.execute(&request, cancel).await;
            if let Err(err) = &result {
                debug!(error = %err, "request failed");
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Send a request that has no response value.
    pub async fn send<R: VoidRequest>(
        &self,
        request: R,
        cancel: &CancellationToken,
    ) -> Result<(), MediatorError> {
        self.send_opt(Some(request), cancel).await
    }

    pub async fn send_opt<R: VoidRequest>(
        &self,
        request: Option<R>,
        cancel: &CancellationToken,
    ) -> Result<(), MediatorError> {
        let request = request.ok_or_else(|| absent::<R>())?;
        let descriptor = self.descriptor::<R>(RequestKind::Void);
        let span = debug_span!("mediator.send", request = descriptor.type_name(), kind = "void");

        async {
            // void request も handler はちょうど 1 つ必要
            let handler = self
                .resolver
                .resolve_void_request_handler::<R>()
                .ok_or(MediatorError::HandlerNotFound(descriptor.type_name()))?;
            let pipeline =
                VoidRequestPipeline::new(handler, self.resolver.resolve_void_behaviors::<R>());
            trace!(behaviors = pipeline.behavior_count(), "dispatching void request");

            let result = pipeline.execute(&request, cancel).await;
            if let Err(err) = &result {
                debug!(error = %err, "void request failed");
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Deliver a notification to every handler registered for its type.
    /// Zero handlers is not an error.
    pub async fn publish<N: Notification>(
        &self,
        notification: N,
        cancel: &CancellationToken,
    ) -> Result<(), MediatorError> {
        let descriptor = self.descriptor::<N>(RequestKind::Notification);
        let span = debug_span!("mediator.publish", notification = descriptor.type_name());

        async {
            let handlers = self.resolver.resolve_notification_handlers::<N>();
            if handlers.is_empty() {
                trace!("no notification handlers registered");
                return Ok(());
            }

            let notification = &notification;
            let calls: Vec<Option<HandlerCall<'_>>> = handlers
                .iter()
                .enumerate()
                .map(|(index, slot)| {
                    slot.as_ref().map(|handler| {
                        HandlerCall::new(index, move || handler.handle(notification, cancel))
                    })
                })
                .collect();
            trace!(handlers = calls.len(), "publishing notification");

            self.publisher
                .publish(descriptor.type_name(), calls, cancel)
                .await
        }
        .instrument(span)
        .await
    }

    fn descriptor<T: 'static>(&self, kind: RequestKind) -> Arc<RequestDescriptor> {
        self.descriptors
            .get_or_create::<T>(|| Arc::new(RequestDescriptor::of::<T>(kind)))
    }
}

fn absent<R>() -> MediatorError {
    MediatorError::InvalidArgument(format!("request of type {} is absent", type_name::<R>()))
}
