//! Pipeline behaviors - handler の前後に挟まる middleware
//!
//! A behavior receives the request and a [`Next`] continuation. Calling
//! `next.run().await` invokes the rest of the chain; not calling it
//! short-circuits the chain with whatever the behavior returns.
//!
//! There are three flavours:
//! - [`PipelineBehavior<R>`]: typed, for one response-bearing request type
//! - [`VoidPipelineBehavior<R>`]: typed, for one void request type
//! - [`OpenBehavior`]: registered once, applied to every request type it accepts

use std::any::Any;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use super::request::{Request, RequestContext, RequestDescriptor, VoidRequest};
use crate::error::MediatorError;

/// Response of a request as seen by an [`OpenBehavior`].
pub type Erased = Box<dyn Any + Send>;

/// One-shot continuation invoking the rest of the pipeline.
pub struct Next<'a, O> {
    call: Box<dyn FnOnce() -> BoxFuture<'a, Result<O, MediatorError>> + Send + 'a>,
}

impl<'a, O: 'a> Next<'a, O> {
    pub fn new<F>(call: F) -> Self
    where
        F: FnOnce() -> BoxFuture<'a, Result<O, MediatorError>> + Send + 'a,
    {
        Self {
            call: Box::new(call),
        }
    }

    /// Run the rest of the chain. Consumes the continuation, so the inner
    /// layers execute at most once.
    pub fn run(self) -> BoxFuture<'a, Result<O, MediatorError>> {
        (self.call)()
    }
}

impl<'a, O: Send + 'static> Next<'a, O> {
    /// View this continuation through the type-erased response of an open behavior.
    pub fn erase(self) -> Next<'a, Erased> {
        Next::new(move || {
            Box::pin(async move {
                let value = self.run().await?;
                Ok(Box::new(value) as Erased)
            })
        })
    }
}

/// Middleware for a response-bearing request type.
///
/// Generic behaviors are written as blanket impls and the compiler checks
/// their constraint when they are registered for a concrete request:
///
/// ```ignore
/// #[async_trait]
/// impl<R: Request + Validate> PipelineBehavior<R> for ValidationBehavior {
///     async fn handle(&self, request: &R, next: Next<'_, R::Response>, _cancel: &CancellationToken)
///         -> Result<R::Response, MediatorError>
///     {
///         request.validate().map_err(MediatorError::handler)?;
///         next.run().await
///     }
/// }
/// ```
#[async_trait]
pub trait PipelineBehavior<R: Request>: Send + Sync {
    async fn handle(
        &self,
        request: &R,
        next: Next<'_, R::Response>,
        cancel: &CancellationToken,
    ) -> Result<R::Response, MediatorError>;
}

/// Middleware for a void request type.
#[async_trait]
pub trait VoidPipelineBehavior<R: VoidRequest>: Send + Sync {
    async fn handle(
        &self,
        request: &R,
        next: Next<'_, ()>,
        cancel: &CancellationToken,
    ) -> Result<(), MediatorError>;
}

/// Middleware registered once and applied to many request types.
///
/// The request and its response are type-erased. An open behavior that
/// short-circuits must hand back a value of the request's response type
/// (`()` for void requests), otherwise the call fails with
/// [`MediatorError::MisconfiguredBehavior`].
#[async_trait]
pub trait OpenBehavior: Send + Sync {
    /// Constraint check: whether this behavior sits in the chain of the
    /// given request type. Evaluated once per type and cached.
    fn applies_to(&self, _descriptor: &RequestDescriptor) -> bool {
        true
    }

    async fn handle(
        &self,
        ctx: &RequestContext<'_>,
        next: Next<'_, Erased>,
        cancel: &CancellationToken,
    ) -> Result<Erased, MediatorError>;
}

/// Typed view of an [`OpenBehavior`] for a single request type.
pub(crate) struct OpenBehaviorAdapter {
    behavior: std::sync::Arc<dyn OpenBehavior>,
    descriptor: RequestDescriptor,
}

impl OpenBehaviorAdapter {
    pub(crate) fn new(behavior: std::sync::Arc<dyn OpenBehavior>, descriptor: RequestDescriptor) -> Self {
        Self {
            behavior,
            descriptor,
        }
    }

    async fn run<O: Send + 'static>(
        &self,
        request: &(dyn Any + Send + Sync),
        next: Next<'_, O>,
        cancel: &CancellationToken,
    ) -> Result<O, MediatorError> {
        let ctx = RequestContext::new(&self.descriptor, request);
        let value = self.behavior.handle(&ctx, next.erase(), cancel).await?;
        value.downcast::<O>().map(|v| *v).map_err(|_| {
            MediatorError::MisconfiguredBehavior(format!(
                "open behavior returned a value that is not the response of {}",
                self.descriptor.type_name()
            ))
        })
    }
}

#[async_trait]
impl<R: Request> PipelineBehavior<R> for OpenBehaviorAdapter {
    async fn handle(
        &self,
        request: &R,
        next: Next<'_, R::Response>,
        cancel: &CancellationToken,
    ) -> Result<R::Response, MediatorError> {
        self.run(request, next, cancel).await
    }
}

#[async_trait]
impl<R: VoidRequest> VoidPipelineBehavior<R> for OpenBehaviorAdapter {
    async fn handle(
        &self,
        request: &R,
        next: Next<'_, ()>,
        cancel: &CancellationToken,
    ) -> Result<(), MediatorError> {
        self.run(request, next, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::RequestKind;
    use std::sync::Arc;

    struct Echo(u32);

    impl Request for Echo {
        type Response = u32;
    }

    struct PassThrough;

    #[async_trait]
    impl OpenBehavior for PassThrough {
        async fn handle(
            &self,
            _ctx: &RequestContext<'_>,
            next: Next<'_, Erased>,
            _cancel: &CancellationToken,
        ) -> Result<Erased, MediatorError> {
            next.run().await
        }
    }

    struct WrongValue;

    #[async_trait]
    impl OpenBehavior for WrongValue {
        async fn handle(
            &self,
            _ctx: &RequestContext<'_>,
            _next: Next<'_, Erased>,
            _cancel: &CancellationToken,
        ) -> Result<Erased, MediatorError> {
            Ok(Box::new("not a u32"))
        }
    }

    fn adapter(behavior: Arc<dyn OpenBehavior>) -> OpenBehaviorAdapter {
        OpenBehaviorAdapter::new(behavior, RequestDescriptor::of::<Echo>(RequestKind::Response))
    }

    #[tokio::test]
    async fn next_runs_the_wrapped_call() {
        let next: Next<'_, u32> = Next::new(|| Box::pin(async { Ok(7) }));
        assert_eq!(next.run().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn open_adapter_restores_typed_response() {
        let adapter = adapter(Arc::new(PassThrough));
        let cancel = CancellationToken::new();
        let request = Echo(3);
        let next: Next<'_, u32> = Next::new(|| Box::pin(async { Ok(42) }));
        let out = PipelineBehavior::<Echo>::handle(&adapter, &request, next, &cancel)
            .await
            .unwrap();
        assert_eq!(out, 42);
    }

    #[tokio::test]
    async fn open_adapter_rejects_foreign_response_type() {
        let adapter = adapter(Arc::new(WrongValue));
        let cancel = CancellationToken::new();
        let request = Echo(3);
        let next: Next<'_, u32> = Next::new(|| Box::pin(async { Ok(42) }));
        let err = PipelineBehavior::<Echo>::handle(&adapter, &request, next, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, MediatorError::MisconfiguredBehavior(_)));
    }
}
