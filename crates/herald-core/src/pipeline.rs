//! Request pipelines - handler を behavior で包んで実行する
//!
//! # 合成アルゴリズム
//! Behaviors are folded from the last to the first, each previously built
//! continuation becoming the `next` of the next-outer behavior:
//!
//! ```text
//! [A, B, C] + handler  =>  A(B(C(handler)))
//! trace: A-enter, B-enter, C-enter, handled, C-exit, B-exit, A-exit
//! ```
//!
//! The handler is innermost and runs at most once, and only if every
//! behavior calls `next`.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::contracts::{
    Next, PipelineBehavior, Request, RequestHandler, VoidPipelineBehavior, VoidRequest,
    VoidRequestHandler,
};
use crate::error::MediatorError;

/// Shared composition routine for both pipeline shapes.
fn compose<'a, L, O>(
    layers: &'a [Arc<L>],
    terminal: Next<'a, O>,
    invoke: impl Fn(&'a L, Next<'a, O>) -> BoxFuture<'a, Result<O, MediatorError>> + Copy + Send + 'a,
) -> Next<'a, O>
where
    L: ?Sized + Sync + 'a,
    O: 'a,
{
    layers.iter().rev().fold(terminal, |next, layer| {
        let layer: &'a L = layer.as_ref();
        Next::new(move || invoke(layer, next))
    })
}

/// Pipeline for a response-bearing request: behaviors around one handler.
pub struct RequestPipeline<R: Request> {
    handler: Arc<dyn RequestHandler<R>>,
    behaviors: Vec<Arc<dyn PipelineBehavior<R>>>,
}

impl<R: Request> RequestPipeline<R> {
    pub fn new(
        handler: Arc<dyn RequestHandler<R>>,
        behaviors: Vec<Arc<dyn PipelineBehavior<R>>>,
    ) -> Self {
        Self { handler, behaviors }
    }

    pub fn behavior_count(&self) -> usize {
        self.behaviors.len()
    }

    pub async fn execute(
        &self,
        request: &R,
        cancel: &CancellationToken,
    ) -> Result<R::Response, MediatorError> {
        let handler = self.handler.as_ref();
        let terminal = Next::new(move || handler.handle(request, cancel));
        let chain = compose(&self.behaviors, terminal, move |behavior, next| {
            behavior.handle(request, next, cancel)
        });
        chain.run().await
    }
}

/// Pipeline for a void request. Same composition, completion-only terminal.
pub struct VoidRequestPipeline<R: VoidRequest> {
    handler: Arc<dyn VoidRequestHandler<R>>,
    behaviors: Vec<Arc<dyn VoidPipelineBehavior<R>>>,
}

impl<R: VoidRequest> VoidRequestPipeline<R> {
    pub fn new(
        handler: Arc<dyn VoidRequestHandler<R>>,
        behaviors: Vec<Arc<dyn VoidPipelineBehavior<R>>>,
    ) -> Self {
        Self { handler, behaviors }
    }

    pub fn behavior_count(&self) -> usize {
        self.behaviors.len()
    }

    pub async fn execute(&self, request: &R, cancel: &CancellationToken) -> Result<(), MediatorError> {
        let handler = self.handler.as_ref();
        let terminal = Next::new(move || handler.handle(request, cancel));
        let chain = compose(&self.behaviors, terminal, move |behavior, next| {
            behavior.handle(request, next, cancel)
        });
        chain.run().await
    }
}
