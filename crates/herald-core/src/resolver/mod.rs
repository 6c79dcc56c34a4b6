//! Resolver - payload 型から handler / behavior を引く抽象化
//!
//! The mediator does not own handlers. It asks a [`HandlerResolver`] for
//! them on every dispatch and keeps the returned `Arc`s only for the
//! duration of that call. [`HandlerRegistry`] is the in-memory default.

pub mod registry;

pub use self::registry::HandlerRegistry;

use std::sync::Arc;

use crate::contracts::{
    Notification, NotificationHandler, PipelineBehavior, Request, RequestHandler,
    VoidPipelineBehavior, VoidRequest, VoidRequestHandler,
};

/// Handler lookup contract consumed by the mediator.
///
/// - request types resolve to at most one handler; `None` means not registered
/// - notification types resolve to an ordered list that may be empty. A slot
///   may be `None` for a combination the resolver knows about but cannot fill;
///   publishers skip such slots.
/// - behaviors come back in registration order, open behaviors included
pub trait HandlerResolver: Send + Sync {
    fn resolve_request_handler<R: Request>(&self) -> Option<Arc<dyn RequestHandler<R>>>;

    fn resolve_void_request_handler<R: VoidRequest>(&self) -> Option<Arc<dyn VoidRequestHandler<R>>>;

    fn resolve_notification_handlers<N: Notification>(
        &self,
    ) -> Vec<Option<Arc<dyn NotificationHandler<N>>>>;

    fn resolve_behaviors<R: Request>(&self) -> Vec<Arc<dyn PipelineBehavior<R>>>;

    fn resolve_void_behaviors<R: VoidRequest>(&self) -> Vec<Arc<dyn VoidPipelineBehavior<R>>>;
}
