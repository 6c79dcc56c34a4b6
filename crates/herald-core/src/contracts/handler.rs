//! Handler traits - payload ごとの処理
//!
//! Handlers are resolved as `Arc<dyn ...>` so they can be shared between
//! concurrent dispatches; every trait here is object-safe.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::request::{Notification, Request, VoidRequest};
use crate::error::MediatorError;

/// Handles a [`Request`] and produces its response.
///
/// # 使用例
/// ```ignore
/// struct GetUserHandler;
///
/// #[async_trait]
/// impl RequestHandler<GetUser> for GetUserHandler {
///     async fn handle(&self, request: &GetUser, _cancel: &CancellationToken) -> Result<User, MediatorError> {
///         Ok(User::new(request.id))
///     }
/// }
/// ```
///
/// - `RequestHandler<GetUser>` は `GetUser` しか受け取れない
/// - exactly one handler may be registered per request type
#[async_trait]
pub trait RequestHandler<R: Request>: Send + Sync {
    async fn handle(
        &self,
        request: &R,
        cancel: &CancellationToken,
    ) -> Result<R::Response, MediatorError>;
}

/// Handles a [`VoidRequest`]. Exactly one per request type.
#[async_trait]
pub trait VoidRequestHandler<R: VoidRequest>: Send + Sync {
    async fn handle(&self, request: &R, cancel: &CancellationToken) -> Result<(), MediatorError>;
}

/// Handles a [`Notification`]. Any number may exist per notification type.
#[async_trait]
pub trait NotificationHandler<N: Notification>: Send + Sync {
    async fn handle(&self, notification: &N, cancel: &CancellationToken)
    -> Result<(), MediatorError>;
}
