//! MediatorBuilder - mediator の構築とワイヤリング
//!
//! # Fail-fast 設計
//! - `expect_requests()` で期待される request 型名を登録
//! - `build()` 時に「期待集合 ⊆ 登録済み集合」をチェック
//! - handler の無い request 型に付いた behavior もここで弾く

use std::sync::Arc;

use tracing::info;

use crate::config::MediatorConfig;
use crate::contracts::{
    Notification, NotificationHandler, OpenBehavior, PipelineBehavior, Request, RequestHandler,
    VoidPipelineBehavior, VoidRequest, VoidRequestHandler,
};
use crate::error::{BuildError, RegistryError};
use crate::mediator::Mediator;
use crate::publish::{NotificationPublisher, PublishStrategy};
use crate::resolver::HandlerRegistry;

/// Builds a [`Mediator`] backed by a [`HandlerRegistry`].
///
/// # 使用例
/// ```ignore
/// let mediator = MediatorBuilder::new()
///     .register_request_handler::<GetUser, _>(GetUserHandler)?
///     .add_open_behavior(LoggingBehavior)
///     .publish_strategy(PublishStrategy::Concurrent)
///     .expect_requests(&[std::any::type_name::<GetUser>()])
///     .build()?;
/// ```
pub struct MediatorBuilder {
    registry: HandlerRegistry,
    strategy: PublishStrategy,
    publisher: Option<Arc<dyn NotificationPublisher>>,
    expected_requests: Option<Vec<String>>,
}

impl MediatorBuilder {
    pub fn new() -> Self {
        Self {
            registry: HandlerRegistry::new(),
            strategy: PublishStrategy::default(),
            publisher: None,
            expected_requests: None,
        }
    }

    pub fn register_request_handler<R, H>(mut self, handler: H) -> Result<Self, RegistryError>
    where
        R: Request,
        H: RequestHandler<R> + 'static,
    {
        self.registry.register_request_handler::<R, H>(handler)?;
        Ok(self)
    }

    pub fn register_void_handler<R, H>(mut self, handler: H) -> Result<Self, RegistryError>
    where
        R: VoidRequest,
        H: VoidRequestHandler<R> + 'static,
    {
        self.registry.register_void_handler::<R, H>(handler)?;
        Ok(self)
    }

    pub fn register_notification_handler<N, H>(mut self, handler: H) -> Self
    where
        N: Notification,
        H: NotificationHandler<N> + 'static,
    {
        self.registry.register_notification_handler::<N, H>(handler);
        self
    }

    pub fn add_behavior<R, B>(mut self, behavior: B) -> Self
    where
        R: Request,
        B: PipelineBehavior<R> + 'static,
    {
        self.registry.add_behavior::<R, B>(behavior);
        self
    }

    pub fn add_void_behavior<R, B>(mut self, behavior: B) -> Self
    where
        R: VoidRequest,
        B: VoidPipelineBehavior<R> + 'static,
    {
        self.registry.add_void_behavior::<R, B>(behavior);
        self
    }

    pub fn add_open_behavior<B: OpenBehavior + 'static>(mut self, behavior: B) -> Self {
        self.registry.add_open_behavior(behavior);
        self
    }

    pub fn publish_strategy(mut self, strategy: PublishStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Use a custom fan-out policy instead of one of the built-in strategies.
    pub fn publisher(mut self, publisher: Arc<dyn NotificationPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn with_config(self, config: &MediatorConfig) -> Self {
        self.publish_strategy(config.publish_strategy)
    }

    /// Request type names (`std::any::type_name`) that must have a handler.
    pub fn expect_requests(mut self, request_types: &[&str]) -> Self {
        self.expected_requests = Some(request_types.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn build(self) -> Result<Mediator<HandlerRegistry>, BuildError> {
        if let Some(expected) = &self.expected_requests {
            let registered = self.registry.registered_types();
            let missing: Vec<String> = expected
                .iter()
                .filter(|name| !registered.contains(&name.as_str()))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingRequestTypes(missing));
            }
        }

        if let Some(orphan) = self.registry.orphan_behaviors().first() {
            return Err(BuildError::MisconfiguredBehavior(format!(
                "behavior registered for {orphan}, which has no handler"
            )));
        }

        let publisher = self.publisher.unwrap_or_else(|| self.strategy.publisher());
        info!(
            requests = self.registry.registered_types().len(),
            open_behaviors = self.registry.open_behavior_count(),
            strategy = ?self.strategy,
            "mediator built"
        );
        Ok(Mediator::new(Arc::new(self.registry), publisher))
    }
}

impl Default for MediatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
