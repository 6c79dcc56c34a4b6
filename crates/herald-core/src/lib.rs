//! herald-core
//!
//! In-process mediator: typed request/response dispatch through pipeline
//! behaviors, and notification fan-out.
//!
//! # モジュール構成
//! - **contracts**: payload / handler / behavior の trait（Request, RequestHandler, PipelineBehavior, OpenBehavior, Next）
//! - **resolver**: HandlerResolver trait と in-memory 実装 HandlerRegistry
//! - **pipeline**: behavior chain の合成と実行（RequestPipeline, VoidRequestPipeline）
//! - **publish**: fan-out 戦略（SequentialPublisher, ConcurrentPublisher）
//! - **cache**: TypeCache（TypeId → 導出データ）
//! - **mediator**: send / publish の入口
//! - **builder**: MediatorBuilder（登録と起動時検証）
//! - **config / logging / error**: 設定、tracing 初期化、エラー型

pub mod contracts;
pub mod resolver;
pub mod pipeline;
pub mod publish;
pub mod cache;
pub mod mediator;
pub mod builder;
pub mod config;
pub mod logging;
pub mod error;

pub use self::builder::MediatorBuilder;
pub use self::config::MediatorConfig;
pub use self::contracts::{
    Erased, Next, Notification, NotificationHandler, OpenBehavior, PipelineBehavior, Request,
    RequestContext, RequestDescriptor, RequestHandler, RequestKind, VoidPipelineBehavior,
    VoidRequest, VoidRequestHandler,
};
pub use self::error::{BoxError, BuildError, MediatorError, RegistryError, SetupError};
pub use self::mediator::Mediator;
pub use self::publish::{NotificationPublisher, PublishStrategy};
pub use self::resolver::{HandlerRegistry, HandlerResolver};

// Handlers take a cancellation token in every signature.
pub use tokio_util::sync::CancellationToken;
