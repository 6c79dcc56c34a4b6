//! Contracts - payload, handler, behavior の trait 群
//!
//! # 二層構造
//! - **表層（Typed）**: `Request`, `RequestHandler<R>`, `PipelineBehavior<R>` - 型安全
//! - **内部（Dyn）**: `OpenBehavior`, `RequestContext` - 型消去

pub mod request;
pub mod handler;
pub mod behavior;

pub use self::request::{Notification, Request, RequestContext, RequestDescriptor, RequestKind, VoidRequest};
pub use self::handler::{NotificationHandler, RequestHandler, VoidRequestHandler};
pub use self::behavior::{Erased, Next, OpenBehavior, PipelineBehavior, VoidPipelineBehavior};
pub(crate) use self::behavior::OpenBehaviorAdapter;
