//! Payload traits - Request / VoidRequest / Notification と型識別子
//!
//! The mediator never looks inside a payload. Its identity is its concrete
//! Rust type, captured as a [`RequestDescriptor`].

use std::any::{Any, TypeId, type_name};

/// A unit of work that expects exactly one typed response.
///
/// # 使用例
/// ```ignore
/// struct GetUser { id: u64 }
///
/// impl Request for GetUser {
///     type Response = User;
/// }
/// ```
///
/// # Trait Bounds
/// - `Send + Sync`: the request is borrowed by every layer of the chain
/// - `'static`: identity is a `TypeId`
pub trait Request: Send + Sync + 'static {
    type Response: Send + 'static;
}

/// A unit of work that expects no response value.
pub trait VoidRequest: Send + Sync + 'static {}

/// An event delivered to zero or more handlers.
pub trait Notification: Send + Sync + 'static {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Response,
    Void,
    Notification,
}

/// Dispatch-target descriptor of a concrete payload type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    type_id: TypeId,
    type_name: &'static str,
    kind: RequestKind,
}

impl RequestDescriptor {
    pub fn of<T: 'static>(kind: RequestKind) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            kind,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

/// Type-erased view of the request flowing through an open behavior.
pub struct RequestContext<'a> {
    descriptor: &'a RequestDescriptor,
    request: &'a (dyn Any + Send + Sync),
}

impl<'a> RequestContext<'a> {
    pub fn new(descriptor: &'a RequestDescriptor, request: &'a (dyn Any + Send + Sync)) -> Self {
        Self {
            descriptor,
            request,
        }
    }

    pub fn descriptor(&self) -> &RequestDescriptor {
        self.descriptor
    }

    pub fn type_name(&self) -> &'static str {
        self.descriptor.type_name()
    }

    /// Borrow the concrete request if it is a `T`.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&'a T> {
        self.request.downcast_ref::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ping;
    struct Pong;

    #[test]
    fn descriptor_identifies_concrete_type() {
        let descriptor = RequestDescriptor::of::<Ping>(RequestKind::Response);
        assert!(descriptor.is::<Ping>());
        assert!(!descriptor.is::<Pong>());
        assert!(descriptor.type_name().ends_with("Ping"));
        assert_eq!(descriptor.kind(), RequestKind::Response);
    }

    #[test]
    fn context_downcasts_only_to_its_type() {
        let descriptor = RequestDescriptor::of::<Ping>(RequestKind::Void);
        let ping = Ping;
        let ctx = RequestContext::new(&descriptor, &ping);
        assert!(ctx.downcast_ref::<Ping>().is_some());
        assert!(ctx.downcast_ref::<Pong>().is_none());
    }
}
