//! HandlerRegistry - handler と behavior の登録・管理
//!
//! # 設計
//! - Built during initialization (`&mut self`).
//! - Used during dispatch (`&self`, read-only apart from the open behavior cache).
//!
//! # 内部実装
//! Typed trait objects are stored type-erased, keyed by `TypeId`:
//! `Arc<dyn RequestHandler<R>>` goes into a `Box<dyn Any>` and is downcast
//! back with the same `R` at resolve time.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::HandlerResolver;
use crate::cache::TypeCache;
use crate::contracts::{
    Notification, NotificationHandler, OpenBehavior, OpenBehaviorAdapter, PipelineBehavior,
    Request, RequestDescriptor, RequestHandler, RequestKind, VoidPipelineBehavior, VoidRequest,
    VoidRequestHandler,
};
use crate::error::RegistryError;

type Erased = Box<dyn Any + Send + Sync>;

/// A typed behavior together with its global registration sequence number.
struct BehaviorSlot {
    seq: u64,
    behavior: Erased,
}

struct BehaviorList {
    request_type: &'static str,
    slots: Vec<BehaviorSlot>,
}

/// In-memory [`HandlerResolver`].
///
/// # 使用例
/// ```ignore
/// let mut registry = HandlerRegistry::new();
/// registry.register_request_handler::<GetUser, _>(GetUserHandler)?;
/// registry.add_behavior::<GetUser, _>(AuditBehavior);
/// registry.add_open_behavior(LoggingBehavior);
/// ```
///
/// Typed and open behaviors share one sequence counter, so a request's chain
/// follows the order in which behaviors were added regardless of kind.
#[derive(Default)]
pub struct HandlerRegistry {
    request_handlers: HashMap<TypeId, Erased>,
    void_handlers: HashMap<TypeId, Erased>,
    notification_handlers: HashMap<TypeId, Erased>,
    behaviors: HashMap<TypeId, BehaviorList>,
    void_behaviors: HashMap<TypeId, BehaviorList>,
    open_behaviors: Vec<(u64, Arc<dyn OpenBehavior>)>,
    /// request type -> indices into `open_behaviors` accepted by `applies_to`
    open_matches: TypeCache<Arc<[usize]>>,
    open_void_matches: TypeCache<Arc<[usize]>>,
    names: HashMap<TypeId, &'static str>,
    next_seq: u64,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_request_handler<R, H>(&mut self, handler: H) -> Result<(), RegistryError>
    where
        R: Request,
        H: RequestHandler<R> + 'static,
    {
        let key = TypeId::of::<R>();
        if self.request_handlers.contains_key(&key) {
            return Err(RegistryError::DuplicateHandler(type_name::<R>()));
        }
        let handler: Arc<dyn RequestHandler<R>> = Arc::new(handler);
        self.request_handlers.insert(key, Box::new(handler));
        self.names.insert(key, type_name::<R>());
        debug!(request = type_name::<R>(), "registered request handler");
        Ok(())
    }

    pub fn register_void_handler<R, H>(&mut self, handler: H) -> Result<(), RegistryError>
    where
        R: VoidRequest,
        H: VoidRequestHandler<R> + 'static,
    {
        let key = TypeId::of::<R>();
        if self.void_handlers.contains_key(&key) {
            return Err(RegistryError::DuplicateHandler(type_name::<R>()));
        }
        let handler: Arc<dyn VoidRequestHandler<R>> = Arc::new(handler);
        self.void_handlers.insert(key, Box::new(handler));
        self.names.insert(key, type_name::<R>());
        debug!(request = type_name::<R>(), "registered void request handler");
        Ok(())
    }

    /// Append a notification handler. Handlers run in the order they were added.
    pub fn register_notification_handler<N, H>(&mut self, handler: H)
    where
        N: Notification,
        H: NotificationHandler<N> + 'static,
    {
        let handler: Arc<dyn NotificationHandler<N>> = Arc::new(handler);
        let entry = self
            .notification_handlers
            .entry(TypeId::of::<N>())
            .or_insert_with(|| Box::new(Vec::<Arc<dyn NotificationHandler<N>>>::new()));
        if let Some(list) = entry.downcast_mut::<Vec<Arc<dyn NotificationHandler<N>>>>() {
            list.push(handler);
            debug!(
                notification = type_name::<N>(),
                handlers = list.len(),
                "registered notification handler"
            );
        }
    }

    pub fn add_behavior<R, B>(&mut self, behavior: B)
    where
        R: Request,
        B: PipelineBehavior<R> + 'static,
    {
        let behavior: Arc<dyn PipelineBehavior<R>> = Arc::new(behavior);
        let seq = self.bump_seq();
        push_slot::<R>(&mut self.behaviors, seq, Box::new(behavior));
        debug!(request = type_name::<R>(), seq, "added pipeline behavior");
    }

    pub fn add_void_behavior<R, B>(&mut self, behavior: B)
    where
        R: VoidRequest,
        B: VoidPipelineBehavior<R> + 'static,
    {
        let behavior: Arc<dyn VoidPipelineBehavior<R>> = Arc::new(behavior);
        let seq = self.bump_seq();
        push_slot::<R>(&mut self.void_behaviors, seq, Box::new(behavior));
        debug!(request = type_name::<R>(), seq, "added void pipeline behavior");
    }

    pub fn add_open_behavior<B: OpenBehavior + 'static>(&mut self, behavior: B) {
        let seq = self.bump_seq();
        self.open_behaviors.push((seq, Arc::new(behavior)));
        // 追加前に計算した適用結果は古くなる
        self.open_matches = TypeCache::new();
        self.open_void_matches = TypeCache::new();
        debug!(behavior = type_name::<B>(), seq, "added open behavior");
    }

    /// Names of every request type with a registered handler, sorted.
    pub fn registered_types(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.names.values().copied().collect();
        names.sort_unstable();
        names
    }

    /// Request types that have typed behaviors but no handler to wrap.
    pub fn orphan_behaviors(&self) -> Vec<&'static str> {
        let mut orphans: Vec<&'static str> = self
            .behaviors
            .iter()
            .filter(|(key, _)| !self.request_handlers.contains_key(key))
            .chain(
                self.void_behaviors
                    .iter()
                    .filter(|(key, _)| !self.void_handlers.contains_key(key)),
            )
            .map(|(_, list)| list.request_type)
            .collect();
        orphans.sort_unstable();
        orphans
    }

    pub fn open_behavior_count(&self) -> usize {
        self.open_behaviors.len()
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Open behaviors accepted for this descriptor, cached per request type.
    fn matching_open(&self, descriptor: &RequestDescriptor) -> Arc<[usize]> {
        let cache = match descriptor.kind() {
            RequestKind::Void => &self.open_void_matches,
            _ => &self.open_matches,
        };
        cache.get_or_create_by_id(descriptor.type_id(), || {
            self.open_behaviors
                .iter()
                .enumerate()
                .filter(|(_, (_, behavior))| behavior.applies_to(descriptor))
                .map(|(idx, _)| idx)
                .collect()
        })
    }

    /// Merge typed and open behaviors for one request type by sequence number.
    fn ordered_behaviors<T: ?Sized + 'static>(
        &self,
        typed: Option<&BehaviorList>,
        descriptor: RequestDescriptor,
        adapt: impl Fn(OpenBehaviorAdapter) -> Arc<T>,
    ) -> Vec<Arc<T>> {
        let mut layers: Vec<(u64, Arc<T>)> = typed
            .into_iter()
            .flat_map(|list| list.slots.iter())
            .filter_map(|slot| {
                slot.behavior
                    .downcast_ref::<Arc<T>>()
                    .map(|behavior| (slot.seq, behavior.clone()))
            })
            .collect();

        for &idx in self.matching_open(&descriptor).iter() {
            let (seq, behavior) = &self.open_behaviors[idx];
            let adapter = OpenBehaviorAdapter::new(behavior.clone(), descriptor.clone());
            layers.push((*seq, adapt(adapter)));
        }

        layers.sort_by_key(|(seq, _)| *seq);
        layers.into_iter().map(|(_, behavior)| behavior).collect()
    }
}

fn push_slot<R: 'static>(map: &mut HashMap<TypeId, BehaviorList>, seq: u64, behavior: Erased) {
    map.entry(TypeId::of::<R>())
        .or_insert_with(|| BehaviorList {
            request_type: type_name::<R>(),
            slots: Vec::new(),
        })
        .slots
        .push(BehaviorSlot { seq, behavior });
}

impl HandlerResolver for HandlerRegistry {
    fn resolve_request_handler<R: Request>(&self) -> Option<Arc<dyn RequestHandler<R>>> {
        self.request_handlers
            .get(&TypeId::of::<R>())
            .and_then(|h| h.downcast_ref::<Arc<dyn RequestHandler<R>>>())
            .cloned()
    }

    fn resolve_void_request_handler<R: VoidRequest>(&self) -> Option<Arc<dyn VoidRequestHandler<R>>> {
        self.void_handlers
            .get(&TypeId::of::<R>())
            .and_then(|h| h.downcast_ref::<Arc<dyn VoidRequestHandler<R>>>())
            .cloned()
    }

    fn resolve_notification_handlers<N: Notification>(
        &self,
    ) -> Vec<Option<Arc<dyn NotificationHandler<N>>>> {
        self.notification_handlers
            .get(&TypeId::of::<N>())
            .and_then(|list| list.downcast_ref::<Vec<Arc<dyn NotificationHandler<N>>>>())
            .map(|list| list.iter().cloned().map(Some).collect())
            .unwrap_or_default()
    }

    fn resolve_behaviors<R: Request>(&self) -> Vec<Arc<dyn PipelineBehavior<R>>> {
        self.ordered_behaviors(
            self.behaviors.get(&TypeId::of::<R>()),
            RequestDescriptor::of::<R>(RequestKind::Response),
            |adapter| Arc::new(adapter) as Arc<dyn PipelineBehavior<R>>,
        )
    }

    fn resolve_void_behaviors<R: VoidRequest>(&self) -> Vec<Arc<dyn VoidPipelineBehavior<R>>> {
        self.ordered_behaviors(
            self.void_behaviors.get(&TypeId::of::<R>()),
            RequestDescriptor::of::<R>(RequestKind::Void),
            |adapter| Arc::new(adapter) as Arc<dyn VoidPipelineBehavior<R>>,
        )
    }
}
