//! Declarative effect routing
//!
//! Each route pairs an extractor (`&Effect -> Option<Payload>`) with a
//! connectable that handles the payload. The compiled router requires
//! exactly one extractor to match every effect it accepts; anything else
//! is a configuration bug and goes to the error hook.

use super::{AsyncHandler, EffectHandler, EventsHandler, HandlerConnectable, SideEffectHandler};
use crate::connectable::{
    Connectable, Connection, ConnectionSlot, Consumer, GuardedConnection,
};
use crate::error::{ErrorHook, LoopError};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;

type Extractor<Ef, P> = Arc<dyn Fn(&Ef) -> Option<P> + Send + Sync>;

// ============================================================================
// Type-erased routes
// ============================================================================

trait Route<Ef, Ev>: Send + Sync {
    fn connect(&self, output: Consumer<Ev>) -> Result<Box<dyn RouteConnection<Ef>>, LoopError>;
}

trait RouteConnection<Ef>: Send + Sync {
    /// Run the extractor; on a match, return the deferred dispatch of the payload.
    fn extract<'a>(&'a self, effect: &Ef) -> Option<Box<dyn FnOnce() + 'a>>;
    fn dispose(&self);
}

struct TypedRoute<Ef, P, Ev> {
    extract: Extractor<Ef, P>,
    target: Box<dyn Connectable<P, Ev>>,
}

impl<Ef: 'static, P: 'static, Ev> Route<Ef, Ev> for TypedRoute<Ef, P, Ev> {
    fn connect(&self, output: Consumer<Ev>) -> Result<Box<dyn RouteConnection<Ef>>, LoopError> {
        let connection = self.target.connect(output)?;
        Ok(Box::new(TypedRouteConnection {
            extract: self.extract.clone(),
            connection,
        }))
    }
}

struct TypedRouteConnection<Ef, P> {
    extract: Extractor<Ef, P>,
    connection: Box<dyn Connection<P>>,
}

impl<Ef, P: 'static> RouteConnection<Ef> for TypedRouteConnection<Ef, P> {
    fn extract<'a>(&'a self, effect: &Ef) -> Option<Box<dyn FnOnce() + 'a>> {
        let payload = (self.extract)(effect)?;
        Some(Box::new(move || self.connection.accept(payload)))
    }

    fn dispose(&self) {
        self.connection.dispose();
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Collects routes, then compiles into a single [`RouterConnectable`].
///
/// ```ignore
/// let effects = EffectRouter::new()
///     .route_effects(|e: &Effect| match e { Effect::Save(doc) => Some(doc.clone()), _ => None })
///     .to_side_effect(|doc| store.save(doc))
///     .route_constant(Effect::Refresh)
///     .to_event(|()| Event::Refreshed)
///     .as_connectable();
/// ```
pub struct EffectRouter<Ef, Ev> {
    routes: Vec<Box<dyn Route<Ef, Ev>>>,
    error_hook: ErrorHook,
}

impl<Ef: 'static, Ev: Send + 'static> EffectRouter<Ef, Ev> {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            error_hook: ErrorHook::default(),
        }
    }

    /// Hook receiving routing failures; defaults to [`ErrorHook::aborting`].
    #[must_use]
    pub fn with_error_hook(mut self, error_hook: ErrorHook) -> Self {
        self.error_hook = error_hook;
        self
    }

    /// Start a route matching every effect the extractor maps to `Some`.
    pub fn route_effects<P: 'static>(
        self,
        extract: impl Fn(&Ef) -> Option<P> + Send + Sync + 'static,
    ) -> PartialRoute<Ef, Ev, P> {
        PartialRoute {
            router: self,
            extract: Arc::new(extract),
        }
    }

    /// Start a route matching effects equal to `constant`.
    pub fn route_constant(self, constant: Ef) -> PartialRoute<Ef, Ev, ()>
    where
        Ef: PartialEq + Send + Sync,
    {
        self.route_effects(move |effect: &Ef| (*effect == constant).then_some(()))
    }

    /// Start a route handing every effect the predicate accepts to the target.
    pub fn route_matching(
        self,
        predicate: impl Fn(&Ef) -> bool + Send + Sync + 'static,
    ) -> PartialRoute<Ef, Ev, Ef>
    where
        Ef: Clone,
    {
        self.route_effects(move |effect: &Ef| predicate(effect).then(|| effect.clone()))
    }

    pub fn as_connectable(self) -> RouterConnectable<Ef, Ev> {
        RouterConnectable {
            routes: self.routes,
            slot: ConnectionSlot::default(),
            error_hook: self.error_hook,
        }
    }
}

impl<Ef: 'static, Ev: Send + 'static> Default for EffectRouter<Ef, Ev> {
    fn default() -> Self {
        Self::new()
    }
}

/// A route whose extractor is set but whose target is not.
#[must_use = "a partial route is only registered once a target is given"]
pub struct PartialRoute<Ef, Ev, P> {
    router: EffectRouter<Ef, Ev>,
    extract: Extractor<Ef, P>,
}

impl<Ef: 'static, Ev: Send + 'static, P: 'static> PartialRoute<Ef, Ev, P> {
    /// Route payloads to a connectable. It has no completion signal, so it
    /// runs until the router is disposed.
    pub fn to_connectable(self, target: impl Connectable<P, Ev> + 'static) -> EffectRouter<Ef, Ev> {
        let Self { mut router, extract } = self;
        router.routes.push(Box::new(TypedRoute {
            extract,
            target: Box::new(target),
        }));
        router
    }

    /// Route payloads to an effect handler, tracked by its own executor.
    pub fn to(self, handler: impl EffectHandler<P, Ev> + 'static) -> EffectRouter<Ef, Ev> {
        self.to_connectable(HandlerConnectable::new(handler))
    }

    pub fn to_side_effect(self, f: impl Fn(P) + Send + Sync + 'static) -> EffectRouter<Ef, Ev> {
        self.to(SideEffectHandler(f))
    }

    /// Map each payload to exactly one event.
    pub fn to_event(self, f: impl Fn(P) -> Ev + Send + Sync + 'static) -> EffectRouter<Ef, Ev> {
        self.to(EventsHandler(move |payload: P| std::iter::once(f(payload))))
    }

    /// Map each payload to zero or more events.
    pub fn to_events<I>(self, f: impl Fn(P) -> I + Send + Sync + 'static) -> EffectRouter<Ef, Ev>
    where
        I: IntoIterator<Item = Ev>,
    {
        self.to(EventsHandler(f))
    }

    /// Run each payload through an async function on `runtime`; its events
    /// are emitted when the future completes. Disposal aborts the task.
    pub fn to_async<F, Fut, I>(self, runtime: Handle, f: F) -> EffectRouter<Ef, Ev>
    where
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = I> + Send + 'static,
        I: IntoIterator<Item = Ev>,
    {
        self.to(AsyncHandler::new(runtime, f))
    }
}

// ============================================================================
// Compiled router
// ============================================================================

pub struct RouterConnectable<Ef, Ev> {
    routes: Vec<Box<dyn Route<Ef, Ev>>>,
    slot: ConnectionSlot,
    error_hook: ErrorHook,
}

impl<Ef, Ev> Connectable<Ef, Ev> for RouterConnectable<Ef, Ev>
where
    Ef: fmt::Debug + 'static,
    Ev: 'static,
{
    fn connect(&self, output: Consumer<Ev>) -> Result<Box<dyn Connection<Ef>>, LoopError> {
        let lease = self.slot.acquire()?;

        let mut connections = Vec::with_capacity(self.routes.len());
        for route in &self.routes {
            match route.connect(output.clone()) {
                Ok(connection) => connections.push(connection),
                Err(err) => {
                    for connection in &connections {
                        connection.dispose();
                    }
                    return Err(err);
                }
            }
        }

        let router = RouterConnection {
            routes: connections,
            error_hook: self.error_hook.clone(),
        };
        Ok(Box::new(GuardedConnection::new(
            Box::new(router),
            Some(lease),
            self.error_hook.clone(),
        )))
    }
}

struct RouterConnection<Ef> {
    routes: Vec<Box<dyn RouteConnection<Ef>>>,
    error_hook: ErrorHook,
}

impl<Ef: fmt::Debug> Connection<Ef> for RouterConnection<Ef> {
    fn accept(&self, effect: Ef) {
        let mut matched = Vec::new();
        let mut dispatch = None;
        for (index, route) in self.routes.iter().enumerate() {
            if let Some(send) = route.extract(&effect) {
                matched.push(index);
                dispatch = Some(send);
            }
        }

        match dispatch {
            Some(send) if matched.len() == 1 => send(),
            _ => {
                tracing::error!(
                    matches = matched.len(),
                    effect = ?effect,
                    routes = ?matched,
                    "Effect routing failed"
                );
                self.error_hook
                    .report(LoopError::routing(matched.len(), &effect, matched));
            }
        }
    }

    fn dispose(&self) {
        for route in &self.routes {
            route.dispose();
        }
    }
}
