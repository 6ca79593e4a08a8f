use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use std::result::Result;

/// One stage of a request pipeline.
///
/// A stage either produces the result itself or hands the request to the
/// remaining stages through [`Next::run`].
#[async_trait::async_trait]
pub trait Middleware<TCtx: Send, TReq: Sync, TRes, TErr>: Send + Sync {
    /// Stage name, used in trace output.
    fn name(&self) -> &'static str;

    #[inline]
    async fn handle(
        &self,
        ctx: &mut TCtx,
        req: &TReq,
        next: Next<'_, TCtx, TReq, TRes, TErr>,
    ) -> Result<TRes, TErr> {
        next.run(ctx, req).await
    }
}

/// Runs when every stage has delegated.
#[async_trait::async_trait]
pub trait MiddlewareDefaultHandler<TCtx, TReq, TRes, TErr>: Send + Sync {
    async fn handle(&self, ctx: &mut TCtx, req: &TReq) -> Result<TRes, TErr>;
}

pub struct Next<'a, TCtx, TReq, TRes, TErr> {
    default: &'a Arc<dyn MiddlewareDefaultHandler<TCtx, TReq, TRes, TErr>>,
    middlewares: &'a [Arc<dyn Middleware<TCtx, TReq, TRes, TErr>>],
}

impl<'a, TCtx: Send, TReq: Sync, TRes, TErr> Next<'a, TCtx, TReq, TRes, TErr> {
    pub(crate) fn new(
        default: &'a Arc<dyn MiddlewareDefaultHandler<TCtx, TReq, TRes, TErr>>,
        middlewares: &'a [Arc<dyn Middleware<TCtx, TReq, TRes, TErr>>],
    ) -> Self {
        Self {
            default,
            middlewares,
        }
    }

    #[inline]
    pub fn run(mut self, ctx: &'a mut TCtx, req: &'a TReq) -> BoxFuture<'a, Result<TRes, TErr>> {
        if let Some((current, rest)) = self.middlewares.split_first() {
            self.middlewares = rest;
            tracing::trace!("entering middleware {}", current.name());
            current.handle(ctx, req, self).boxed()
        } else {
            self.default.handle(ctx, req).boxed()
        }
    }
}

impl<TCtx, TReq, TRes, TErr> Clone for Next<'_, TCtx, TReq, TRes, TErr> {
    fn clone(&self) -> Self {
        Self {
            default: self.default,
            middlewares: self.middlewares,
        }
    }
}

pub struct MiddlewareBuilder<TCtx, TReq, TRes, TErr> {
    default: Arc<dyn MiddlewareDefaultHandler<TCtx, TReq, TRes, TErr>>,
    middleware_stack: Vec<Arc<dyn Middleware<TCtx, TReq, TRes, TErr>>>,
}

impl<TCtx: Send, TReq: Sync, TRes, TErr> MiddlewareBuilder<TCtx, TReq, TRes, TErr> {
    #[inline]
    pub fn new(default: impl MiddlewareDefaultHandler<TCtx, TReq, TRes, TErr> + 'static) -> Self {
        Self {
            default: Arc::new(default),
            middleware_stack: Default::default(),
        }
    }

    /// Convenience method to attach middleware.
    ///
    /// If you need to keep a reference to the middleware after attaching, use [`with_arc`].
    ///
    /// [`with_arc`]: Self::with_arc
    #[inline]
    pub fn with<M>(self, middleware: M) -> Self
    where
        M: Middleware<TCtx, TReq, TRes, TErr> + 'static,
    {
        self.with_arc(Arc::new(middleware))
    }

    /// Add middleware to the chain. [`with`] is more ergonomic if you don't need the `Arc`.
    ///
    /// [`with`]: Self::with
    #[inline]
    pub fn with_arc(mut self, middleware: Arc<dyn Middleware<TCtx, TReq, TRes, TErr>>) -> Self {
        self.middleware_stack.push(middleware);
        self
    }

    #[inline]
    pub fn build(self) -> MiddlewareHost<TCtx, TReq, TRes, TErr> {
        MiddlewareHost {
            default: self.default,
            middleware_stack: self.middleware_stack.into_boxed_slice(),
        }
    }
}

pub struct MiddlewareHost<TCtx, TReq, TRes, TErr> {
    default: Arc<dyn MiddlewareDefaultHandler<TCtx, TReq, TRes, TErr>>,
    middleware_stack: Box<[Arc<dyn Middleware<TCtx, TReq, TRes, TErr>>]>,
}

impl<TCtx: Send, TReq: Sync, TRes, TErr> MiddlewareHost<TCtx, TReq, TRes, TErr> {
    pub async fn execute(&self, ctx: &mut TCtx, req: &TReq) -> Result<TRes, TErr> {
        let next = Next::new(&self.default, &self.middleware_stack);
        next.run(ctx, req).await
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.middleware_stack.iter().map(|m| m.name()).collect()
    }
}
