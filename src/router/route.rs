use super::Pattern;
use crate::endpoint::Handler;
use crate::middleware::MiddlewareRef;
use crate::Method;

/// A registered route.
///
/// A route is a method, a pattern, the handler the pattern resolves to, and
/// the middleware chain that runs before the handler.  Routes are created
/// by the [`crate::Router`] registration functions, and never change after.
pub struct Route {
    method: Method,
    path: String,
    pub(crate) pattern: Pattern,
    handler: Handler,
    middleware: Vec<MiddlewareRef>,
}

impl Route {
    pub(crate) fn new(
        method: Method,
        path: impl Into<String>,
        pattern: Pattern,
        handler: Handler,
        middleware: Vec<MiddlewareRef>,
    ) -> Self {
        Route {
            method,
            path: path.into(),
            pattern,
            handler,
            middleware,
        }
    }

    /// The method of the route.
    pub fn method(&self) -> Method {
        self.method
    }

    /// The pattern of the route, as it was registered.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The handler of the route.
    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// The middleware chain of the route, in the order it runs.
    pub fn middleware(&self) -> &[MiddlewareRef] {
        &self.middleware
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("handler", &self.handler)
            .field("middleware", &self.middleware)
            .finish_non_exhaustive()
    }
}
