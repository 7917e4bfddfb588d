mod dispatch;
mod pattern;
mod route;

pub use self::dispatch::{Dispatcher, Resolved};
pub(crate) use self::pattern::Pattern;
pub use self::route::Route;
use crate::endpoint::IntoHandler;
use crate::middleware::{IntoMiddlewareChain, MiddlewareRef, Middlewares};
use crate::{Method, TrellisError};
use std::collections::HashMap;

/// The route registry.
///
/// This contains, for each method, an ordered list of routes: a pattern,
/// the handler it resolves to, and a middleware chain.  When a request is
/// resolved, the routes for its method are tried in the order they were
/// registered, and the _first_ route whose pattern matches the whole path
/// wins.  So, assuming that you have the following routes defined:
///
/// ```text
/// // ...
/// GET /users/{id} -> show_user
/// GET /users/new -> new_user
/// // ...
/// ```
///
/// The latter route will never be picked, as the former also matches
/// `/users/new` and is defined _before_ it.  More specific patterns must be
/// registered before more general ones.
///
/// # Patterns
///
/// A pattern is a regular expression which must match the entire path (it
/// is anchored at both ends), e.g. `/users/(?<id>[0-9]+)`.  The named groups
/// of the pattern become the path parameters; unnamed groups are ignored.
/// As a shorthand, a `{name}` or `{name:type}` placeholder expands into a
/// named group, where the type is one of:
///
/// - `oext`: matches an (optional) extension; e.g. `.jpeg`.
/// - `int`: matches an integer, positive or negative.
/// - `uint`: matches an unsigned integer.
/// - `path`: matches anything, including path segments (`/`).
/// - `uuid`: matches an [RFC 4122] UUID.
/// - none / `str` / `s` / `string`: matches any characters excluding a path
///   segment (`/`).
///
/// The name `request` is reserved, and cannot be used for a group.
///
/// [RFC 4122]: https://datatracker.ietf.org/doc/html/rfc4122
///
/// # Examples
/// ```rust
/// # use trellis::*;
/// # fn main() -> Result<(), anyhow::Error> {
/// let mut router = Router::default();
/// router
///     .get("/users", "Users@index", ())?
///     .get("/users/{id:uint}", "Users@show", ["auth"])?
///     .post("/users", "Users@store", vec!["auth", "audit"])?;
/// assert_eq!(router.len(), 3);
/// assert!(router.get("/users", "Users@index", ()).is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct Router {
    routes: HashMap<Method, Vec<Route>>,
}

macro_rules! method {
    ($($(#[$m:meta])* $v:vis fn $n:ident = $meth:expr;)+) => {
        $(
            $(#[$m])*
            ///
            /// # Errors
            /// See [`Router::route`].
            $v fn $n<H, M>(
                &mut self,
                pattern: &str,
                handler: H,
                middleware: M,
            ) -> Result<&mut Self, TrellisError>
            where
                H: IntoHandler,
                M: IntoMiddlewareChain,
            {
                self.insert($meth, pattern, handler, middleware)
            }
        )+
    };
}

impl Router {
    /// Registers a route.
    ///
    /// The method is matched without regard to case, but must be one of
    /// `GET`, `POST`, `PUT`, `PATCH`, or `DELETE`.
    ///
    /// # Errors
    /// This fails with [`TrellisError::RouterConfiguration`] if the method
    /// is not supported, if a route with the same method and pattern was
    /// already registered, if the handler is malformed, if a middleware
    /// name is empty, or if the pattern does not compile.
    pub fn route<H, M>(
        &mut self,
        method: &str,
        pattern: &str,
        handler: H,
        middleware: M,
    ) -> Result<&mut Self, TrellisError>
    where
        H: IntoHandler,
        M: IntoMiddlewareChain,
    {
        let method = method
            .parse::<Method>()
            .map_err(|e| TrellisError::RouterConfiguration(e.to_string()))?;
        self.insert(method, pattern, handler, middleware)
    }

    method![
        /// Registers a `GET` route.
        pub fn get = Method::Get;
        /// Registers a `POST` route.
        pub fn post = Method::Post;
        /// Registers a `PUT` route.
        pub fn put = Method::Put;
        /// Registers a `PATCH` route.
        pub fn patch = Method::Patch;
        /// Registers a `DELETE` route.
        pub fn delete = Method::Delete;
    ];

    fn insert<H, M>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: H,
        middleware: M,
    ) -> Result<&mut Self, TrellisError>
    where
        H: IntoHandler,
        M: IntoMiddlewareChain,
    {
        if self.find(method, pattern).is_some() {
            return Err(TrellisError::RouterConfiguration(format!(
                "route {} already exists with method {}",
                pattern, method
            )));
        }

        let handler = handler.into_handler()?;
        let middleware = middleware.into_chain();
        if middleware
            .iter()
            .any(|m| matches!(m, MiddlewareRef::Named(name) if name.is_empty()))
        {
            return Err(TrellisError::RouterConfiguration(format!(
                "route {} {} has an empty middleware name",
                method, pattern
            )));
        }
        let compiled = Pattern::new(pattern)?;

        log::trace!(
            "route: {} {} ({:?})",
            method,
            pattern,
            compiled.regex()
        );

        self.routes
            .entry(method)
            .or_default()
            .push(Route::new(method, pattern, compiled, handler, middleware));
        Ok(self)
    }

    /// Returns the routes registered for the given method, in registration
    /// order.
    ///
    /// # Errors
    /// This fails with [`TrellisError::NoRouteForMethod`] if no route has
    /// been registered with the method.
    pub fn lookup(&self, method: Method) -> Result<&[Route], TrellisError> {
        self.routes
            .get(&method)
            .map(Vec::as_slice)
            .ok_or_else(|| TrellisError::NoRouteForMethod(method.to_string()))
    }

    /// Finds the route registered with exactly the given method and
    /// pattern.
    pub fn find(&self, method: Method, pattern: &str) -> Option<&Route> {
        self.routes
            .get(&method)?
            .iter()
            .find(|route| route.path() == pattern)
    }

    /// Iterates over every registered route, grouped by method in the order
    /// of [`Method::ALL`].
    pub fn routes(&self) -> impl Iterator<Item = &Route> + '_ {
        Method::ALL
            .into_iter()
            .filter_map(move |method| self.routes.get(&method))
            .flatten()
    }

    /// The number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    /// Whether or not no routes have been registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves a request against the router.  This is a shortcut for
    /// [`Dispatcher::resolve`].
    ///
    /// # Errors
    /// See [`Dispatcher::resolve`].
    pub fn resolve(
        &self,
        method: &str,
        uri: &str,
        middlewares: &Middlewares,
    ) -> Result<Resolved, anyhow::Error> {
        Dispatcher::new(self, middlewares).resolve(method, uri)
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes().collect::<Vec<_>>())
            .finish()
    }
}
