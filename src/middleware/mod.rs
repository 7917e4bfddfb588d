//! Request middleware.
//!
//! A middleware is a transform from one [`Request`] context into the next.
//! Each route carries an ordered chain of middleware references; when the
//! route is resolved, the chain runs in registration order, with the first
//! middleware receiving a fresh, empty context, and each following one
//! receiving whatever the previous returned.
//!
//! ```rust
//! # use trellis::*;
//! # fn main() -> Result<(), anyhow::Error> {
//! #[derive(Debug)]
//! struct Greeting;
//!
//! impl Middleware for Greeting {
//!     fn handle(&self, request: Request) -> Result<Request, anyhow::Error> {
//!         Ok(request.with("greeting", "hello"))
//!     }
//! }
//!
//! let mut middlewares = Middlewares::default();
//! middlewares.register("greeting", Greeting);
//! let mut router = Router::default();
//! router.get("/", |params: Params| {
//!     let greeting = params.request().get::<&str>("greeting").copied().unwrap_or("bye");
//!     Response::raw(greeting)
//! }, "greeting")?;
//! let resolved = router.resolve("GET", "/", &middlewares)?;
//! assert_eq!(resolved.params.request().get::<&str>("greeting"), Some(&"hello"));
//! # Ok(())
//! # }
//! ```

mod state;
mod trace;
pub use self::state::StateMiddleware;
pub use self::trace::TraceMiddleware;
use crate::{Request, TrellisError};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// A request context transform.
///
/// A middleware takes ownership of the context and hands it back, possibly
/// modified, for the next middleware in the chain (or the endpoint).  It
/// must not produce a response itself; the only way to stop the chain is to
/// fail, which is then handled by the application: a
/// [`TrellisError::Http`] error becomes a response with its status and
/// message (useful for e.g. authentication), while any other error is
/// treated as an internal error.
pub trait Middleware: Debug + Send + Sync + 'static {
    /// Transforms the given request context.
    fn handle(&self, request: Request) -> Result<Request, anyhow::Error>;
}

#[derive(Clone)]
/// A reference to a middleware, as stored in a route's chain.
///
/// A reference is either a name, which is looked up in the
/// [`Middlewares`] table whenever the route is resolved, or a shared
/// middleware instance.
pub enum MiddlewareRef {
    /// A middleware registered by name in [`Middlewares`].
    Named(String),
    /// A middleware instance.
    Instance(Arc<dyn Middleware>),
}

impl MiddlewareRef {
    /// Creates a reference to the given middleware instance.
    pub fn instance<M: Middleware>(middleware: M) -> Self {
        MiddlewareRef::Instance(Arc::new(middleware))
    }

    pub(crate) fn resolve<'a>(
        &'a self,
        table: &'a Middlewares,
    ) -> Result<&'a dyn Middleware, TrellisError> {
        match self {
            MiddlewareRef::Named(name) => table
                .get(name)
                .ok_or_else(|| TrellisError::InvalidMiddleware(name.clone())),
            MiddlewareRef::Instance(middleware) => Ok(&**middleware),
        }
    }
}

impl Debug for MiddlewareRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MiddlewareRef::Named(name) => f.debug_tuple("Named").field(name).finish(),
            MiddlewareRef::Instance(middleware) => {
                f.debug_tuple("Instance").field(middleware).finish()
            }
        }
    }
}

impl From<&str> for MiddlewareRef {
    fn from(name: &str) -> Self {
        MiddlewareRef::Named(name.to_owned())
    }
}

impl From<String> for MiddlewareRef {
    fn from(name: String) -> Self {
        MiddlewareRef::Named(name)
    }
}

#[derive(Default, Clone, Debug)]
/// The table of named middleware.
///
/// This is built during startup, next to the router, and consulted every
/// time a route with a named middleware reference is resolved.
pub struct Middlewares {
    table: HashMap<String, Arc<dyn Middleware>>,
}

impl Middlewares {
    /// Registers a middleware under the given name, replacing any previous
    /// middleware of that name.
    pub fn register<M: Middleware>(&mut self, name: impl Into<String>, middleware: M) -> &mut Self {
        self.table.insert(name.into(), Arc::new(middleware));
        self
    }

    /// Retrieves the middleware registered under the given name.
    pub fn get(&self, name: &str) -> Option<&dyn Middleware> {
        self.table.get(name).map(|m| &**m)
    }

    /// Whether or not a middleware is registered under the given name.
    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }
}

/// Converts the current type into a middleware chain.
///
/// This is what the route registration functions take for their middleware:
/// `()` or `None` for no middleware, a single name or [`MiddlewareRef`], or
/// an array or `Vec` of them.
pub trait IntoMiddlewareChain {
    /// Converts the current type into the ordered chain.
    fn into_chain(self) -> Vec<MiddlewareRef>;
}

impl IntoMiddlewareChain for () {
    fn into_chain(self) -> Vec<MiddlewareRef> {
        vec![]
    }
}

impl IntoMiddlewareChain for &str {
    fn into_chain(self) -> Vec<MiddlewareRef> {
        vec![self.into()]
    }
}

impl IntoMiddlewareChain for String {
    fn into_chain(self) -> Vec<MiddlewareRef> {
        vec![self.into()]
    }
}

impl IntoMiddlewareChain for MiddlewareRef {
    fn into_chain(self) -> Vec<MiddlewareRef> {
        vec![self]
    }
}

impl<T: IntoMiddlewareChain> IntoMiddlewareChain for Option<T> {
    fn into_chain(self) -> Vec<MiddlewareRef> {
        self.map(IntoMiddlewareChain::into_chain).unwrap_or_default()
    }
}

impl<T: Into<MiddlewareRef>> IntoMiddlewareChain for Vec<T> {
    fn into_chain(self) -> Vec<MiddlewareRef> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Into<MiddlewareRef>, const N: usize> IntoMiddlewareChain for [T; N] {
    fn into_chain(self) -> Vec<MiddlewareRef> {
        self.into_iter().map(Into::into).collect()
    }
}

#[derive(Copy, Clone, Debug)]
/// A route's middleware chain, bound to the table its names resolve in.
pub(crate) struct Chain<'a> {
    middleware: &'a [MiddlewareRef],
    table: &'a Middlewares,
}

impl<'a> Chain<'a> {
    pub(crate) fn new(middleware: &'a [MiddlewareRef], table: &'a Middlewares) -> Self {
        Chain { middleware, table }
    }

    /// Runs every middleware in order, threading the context through.  The
    /// first failure stops the chain; an unresolvable reference fails with
    /// [`TrellisError::InvalidMiddleware`].
    pub(crate) fn apply(self, request: Request) -> Result<Request, anyhow::Error> {
        self.middleware
            .iter()
            .try_fold(request, |request, reference| {
                let middleware = reference.resolve(self.table)?;
                log::trace!("middleware: {:?}", middleware);
                middleware.handle(request)
            })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Method;

    #[derive(Debug)]
    struct SetA;

    impl Middleware for SetA {
        fn handle(&self, request: Request) -> Result<Request, anyhow::Error> {
            Ok(request.with("a", 1u32))
        }
    }

    #[derive(Debug)]
    struct ReadA;

    impl Middleware for ReadA {
        fn handle(&self, request: Request) -> Result<Request, anyhow::Error> {
            let seen = request.get::<u32>("a").copied();
            Ok(request.with("b", seen))
        }
    }

    #[derive(Debug)]
    struct Deny;

    impl Middleware for Deny {
        fn handle(&self, _: Request) -> Result<Request, anyhow::Error> {
            Err(TrellisError::http(http::StatusCode::FORBIDDEN, "denied").into())
        }
    }

    fn table() -> Middlewares {
        let mut table = Middlewares::default();
        table.register("set_a", SetA).register("read_a", ReadA);
        table
    }

    #[test]
    fn test_chain_order() {
        let table = table();
        let chain = ["set_a", "read_a"].into_chain();
        let request = Chain::new(&chain, &table)
            .apply(Request::new(Method::Get, "/"))
            .unwrap();
        assert_eq!(request.get::<u32>("a"), Some(&1));
        assert_eq!(request.get::<Option<u32>>("b"), Some(&Some(1)));
    }

    #[test]
    fn test_chain_reversed_order() {
        let table = table();
        let chain = vec!["read_a", "set_a"].into_chain();
        let request = Chain::new(&chain, &table)
            .apply(Request::new(Method::Get, "/"))
            .unwrap();
        assert_eq!(request.get::<Option<u32>>("b"), Some(&None));
    }

    #[test]
    fn test_unknown_name() {
        let table = table();
        let chain = "missing".into_chain();
        let error = Chain::new(&chain, &table)
            .apply(Request::new(Method::Get, "/"))
            .unwrap_err();
        assert!(matches!(
            error.downcast_ref::<TrellisError>(),
            Some(TrellisError::InvalidMiddleware(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_instance_error_propagates() {
        let table = table();
        let chain = vec![MiddlewareRef::from("set_a"), MiddlewareRef::instance(Deny)];
        let error = Chain::new(&chain, &table)
            .apply(Request::new(Method::Get, "/"))
            .unwrap_err();
        let error = error.downcast::<TrellisError>().unwrap();
        assert_eq!(error.status(), http::StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_into_chain() {
        assert!(().into_chain().is_empty());
        assert!(None::<&str>.into_chain().is_empty());
        assert_eq!(Some("a").into_chain().len(), 1);
        assert_eq!(String::from("a").into_chain().len(), 1);
        assert_eq!(["a", "b", "c"].into_chain().len(), 3);
    }
}
