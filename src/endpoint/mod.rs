//! Route handlers.
//!
//! A route is bound either to an [`Endpoint`] (usually a function or a
//! closure taking the [`Params`]), or to a `Controller@action` name that is
//! resolved through the [`Controllers`] registry at dispatch time.

mod controller;

pub use self::controller::{ControllerBuilder, Controllers};
use crate::request::Params;
use crate::response::IntoResponse;
use crate::{Response, TrellisError};
use std::sync::Arc;

/// A route handler.
///
/// This is automatically implemented for `Fn(Params) -> impl IntoResponse`
/// types, but it may be useful to implement this yourself.  All this is
/// meant to do is be a fallible function from the resolved [`Params`] into
/// a [`Response`].
pub trait Endpoint: Send + Sync + 'static {
    /// Transforms the parameters into the response.  However, this may
    /// fail, and such a failure is handled by the application.
    fn apply(&self, params: Params) -> Result<Response, anyhow::Error>;
}

impl<F, Res> Endpoint for F
where
    F: Fn(Params) -> Res + Send + Sync + 'static,
    Res: IntoResponse,
{
    fn apply(&self, params: Params) -> Result<Response, anyhow::Error> {
        self(params).into_response()
    }
}

/// Creates an endpoint that generates a response regardless of the
/// parameters.  This is best paired with something like
/// [`crate::Response::raw`].
pub fn simple<F, Res>(func: F) -> impl Endpoint
where
    F: Fn() -> Res + Send + Sync + 'static,
    Res: IntoResponse,
{
    move |_: Params| func()
}

/// Creates an endpoint from a method of a shared instance.
///
/// # Examples
/// ```rust
/// # use trellis::*;
/// # use std::sync::Arc;
/// struct Greeter {
///     greeting: String,
/// }
///
/// impl Greeter {
///     fn greet(&self, params: Params) -> Response {
///         Response::raw(format!("{}, {}", self.greeting, params.get("name").unwrap_or("you")))
///     }
/// }
///
/// # fn main() -> Result<(), anyhow::Error> {
/// let greeter = Arc::new(Greeter { greeting: "hello".to_owned() });
/// let mut router = Router::default();
/// router.get("/hello/{name}", endpoint::bound(greeter, Greeter::greet), ())?;
/// # Ok(())
/// # }
/// ```
pub fn bound<C, F, Res>(instance: Arc<C>, method: F) -> impl Endpoint
where
    C: Send + Sync + 'static,
    F: Fn(&C, Params) -> Res + Send + Sync + 'static,
    Res: IntoResponse,
{
    move |params: Params| method(&instance, params)
}

lazy_static::lazy_static! {
    static ref NAMED: regex::Regex =
        regex::Regex::new("^(?P<controller>[A-Za-z_][A-Za-z0-9_:]*)@(?P<action>[A-Za-z_][A-Za-z0-9_]*)$").unwrap();
}

#[derive(Clone)]
/// The handler a route is bound to.
///
/// This is either a function (which includes closures, [`Endpoint`]
/// implementations, and [`bound`] methods), or a `Controller@action` name
/// which is looked up in the application's [`Controllers`] when the route
/// is dispatched.
pub enum Handler {
    /// A directly invocable endpoint.
    Function(Arc<dyn Endpoint>),
    /// An action of a registered controller.
    Named {
        /// The name the controller is registered under.
        controller: String,
        /// The name of the action on the controller.
        action: String,
    },
}

impl Handler {
    /// Parses a `Controller@action` handler name.
    ///
    /// # Errors
    /// This fails with [`TrellisError::RouterConfiguration`] if the name is
    /// not of that shape.
    ///
    /// # Examples
    /// ```rust
    /// # use trellis::endpoint::Handler;
    /// assert!(Handler::named("UserController@show").is_ok());
    /// assert!(Handler::named("UserController").is_err());
    /// assert!(Handler::named("@show").is_err());
    /// ```
    pub fn named(name: &str) -> Result<Self, TrellisError> {
        let captures = NAMED.captures(name).ok_or_else(|| {
            TrellisError::RouterConfiguration(format!(
                "invalid handler {:?}, expected a function or a \"Controller@action\" name",
                name
            ))
        })?;

        Ok(Handler::Named {
            controller: captures["controller"].to_owned(),
            action: captures["action"].to_owned(),
        })
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handler::Function(_) => f.write_str("Handler::Function"),
            Handler::Named { controller, action } => write!(f, "Handler::Named({}@{})", controller, action),
        }
    }
}

/// Converts the current type into a [`Handler`].
///
/// This is what the route registration functions take for their handler:
/// any [`Endpoint`] (including plain functions and closures), or a
/// `Controller@action` name.
pub trait IntoHandler {
    /// Converts the current type into a handler.
    ///
    /// # Errors
    /// This fails with [`TrellisError::RouterConfiguration`] if the handler
    /// is malformed.
    fn into_handler(self) -> Result<Handler, TrellisError>;
}

impl<E: Endpoint> IntoHandler for E {
    fn into_handler(self) -> Result<Handler, TrellisError> {
        Ok(Handler::Function(Arc::new(self)))
    }
}

impl IntoHandler for &str {
    fn into_handler(self) -> Result<Handler, TrellisError> {
        Handler::named(self)
    }
}

impl IntoHandler for String {
    fn into_handler(self) -> Result<Handler, TrellisError> {
        Handler::named(&self)
    }
}

impl IntoHandler for Handler {
    fn into_handler(self) -> Result<Handler, TrellisError> {
        Ok(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Method, Request};
    use std::collections::BTreeMap;

    fn params() -> Params {
        let mut values = BTreeMap::new();
        values.insert("name".to_owned(), "bob".to_owned());
        Params::new(values, Request::new(Method::Get, "/hello/bob"))
    }

    #[test]
    fn test_closure_endpoint() {
        let endpoint = |params: Params| Response::raw(params.get("name").unwrap_or("").to_owned());
        let response = endpoint.apply(params()).unwrap();
        assert_eq!(response.body().unwrap(), b"bob");
    }

    #[test]
    fn test_fallible_endpoint() {
        let endpoint = |_: Params| -> Result<Response, anyhow::Error> { anyhow::bail!("broken") };
        assert!(endpoint.apply(params()).is_err());
    }

    #[test]
    fn test_simple_endpoint() {
        let endpoint = simple(|| Response::html("<i>x</i>"));
        let response = endpoint.apply(params()).unwrap();
        assert_eq!(response.headers()["content-type"], "text/html");
    }

    #[test]
    fn test_named_shapes() {
        assert!(matches!(
            Handler::named("Admin::Users@index"),
            Ok(Handler::Named { controller, action }) if controller == "Admin::Users" && action == "index"
        ));
        assert!(Handler::named("A@b@c").is_err());
        assert!(Handler::named("A@").is_err());
        assert!(Handler::named("A/b").is_err());
        assert!(Handler::named("").is_err());
    }

    #[test]
    fn test_into_handler() {
        assert!(matches!(
            "Users@show".into_handler(),
            Ok(Handler::Named { .. })
        ));
        assert!(matches!(
            (|_: Params| Response::raw("")).into_handler(),
            Ok(Handler::Function(_))
        ));
        assert!(String::from("nope").into_handler().is_err());
    }
}
