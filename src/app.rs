use crate::endpoint::{Controllers, Handler};
use crate::middleware::{MiddlewareRef, Middlewares};
use crate::router::{Dispatcher, Resolved, Router};
use crate::{Config, Response, TrellisError};
use std::io::Write;

#[derive(Debug, Default)]
/// The application.
///
/// This ties the route registry, the middleware table, and the controller
/// registry together, and turns every request into a response.  Requests
/// are resolved by the router, run through the route's middleware, and
/// then handed to the route's handler.  Any error along the way is handled
/// as follows:
///
/// - HTTP errors (a route that cannot be found, or a
///   [`TrellisError::Http`] raised by a handler or middleware) become a
///   JSON error response with the error's message and status, e.g.
///   `{"status":"error","error":"Not found"}` with a `404`.
/// - In debug mode, any other error is returned as-is to the host.
/// - Otherwise, the error is logged, and becomes a `500` with the message
///   `Internal Server Error`.
///
/// # Examples
/// ```rust
/// # use trellis::*;
/// # fn main() -> Result<(), anyhow::Error> {
/// let mut app = App::new(Config::default());
/// app.router_mut()
///     .get("/hello/{name}", |params: Params| {
///         Response::raw(format!("hello, {}", params.get("name").unwrap_or("you")))
///     }, ())?;
/// app.prepare()?;
///
/// let response = app.handle("GET", "/hello/world?x=1")?;
/// assert_eq!(response.body()?, b"hello, world");
///
/// let response = app.handle("GET", "/bye")?;
/// assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
/// assert_eq!(response.body()?, br#"{"status":"error","error":"Not found"}"#);
/// # Ok(())
/// # }
/// ```
pub struct App {
    router: Router,
    middlewares: Middlewares,
    controllers: Controllers,
    config: Config,
}

impl App {
    /// Creates an application with the given configuration, and nothing
    /// registered.
    pub fn new(config: Config) -> Self {
        App {
            config,
            ..App::default()
        }
    }

    /// Creates an application configured from the environment (and a
    /// `.env` file, if there is one).  See [`Config::load`].
    ///
    /// # Errors
    /// This fails if the environment is invalid.
    pub fn from_env() -> Result<Self, TrellisError> {
        Ok(App::new(Config::load()?))
    }

    /// The route registry.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// The route registry, for registering routes.
    pub fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    /// The middleware table, for registering named middleware.
    pub fn middlewares_mut(&mut self) -> &mut Middlewares {
        &mut self.middlewares
    }

    /// The controller registry, for registering controllers that
    /// `Controller@action` handlers resolve against.
    pub fn controllers_mut(&mut self) -> &mut Controllers {
        &mut self.controllers
    }

    /// The configuration of the application.
    pub fn config(&self) -> Config {
        self.config
    }

    /// Checks the application before it starts handling requests.
    ///
    /// Every named handler must resolve to a registered controller action.
    /// A middleware name with nothing registered under it only produces a
    /// warning, as the route may never be requested; dispatching it fails
    /// with [`TrellisError::InvalidMiddleware`].
    ///
    /// # Errors
    /// This fails with [`TrellisError::RouterConfiguration`] for the first
    /// named handler that does not resolve.
    pub fn prepare(&self) -> Result<(), TrellisError> {
        for route in self.router.routes() {
            log::trace!("route: {} {} -> {:?}", route.method(), route.path(), route.handler());

            if let Handler::Named { controller, action } = route.handler() {
                if self.controllers.lookup(controller, action).is_none() {
                    return Err(TrellisError::RouterConfiguration(format!(
                        "route {} {} is bound to {}@{}, which is not registered",
                        route.method(),
                        route.path(),
                        controller,
                        action
                    )));
                }
            }

            for middleware in route.middleware() {
                match middleware {
                    MiddlewareRef::Named(name) if !self.middlewares.contains(name) => {
                        log::warn!(
                            "route {} {} uses middleware {:?}, which is not registered",
                            route.method(),
                            route.path(),
                            name
                        );
                    }
                    _ => {}
                }
            }
        }

        log::info!("prepared {} routes (debug: {})", self.router.len(), self.config.debug);
        Ok(())
    }

    /// Handles a request given its method and raw URI (which may include a
    /// query string and fragment).
    ///
    /// # Errors
    /// This only fails in debug mode, for an error that is not an HTTP
    /// error; the error is returned unchanged.
    pub fn handle(&self, method: &str, uri: &str) -> Result<Response, anyhow::Error> {
        let resolved = Dispatcher::new(&self.router, &self.middlewares).resolve(method, uri);
        self.complete(resolved)
    }

    /// Handles an incoming HTTP request.  This is the same as
    /// [`Self::handle`], except that the headers and body of the request are
    /// available to middleware and handlers.
    ///
    /// # Errors
    /// See [`Self::handle`].
    pub fn handle_request(&self, request: http::Request<Vec<u8>>) -> Result<Response, anyhow::Error> {
        let resolved = Dispatcher::new(&self.router, &self.middlewares).resolve_request(request);
        self.complete(resolved)
    }

    /// Handles a request, and writes the response out.  See
    /// [`Self::handle`] and [`Response::emit`].
    ///
    /// # Errors
    /// This fails if handling the request fails, or if writing the
    /// response fails.
    pub fn serve<W: Write>(&self, method: &str, uri: &str, out: &mut W) -> Result<(), anyhow::Error> {
        self.handle(method, uri)?.emit(out)?;
        Ok(())
    }

    fn complete(&self, resolved: Result<Resolved, anyhow::Error>) -> Result<Response, anyhow::Error> {
        resolved
            .and_then(|resolved| self.dispatch(resolved))
            .or_else(|error| self.recover(error))
    }

    fn dispatch(&self, resolved: Resolved) -> Result<Response, anyhow::Error> {
        let Resolved { handler, params } = resolved;
        match handler {
            Handler::Function(endpoint) => endpoint.apply(params),
            Handler::Named { controller, action } => match self.controllers.lookup(&controller, &action) {
                Some(endpoint) => endpoint.apply(params),
                None => Err(TrellisError::UnknownHandler { controller, action }.into()),
            },
        }
    }

    fn recover(&self, error: anyhow::Error) -> Result<Response, anyhow::Error> {
        if let Some(known) = error.downcast_ref::<TrellisError>().filter(|e| e.is_http()) {
            log::debug!("request.http: {}", known);
            return Ok(Response::error(known.status(), known.client_message()));
        }

        if self.config.debug {
            return Err(error);
        }

        log::error!("request.error: {:?}", error);
        Ok(Response::error(
            http::StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error".to_owned(),
        ))
    }
}
