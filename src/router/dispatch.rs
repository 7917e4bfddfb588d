use super::Router;
use crate::endpoint::Handler;
use crate::middleware::{Chain, Middlewares};
use crate::request::{Params, Request};
use crate::{Method, TrellisError};

#[derive(Debug)]
/// The result of resolving a request: the handler of the matching route,
/// and its parameters (which carry the request context the route's
/// middleware produced).
pub struct Resolved {
    /// The handler of the route that matched.
    pub handler: Handler,
    /// The path parameters, and the final request context.
    pub params: Params,
}

#[derive(Debug, Clone, Copy)]
/// Resolves incoming requests against a [`Router`].
///
/// The dispatcher borrows the router and the middleware table; both are
/// built during startup and only read from here on.
pub struct Dispatcher<'a> {
    router: &'a Router,
    middlewares: &'a Middlewares,
}

impl<'a> Dispatcher<'a> {
    /// Creates a dispatcher over the given router and middleware table.
    pub fn new(router: &'a Router, middlewares: &'a Middlewares) -> Self {
        Dispatcher {
            router,
            middlewares,
        }
    }

    /// Resolves the given method and raw URI.
    ///
    /// The query string and fragment are removed from the URI first; then
    /// the routes registered for the method are tried in order, and the
    /// first one matching the path wins.  Its middleware chain runs on a
    /// fresh request context, and the result is returned with the matched
    /// path parameters.
    ///
    /// The method must be given in upper case, as HTTP methods are
    /// case-sensitive; `get` is not `GET`.
    ///
    /// # Errors
    /// This fails with [`TrellisError::NoRouteForMethod`] if the method is
    /// not an upper-case supported method, or has no routes at all, with [`TrellisError::RouteNotFound`] if no pattern
    /// matches the path, and with [`TrellisError::InvalidMiddleware`] if a
    /// middleware name does not resolve.  An error from a middleware itself
    /// is returned unchanged.
    ///
    /// # Examples
    /// ```rust
    /// # use trellis::*;
    /// # fn main() -> Result<(), anyhow::Error> {
    /// let mut router = Router::default();
    /// router.get("/users/{id}", "Users@show", ())?;
    /// let middlewares = Middlewares::default();
    /// let dispatcher = Dispatcher::new(&router, &middlewares);
    /// let resolved = dispatcher.resolve("GET", "/users/5?sort=asc#frag")?;
    /// assert_eq!(resolved.params.get("id"), Some("5"));
    /// assert_eq!(resolved.params.request().path(), "/users/5");
    /// # Ok(())
    /// # }
    /// ```
    pub fn resolve(&self, method: &str, uri: &str) -> Result<Resolved, anyhow::Error> {
        self.resolve_with(method, uri, http::HeaderMap::new(), vec![])
    }

    /// Resolves an incoming HTTP request.  This is the same as
    /// [`Self::resolve`], except that the request's headers and body are
    /// made available on the request context.
    ///
    /// # Errors
    /// See [`Self::resolve`].
    pub fn resolve_request(&self, request: http::Request<Vec<u8>>) -> Result<Resolved, anyhow::Error> {
        let (parts, body) = request.into_parts();
        let uri = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path(), |p| p.as_str());
        self.resolve_with(parts.method.as_str(), uri, parts.headers, body)
    }

    fn resolve_with(
        &self,
        method: &str,
        uri: &str,
        headers: http::HeaderMap<http::HeaderValue>,
        body: Vec<u8>,
    ) -> Result<Resolved, anyhow::Error> {
        let path = clean_uri(uri);
        // Incoming methods are case-sensitive, unlike registration.
        let method = Method::ALL
            .into_iter()
            .find(|m| m.as_str() == method)
            .ok_or_else(|| TrellisError::NoRouteForMethod(method.to_owned()))?;
        let routes = self.router.lookup(method)?;

        let (route, values) = routes
            .iter()
            .find_map(|route| {
                log::trace!("{} {} =~ {:?}", method, path, route.pattern.regex());
                route.pattern.captures(path).map(|values| (route, values))
            })
            .ok_or_else(|| TrellisError::RouteNotFound {
                method,
                path: path.to_owned(),
            })?;

        log::debug!("{} {} --> {} {:?}", method, path, route.path(), route.handler());

        let request = Request::new(method, path).with_head(headers, body);
        let request = Chain::new(route.middleware(), self.middlewares).apply(request)?;

        Ok(Resolved {
            handler: route.handler().clone(),
            params: Params::new(values, request),
        })
    }
}

// The first `?` or `#` ends the path.
fn clean_uri(uri: &str) -> &str {
    uri.find(|c| c == '?' || c == '#')
        .map_or(uri, |end| &uri[..end])
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::middleware::Middleware;
    use crate::{Params, Response};

    fn simple_endpoint(_: Params) -> Response {
        Response::raw("")
    }

    #[derive(Debug)]
    struct SetA;

    impl Middleware for SetA {
        fn handle(&self, request: Request) -> Result<Request, anyhow::Error> {
            Ok(request.with("a", "from-a".to_owned()))
        }
    }

    #[derive(Debug)]
    struct ReadA;

    impl Middleware for ReadA {
        fn handle(&self, request: Request) -> Result<Request, anyhow::Error> {
            let seen = request.get::<String>("a").cloned();
            Ok(request.with("b", seen))
        }
    }

    fn middlewares() -> Middlewares {
        let mut middlewares = Middlewares::default();
        middlewares.register("m1", SetA).register("m2", ReadA);
        middlewares
    }

    fn router() -> Router {
        let mut router = Router::default();
        router
            .get("/users/{id}", "Users@show", ())
            .and_then(|r| r.get("/users/new", "Users@create", ()))
            .and_then(|r| r.get("/posts/(?<id>[0-9]+)", "Posts@show", ["m1", "m2"]))
            .and_then(|r| r.get("/broken", simple_endpoint, "missing"))
            .and_then(|r| r.post("/users", "Users@store", ()))
            .unwrap();
        router
    }

    fn named(resolved: &Resolved) -> (&str, &str) {
        match &resolved.handler {
            Handler::Named { controller, action } => (controller.as_str(), action.as_str()),
            Handler::Function(_) => panic!("expected a named handler"),
        }
    }

    #[test]
    fn test_clean_uri() {
        assert_eq!(clean_uri("/users/5?sort=asc#frag"), "/users/5");
        assert_eq!(clean_uri("/users/5#frag?x"), "/users/5");
        assert_eq!(clean_uri("/users/5"), "/users/5");
        assert_eq!(clean_uri("?x"), "");
    }

    #[test]
    fn test_first_match_wins() {
        let router = router();
        let resolved = router.resolve("GET", "/users/new", &middlewares()).unwrap();
        assert_eq!(named(&resolved), ("Users", "show"));
        assert_eq!(resolved.params.get("id"), Some("new"));
    }

    #[test]
    fn test_query_and_fragment_ignored() {
        let router = router();
        let middlewares = middlewares();
        let plain = router.resolve("GET", "/users/5", &middlewares).unwrap();
        let noisy = router
            .resolve("GET", "/users/5?sort=asc#frag", &middlewares)
            .unwrap();
        assert_eq!(named(&plain), named(&noisy));
        assert_eq!(
            plain.params.iter().collect::<Vec<_>>(),
            noisy.params.iter().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_named_capture_only() {
        let router = router();
        let resolved = router.resolve("GET", "/posts/42", &middlewares()).unwrap();
        assert_eq!(
            resolved.params.iter().collect::<Vec<_>>(),
            vec![("id", "42")]
        );
    }

    #[test]
    fn test_middleware_order() {
        let router = router();
        let resolved = router.resolve("GET", "/posts/42", &middlewares()).unwrap();
        let request = resolved.params.request();
        assert_eq!(request.get::<String>("a").map(String::as_str), Some("from-a"));
        assert_eq!(
            request.get::<Option<String>>("b"),
            Some(&Some("from-a".to_owned()))
        );
    }

    #[test]
    fn test_fresh_context_without_middleware() {
        let router = router();
        let resolved = router.resolve("GET", "/users/1", &middlewares()).unwrap();
        assert_eq!(resolved.params.request().keys().count(), 0);
    }

    #[test]
    fn test_not_found_vs_no_method() {
        let router = router();
        let error = router.resolve("GET", "/nowhere", &middlewares()).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<TrellisError>(),
            Some(TrellisError::RouteNotFound { path, .. }) if path == "/nowhere"
        ));

        let error = router.resolve("DELETE", "/users/1", &middlewares()).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<TrellisError>(),
            Some(TrellisError::NoRouteForMethod(_))
        ));

        let error = router.resolve("OPTIONS", "/users/1", &middlewares()).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<TrellisError>(),
            Some(TrellisError::NoRouteForMethod(m)) if m == "OPTIONS"
        ));
    }

    #[test]
    fn test_method_case_sensitive() {
        let router = router();
        for method in ["get", "Get"] {
            let error = router.resolve(method, "/users/1", &middlewares()).unwrap_err();
            assert!(matches!(
                error.downcast_ref::<TrellisError>(),
                Some(TrellisError::NoRouteForMethod(m)) if m == method
            ));
        }
        assert!(router.resolve("GET", "/users/1", &middlewares()).is_ok());
    }

    #[test]
    fn test_invalid_middleware() {
        let router = router();
        let error = router.resolve("GET", "/broken", &middlewares()).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<TrellisError>(),
            Some(TrellisError::InvalidMiddleware(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_resolve_request() {
        let router = router();
        let middlewares = middlewares();
        let request = http::Request::builder()
            .method(http::Method::POST)
            .uri("https://example.com/users?page=2")
            .header("content-type", "application/json")
            .body(b"{}".to_vec())
            .unwrap();
        let resolved = Dispatcher::new(&router, &middlewares)
            .resolve_request(request)
            .unwrap();
        assert_eq!(named(&resolved), ("Users", "store"));
        let request = resolved.params.request();
        assert_eq!(request.path(), "/users");
        assert_eq!(request.body(), b"{}");
        assert_eq!(request.headers()["content-type"], "application/json");
    }
}
