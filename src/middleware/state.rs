use super::Middleware;
use crate::Request;

#[derive(Clone)]
/// The middleware for inserting state into a request context.
///
/// This stores a clone of the inner value in the context under the given
/// key every time the middleware is run.  You can use as many state
/// middlewares as you like, as long as their keys do not overlap (otherwise,
/// the last value would win).
///
/// This type requires the inner type to be `Clone`, as it must be cloned on
/// every request.  It is recommended to wrap the type in a reference-counting
/// type, like [`std::sync::Arc`], if it is not already in one.
///
/// # Examples
/// ```rust
/// # use trellis::*;
/// # use trellis::middleware::StateMiddleware;
/// # fn main() -> Result<(), anyhow::Error> {
/// let mut middlewares = Middlewares::default();
/// middlewares.register("limit", StateMiddleware::new("limit", 25u32));
/// let mut router = Router::default();
/// router.get("/items", |_: Params| Response::raw("items"), "limit")?;
/// let resolved = router.resolve("GET", "/items", &middlewares)?;
/// assert_eq!(resolved.params.request().get::<u32>("limit"), Some(&25));
/// # Ok(())
/// # }
/// ```
pub struct StateMiddleware<T> {
    key: String,
    value: T,
}

impl<T> StateMiddleware<T> {
    /// Creates an instance of the state middleware with the given key and
    /// value.
    pub fn new(key: impl Into<String>, value: T) -> Self {
        StateMiddleware {
            key: key.into(),
            value,
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Middleware for StateMiddleware<T> {
    fn handle(&self, request: Request) -> Result<Request, anyhow::Error> {
        Ok(request.with(self.key.clone(), self.value.clone()))
    }
}

impl<T> std::fmt::Debug for StateMiddleware<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = std::any::type_name::<T>();

        f.debug_struct("StateMiddleware")
            .field("key", &self.key)
            .field("type", &name)
            .finish()
    }
}
