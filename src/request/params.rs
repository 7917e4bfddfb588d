use super::Request;
use std::collections::BTreeMap;
use std::str::FromStr;

/// The key the request context is injected under.  A route pattern may not
/// use it as the name of a capture group.
pub const RESERVED_KEY: &str = "request";

/// The path parameters of a resolved route, plus the request context the
/// middleware chain produced.
///
/// Only the named capture groups of the route's pattern are kept; unnamed
/// groups are discarded, and so are named groups that did not take part in
/// the match.
///
/// # Examples
/// ```rust
/// # use trellis::*;
/// # fn main() -> Result<(), anyhow::Error> {
/// let mut router = Router::default();
/// router.get("/users/(?<id>[0-9]+)", |_: Params| Response::raw("ok"), ())?;
/// let resolved = router.resolve("GET", "/users/42", &Middlewares::default())?;
/// assert_eq!(resolved.params.get("id"), Some("42"));
/// assert_eq!(resolved.params.parse::<u32>("id"), Some(42));
/// assert_eq!(resolved.params.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Params {
    values: BTreeMap<String, String>,
    request: Request,
}

impl Params {
    pub(crate) fn new(values: BTreeMap<String, String>, request: Request) -> Self {
        Params { values, request }
    }

    /// Retrieves a path parameter by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Retrieves a path parameter by name, then attempts to parse it.
    pub fn parse<T: FromStr>(&self, name: &str) -> Option<T> {
        self.get(name).and_then(|v| v.parse().ok())
    }

    /// Iterates over every path parameter, ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The number of path parameters (the request context not included).
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether or not there are no path parameters.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The request context, as produced by the route's middleware chain.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// A mutable reference to the request context.
    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    /// Consumes the parameters, returning the request context.
    pub fn into_request(self) -> Request {
        self.request
    }
}
