mod params;

pub use self::params::{Params, RESERVED_KEY};
use crate::Method;
use std::any::Any;
use std::collections::HashMap;

type Value = Box<dyn Any + Send + Sync>;

/// The request context.
///
/// A fresh context is created for every dispatch, and then threaded through
/// the route's middleware chain; each middleware takes ownership of the
/// context and hands back the (potentially modified) context for the next
/// one.  The final context is handed to the endpoint through
/// [`crate::Params::request`].
///
/// The context carries the head of the incoming request (method, path,
/// headers) and its body, which are read-only, and a string-keyed data bag,
/// which starts out empty and is where middleware leaves information for the
/// endpoint.
///
/// # Examples
/// ```rust
/// # use trellis::*;
/// let mut request = Request::new(Method::Get, "/users/1");
/// request.set("user", String::from("alice"));
/// assert_eq!(request.get::<String>("user").map(String::as_str), Some("alice"));
/// assert_eq!(request.get::<u32>("user"), None);
/// ```
pub struct Request {
    method: Method,
    path: String,
    headers: http::HeaderMap<http::HeaderValue>,
    body: Vec<u8>,
    data: HashMap<String, Value>,
}

impl Request {
    /// Creates a new context for the given method and (already cleaned)
    /// path, with no headers, an empty body, and an empty data bag.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Request {
            method,
            path: path.into(),
            headers: http::HeaderMap::new(),
            body: vec![],
            data: HashMap::new(),
        }
    }

    pub(crate) fn with_head(
        mut self,
        headers: http::HeaderMap<http::HeaderValue>,
        body: Vec<u8>,
    ) -> Self {
        self.headers = headers;
        self.body = body;
        self
    }

    /// The method of the incoming request.
    pub fn method(&self) -> Method {
        self.method
    }

    /// The path of the incoming request, without its query string or
    /// fragment.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The headers of the incoming request.
    pub fn headers(&self) -> &http::HeaderMap<http::HeaderValue> {
        &self.headers
    }

    /// The body of the incoming request.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The media type of the incoming request's body, if it carries a valid
    /// `content-type` header.
    pub fn content_type(&self) -> Option<mime::Mime> {
        self.headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    }

    /// Retrieves the value stored under the given key, if there is one and
    /// it is of type `T`.
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<&T> {
        self.data.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Retrieves a mutable reference to the value stored under the given
    /// key, if there is one and it is of type `T`.
    ///
    /// # Examples
    /// ```rust
    /// # use trellis::*;
    /// let mut request = Request::new(Method::Get, "/").with("hits", 1u32);
    /// *request.get_mut::<u32>("hits").unwrap() += 1;
    /// assert_eq!(request.get::<u32>("hits"), Some(&2));
    /// ```
    pub fn get_mut<T: Send + Sync + 'static>(&mut self, key: &str) -> Option<&mut T> {
        self.data.get_mut(key).and_then(|v| v.downcast_mut::<T>())
    }

    /// Stores a value under the given key, replacing whatever was there.
    pub fn set<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: T) -> &mut Self {
        self.data.insert(key.into(), Box::new(value));
        self
    }

    /// Stores a value under the given key, consuming `self`, and then
    /// returning the new context.  This is the same as [`Self::set`], but it
    /// plays nicer with middleware that hand the context back.
    pub fn with<T: Send + Sync + 'static>(mut self, key: impl Into<String>, value: T) -> Self {
        self.set(key, value);
        self
    }

    /// Removes the value stored under the given key, if it is of type `T`.
    /// A value of any other type is left in place.
    ///
    /// # Examples
    /// ```rust
    /// # use trellis::*;
    /// let mut request = Request::new(Method::Get, "/").with("hits", 1u32);
    /// assert_eq!(request.remove::<String>("hits"), None);
    /// assert_eq!(request.remove::<u32>("hits"), Some(1));
    /// assert!(!request.contains("hits"));
    /// ```
    pub fn remove<T: Send + Sync + 'static>(&mut self, key: &str) -> Option<T> {
        if !self.data.get(key)?.is::<T>() {
            return None;
        }

        self.data
            .remove(key)
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }

    /// Whether or not anything is stored under the given key.
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// The keys currently stored in the data bag, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.data.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys = self.keys().collect::<Vec<_>>();
        keys.sort_unstable();
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("headers", &self.headers)
            .field("data", &keys)
            .finish_non_exhaustive()
    }
}
