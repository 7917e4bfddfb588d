use crate::Method;

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
/// Errors generated specifically from this library, and not its interactions
/// with user code.
pub enum TrellisError {
    /// Generated while registering routes; the route table is unusable and
    /// the application should not boot.
    #[error("invalid router configuration: {0}")]
    RouterConfiguration(String),
    /// Generated during dispatch when no route at all has been registered
    /// for the request's method.
    #[error("there are no routes registered with method {0}")]
    NoRouteForMethod(String),
    /// Generated during dispatch when no route pattern matches the path.
    #[error("no route matches {method} {path}")]
    RouteNotFound {
        /// The method of the request.
        method: Method,
        /// The cleaned path of the request.
        path: String,
    },
    /// Generated when a middleware reference in a route's chain cannot be
    /// resolved into a middleware instance.
    #[error("invalid middleware {0:?}, no middleware is registered under that name")]
    InvalidMiddleware(String),
    /// Generated when a handler returns something other than a response.
    #[error("invalid handler response, expected a response but got {0}")]
    InvalidHandlerResponse(&'static str),
    /// Generated when a named handler does not resolve to a registered
    /// controller action.
    #[error("unknown handler {controller}@{action}")]
    UnknownHandler {
        /// The controller part of the handler name.
        controller: String,
        /// The action part of the handler name.
        action: String,
    },
    /// Generated when building a response with a format that is not one of
    /// `raw`, `json` or `html`.
    #[error("unsupported response format {0:?}")]
    UnsupportedResponseFormat(String),
    /// Generated when a raw or html response is given a payload that is not
    /// a string.
    #[error("the {0} response format requires a string payload")]
    InvalidPayload(&'static str),
    /// Generated when building a response with a status code outside of
    /// `100..=999`.
    #[error("invalid status code {0}")]
    InvalidStatus(u16),
    /// Generated when a header name or value cannot be used in a response.
    #[error("invalid header {0:?}")]
    InvalidHeader(String),
    /// Generated when the environment the application boots in is invalid.
    #[error("invalid environment: {0}")]
    Environment(String),
    /// An intentional, client-facing HTTP error.  This is always converted
    /// into a response carrying the message and status, no matter the debug
    /// mode.
    #[error("{message}")]
    Http {
        /// The HTTP status of the error.
        status: http::StatusCode,
        /// The message sent back to the client.
        message: String,
    },
}

impl TrellisError {
    /// Creates an intentional HTTP error, for use by handlers and
    /// middleware.
    ///
    /// # Examples
    /// ```rust
    /// # use trellis::*;
    /// let error = TrellisError::http(http::StatusCode::UNAUTHORIZED, "go away");
    /// assert_eq!(error.status(), http::StatusCode::UNAUTHORIZED);
    /// assert!(error.is_http());
    /// ```
    pub fn http(status: http::StatusCode, message: impl Into<String>) -> Self {
        TrellisError::Http {
            status,
            message: message.into(),
        }
    }

    /// The HTTP status this error corresponds to.
    pub fn status(&self) -> http::StatusCode {
        match self {
            TrellisError::NoRouteForMethod(_) | TrellisError::RouteNotFound { .. } => {
                http::StatusCode::NOT_FOUND
            }
            TrellisError::Http { status, .. } => *status,
            _ => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether or not this error is meant to reach the client as-is.  Errors
    /// that are not are either masked or propagated, depending on the debug
    /// mode.
    pub fn is_http(&self) -> bool {
        matches!(
            self,
            TrellisError::NoRouteForMethod(_)
                | TrellisError::RouteNotFound { .. }
                | TrellisError::Http { .. }
        )
    }

    /// The message to send to the client for an HTTP error.
    pub(crate) fn client_message(&self) -> String {
        match self {
            TrellisError::NoRouteForMethod(_) | TrellisError::RouteNotFound { .. } => {
                "Not found".to_owned()
            }
            TrellisError::Http { message, .. } => message.clone(),
            _ => "Internal Server Error".to_owned(),
        }
    }
}
