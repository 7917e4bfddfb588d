use super::Middleware;
use crate::Request;

#[derive(Default, Debug, Clone)]
/// A middleware for tracing requests through a route's chain.
///
/// This logs (using `log`) the method and path of each request it sees,
/// along with the keys the earlier middleware left in the context.  The
/// log level is `info`.  It does not change the context.
pub struct TraceMiddleware {
    _v: (),
}

impl TraceMiddleware {
    #[must_use]
    /// Creates a new trace middleware.  This is provided as an alternative
    /// to `Default`.
    pub fn new() -> Self {
        TraceMiddleware::default()
    }
}

impl Middleware for TraceMiddleware {
    fn handle(&self, request: Request) -> Result<Request, anyhow::Error> {
        let mut keys = request.keys().collect::<Vec<_>>();
        keys.sort_unstable();
        log::info!(
            "--> {} {} (context: [{}])",
            request.method(),
            request.path(),
            keys.join(", ")
        );
        Ok(request)
    }
}
