use crate::TrellisError;
use std::any::Any;
use std::io::Write;
use std::str::FromStr;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
/// The format a response's payload is serialized with.
pub enum Format {
    /// The payload is sent as-is; `text/plain` unless told otherwise.
    Raw,
    /// The payload is wrapped in a status envelope, and sent as JSON.
    Json,
    /// The payload is sent as-is, as `text/html`.
    Html,
}

impl Format {
    /// The lower-case name of the format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Raw => "raw",
            Format::Json => "json",
            Format::Html => "html",
        }
    }
}

impl FromStr for Format {
    type Err = TrellisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(Format::Raw),
            "json" => Ok(Format::Json),
            "html" => Ok(Format::Html),
            other => Err(TrellisError::UnsupportedResponseFormat(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Payload {
    Text(String),
    Json(serde_json::Value),
}

#[derive(serde::Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum Envelope<'a> {
    Success { data: &'a serde_json::Value },
    Error { error: &'a serde_json::Value },
}

#[derive(Debug, Clone)]
#[must_use]
/// An HTTP response.
///
/// A response is a status code, some headers, and a payload in one of the
/// three [`Format`]s.  A JSON payload is wrapped in an envelope when the
/// body is rendered: `{"status":"success","data":...}` for statuses below
/// 400, and `{"status":"error","error":...}` otherwise.  Header names are
/// always lower-case, and a header set twice keeps the last value.
///
/// A response is consumed by [`Response::emit`], and so can only be written
/// out once.
///
/// # Examples
/// ```rust
/// # use trellis::*;
/// # fn main() -> Result<(), anyhow::Error> {
/// let response = Response::build("json", serde_json::json!({ "x": 1 }), 200, &[])?;
/// assert_eq!(response.status(), http::StatusCode::OK);
/// assert_eq!(response.headers()["content-type"], "application/json");
/// assert_eq!(response.body()?, br#"{"status":"success","data":{"x":1}}"#);
///
/// let response = Response::build("json", "bad".into(), 404, &[])?;
/// assert_eq!(response.body()?, br#"{"status":"error","error":"bad"}"#);
/// # Ok(())
/// # }
/// ```
pub struct Response {
    format: Format,
    status: http::StatusCode,
    headers: http::HeaderMap<http::HeaderValue>,
    payload: Payload,
}

impl Response {
    /// Builds a response from a format name, a payload, a status code, and
    /// a set of headers.
    ///
    /// The headers are applied first (lower-casing their names), then the
    /// format: `raw` sets a `content-type` of `text/plain` only if one was
    /// not given, while `json` and `html` always overwrite it.
    ///
    /// # Errors
    /// This fails if the format is not one of `raw`, `json`, or `html`; if
    /// a `raw` or `html` payload is not a string; if the status code is not
    /// valid; or if a header name or value cannot be represented.
    pub fn build(
        format: &str,
        payload: serde_json::Value,
        status: u16,
        headers: &[(&str, &str)],
    ) -> Result<Self, TrellisError> {
        let format = format.parse::<Format>()?;
        let status =
            http::StatusCode::from_u16(status).map_err(|_| TrellisError::InvalidStatus(status))?;
        let mut map = http::HeaderMap::with_capacity(headers.len() + 1);
        for (name, value) in headers {
            let (name, value) = header_pair(name, value)?;
            map.insert(name, value);
        }

        let payload = match (format, payload) {
            (Format::Json, value) => Payload::Json(value),
            (_, serde_json::Value::String(text)) => Payload::Text(text),
            (format, _) => return Err(TrellisError::InvalidPayload(format.as_str())),
        };

        Ok(Response {
            format,
            status,
            headers: map,
            payload,
        }
        .with_content_type())
    }

    /// Creates a `raw` response with the given text and a status of 200.
    ///
    /// # Examples
    /// ```rust
    /// # use trellis::*;
    /// let response = Response::raw("hello, world");
    /// assert_eq!(response.headers()["content-type"], "text/plain");
    /// ```
    pub fn raw<V: Into<String>>(body: V) -> Self {
        Response::from_parts(Format::Raw, Payload::Text(body.into()))
    }

    /// Creates an `html` response with the given markup and a status of
    /// 200.
    pub fn html<V: Into<String>>(body: V) -> Self {
        Response::from_parts(Format::Html, Payload::Text(body.into()))
    }

    /// Creates a `json` response with the given payload and a status of
    /// 200.  The envelope is chosen by the status at the time the body is
    /// rendered, so [`Self::with_status`] may be used afterwards.
    ///
    /// # Errors
    /// This errors if the payload cannot be represented as JSON.
    ///
    /// # Examples
    /// ```rust
    /// # use trellis::*;
    /// # fn main() -> Result<(), anyhow::Error> {
    /// let response = Response::json(&vec![1, 2])?.with_status(http::StatusCode::CONFLICT);
    /// assert_eq!(response.body()?, br#"{"status":"error","error":[1,2]}"#);
    /// # Ok(())
    /// # }
    /// ```
    pub fn json<V: serde::Serialize>(body: &V) -> Result<Self, serde_json::Error> {
        let value = serde_json::to_value(body)?;
        Ok(Response::from_parts(Format::Json, Payload::Json(value)))
    }

    /// A `json` error response carrying the message, e.g.
    /// `{"status":"error","error":"Not found"}`.
    pub(crate) fn error(status: http::StatusCode, message: String) -> Self {
        Response::from_parts(Format::Json, Payload::Json(serde_json::Value::String(message)))
            .with_status(status)
    }

    fn from_parts(format: Format, payload: Payload) -> Self {
        Response {
            format,
            status: http::StatusCode::OK,
            headers: http::HeaderMap::new(),
            payload,
        }
        .with_content_type()
    }

    fn with_content_type(mut self) -> Self {
        let content_type = match self.format {
            Format::Raw if self.headers.contains_key(http::header::CONTENT_TYPE) => return self,
            Format::Raw => "text/plain",
            Format::Json => "application/json",
            Format::Html => "text/html",
        };
        self.headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static(content_type),
        );
        self
    }

    /// Returns a response with the new status code.
    pub fn with_status<S: Into<http::StatusCode>>(mut self, status: S) -> Self {
        self.status = status.into();
        self
    }

    /// Returns a response with the given header set, replacing any previous
    /// value of the header.  The `content-type` of a `json` or `html`
    /// response is fixed by its format, and cannot be replaced.
    ///
    /// # Errors
    /// This fails if the header name or value cannot be represented.
    ///
    /// # Examples
    /// ```rust
    /// # use trellis::*;
    /// # fn main() -> Result<(), anyhow::Error> {
    /// let response = Response::raw("hi").with_header("X-Thing", "a")?.with_header("x-thing", "b")?;
    /// assert_eq!(response.headers()["x-thing"], "b");
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, TrellisError> {
        let (name, value) = header_pair(name, value)?;
        self.headers.insert(name, value);
        Ok(self.with_content_type())
    }

    /// The format of the response.
    pub fn format(&self) -> Format {
        self.format
    }

    /// The status code of the response.
    pub fn status(&self) -> http::StatusCode {
        self.status
    }

    /// The headers of the response.
    pub fn headers(&self) -> &http::HeaderMap<http::HeaderValue> {
        &self.headers
    }

    /// Renders the body of the response.
    ///
    /// # Errors
    /// This errors if the JSON envelope cannot be serialized.
    pub fn body(&self) -> Result<Vec<u8>, serde_json::Error> {
        match &self.payload {
            Payload::Text(text) => Ok(text.as_bytes().to_vec()),
            Payload::Json(data) if self.status.as_u16() < 400 => {
                serde_json::to_vec(&Envelope::Success { data })
            }
            Payload::Json(error) => serde_json::to_vec(&Envelope::Error { error }),
        }
    }

    /// Writes the response out as an HTTP/1.1 message: the status line,
    /// every header (with a computed `content-length`), and then the body.
    /// This consumes the response.
    ///
    /// # Errors
    /// This errors if the body cannot be rendered, or if writing fails.
    ///
    /// # Examples
    /// ```rust
    /// # use trellis::*;
    /// # fn main() -> Result<(), anyhow::Error> {
    /// let mut out = vec![];
    /// Response::html("<p>hi</p>").emit(&mut out)?;
    /// let out = String::from_utf8(out)?;
    /// assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
    /// assert!(out.contains("content-type: text/html\r\n"));
    /// assert!(out.ends_with("\r\n\r\n<p>hi</p>"));
    /// # Ok(())
    /// # }
    /// ```
    pub fn emit<W: Write>(mut self, out: &mut W) -> std::io::Result<()> {
        let body = self.body()?;
        self.headers
            .insert(http::header::CONTENT_LENGTH, http::HeaderValue::from(body.len()));

        write!(
            out,
            "HTTP/1.1 {} {}\r\n",
            self.status.as_u16(),
            self.status.canonical_reason().unwrap_or("")
        )?;
        for (name, value) in &self.headers {
            out.write_all(name.as_str().as_bytes())?;
            out.write_all(b": ")?;
            out.write_all(value.as_bytes())?;
            out.write_all(b"\r\n")?;
        }
        out.write_all(b"\r\n")?;
        out.write_all(&body)?;
        out.flush()
    }
}

fn header_pair(
    name: &str,
    value: &str,
) -> Result<(http::HeaderName, http::HeaderValue), TrellisError> {
    let header_name = http::HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| TrellisError::InvalidHeader(name.to_owned()))?;
    let header_value =
        http::HeaderValue::from_str(value).map_err(|_| TrellisError::InvalidHeader(name.to_owned()))?;
    Ok((header_name, header_value))
}

impl TryFrom<Response> for http::Response<Vec<u8>> {
    type Error = serde_json::Error;

    fn try_from(response: Response) -> Result<Self, Self::Error> {
        let body = response.body()?;
        let mut converted = http::Response::new(body);
        *converted.status_mut() = response.status;
        *converted.headers_mut() = response.headers;
        Ok(converted)
    }
}

/// Builds a response.  This is a shortcut for [`Response::build`].
///
/// # Errors
/// See [`Response::build`].
///
/// # Examples
/// ```rust
/// # use trellis::*;
/// # fn main() -> Result<(), anyhow::Error> {
/// let response = trellis::view("raw", "hi".into(), 201, &[("Content-Type", "text/csv")])?;
/// assert_eq!(response.status(), http::StatusCode::CREATED);
/// assert_eq!(response.headers()["content-type"], "text/csv");
/// # Ok(())
/// # }
/// ```
pub fn view(
    format: &str,
    payload: serde_json::Value,
    status: u16,
    headers: &[(&str, &str)],
) -> Result<Response, TrellisError> {
    Response::build(format, payload, status, headers)
}

/// Converts the current type into a [`crate::Response`].
///
/// This assumes that the conversion into a response is fallible (as it
/// often is).  This is what endpoints return; anything that cannot become a
/// response fails with [`TrellisError::InvalidHandlerResponse`].
pub trait IntoResponse {
    /// Converts the current type into a response.
    fn into_response(self) -> Result<Response, anyhow::Error>;
}

impl IntoResponse for Response {
    fn into_response(self) -> Result<Response, anyhow::Error> {
        Ok(self)
    }
}

impl<R, E> IntoResponse for Result<R, E>
where
    R: IntoResponse,
    E: Into<anyhow::Error>,
{
    fn into_response(self) -> Result<Response, anyhow::Error> {
        self.map_err(Into::into).and_then(IntoResponse::into_response)
    }
}

impl IntoResponse for std::convert::Infallible {
    fn into_response(self) -> Result<Response, anyhow::Error> {
        match self {}
    }
}

// Dynamically typed handler output; only a boxed response is accepted.
impl IntoResponse for Box<dyn Any + Send> {
    fn into_response(self) -> Result<Response, anyhow::Error> {
        self.downcast::<Response>()
            .map(|response| *response)
            .map_err(|_| TrellisError::InvalidHandlerResponse("a value of another type").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(response: &Response) -> String {
        String::from_utf8(response.body().unwrap()).unwrap()
    }

    #[test]
    fn test_json_success_envelope() {
        let response = Response::build("json", json!({"x": 1}), 200, &[]).unwrap();
        assert_eq!(text(&response), r#"{"status":"success","data":{"x":1}}"#);
        assert_eq!(response.headers()["content-type"], "application/json");
        assert_eq!(response.format(), Format::Json);
    }

    #[test]
    fn test_json_error_envelope() {
        let response = Response::build("json", json!("bad"), 404, &[]).unwrap();
        assert_eq!(text(&response), r#"{"status":"error","error":"bad"}"#);

        let response = Response::build("json", json!(null), 399, &[]).unwrap();
        assert_eq!(text(&response), r#"{"status":"success","data":null}"#);
    }

    #[test]
    fn test_json_forces_content_type() {
        let response =
            Response::build("json", json!(1), 200, &[("Content-Type", "text/csv")]).unwrap();
        assert_eq!(response.headers()["content-type"], "application/json");
    }

    #[test]
    fn test_raw_keeps_content_type() {
        let response =
            Response::build("raw", json!("a,b"), 200, &[("CONTENT-TYPE", "text/csv")]).unwrap();
        assert_eq!(response.headers()["content-type"], "text/csv");
        assert_eq!(response.headers().len(), 1);

        let response = Response::build("raw", json!("a"), 200, &[]).unwrap();
        assert_eq!(response.headers()["content-type"], "text/plain");
    }

    #[test]
    fn test_html_forces_content_type() {
        let response =
            Response::build("html", json!("<b>x</b>"), 200, &[("content-type", "text/plain")])
                .unwrap();
        assert_eq!(response.headers()["content-type"], "text/html");
        assert_eq!(text(&response), "<b>x</b>");
    }

    #[test]
    fn test_headers_last_write_wins() {
        let response =
            Response::build("raw", json!(""), 200, &[("X-A", "1"), ("x-a", "2")]).unwrap();
        assert_eq!(response.headers().get_all("x-a").iter().count(), 1);
        assert_eq!(response.headers()["x-a"], "2");
    }

    #[test]
    fn test_with_header_keeps_forced_content_type() {
        let response = Response::build("json", json!({"x": 1}), 200, &[])
            .unwrap()
            .with_header("Content-Type", "text/plain")
            .unwrap();
        assert_eq!(response.headers()["content-type"], "application/json");

        let response = Response::html("<b>x</b>")
            .with_header("content-type", "text/plain")
            .unwrap();
        assert_eq!(response.headers()["content-type"], "text/html");

        let response = Response::raw("a,b")
            .with_header("Content-Type", "text/csv")
            .unwrap();
        assert_eq!(response.headers()["content-type"], "text/csv");
    }

    #[test]
    fn test_unsupported_format() {
        let error = Response::build("xml", json!("<a/>"), 200, &[]).unwrap_err();
        assert!(matches!(error, TrellisError::UnsupportedResponseFormat(f) if f == "xml"));
    }

    #[test]
    fn test_string_payload_required() {
        let error = Response::build("html", json!({"a": 1}), 200, &[]).unwrap_err();
        assert!(matches!(error, TrellisError::InvalidPayload("html")));
    }

    #[test]
    fn test_invalid_status() {
        let error = Response::build("raw", json!(""), 42, &[]).unwrap_err();
        assert!(matches!(error, TrellisError::InvalidStatus(42)));
    }

    #[test]
    fn test_emit() {
        let response = Response::build("json", json!("gone"), 410, &[("X-Id", "7")]).unwrap();
        let mut out = vec![];
        response.emit(&mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        let (head, body) = out.split_once("\r\n\r\n").unwrap();
        let mut lines = head.split("\r\n");
        assert_eq!(lines.next(), Some("HTTP/1.1 410 Gone"));
        let mut headers = lines.collect::<Vec<_>>();
        headers.sort_unstable();
        assert_eq!(
            headers,
            vec![
                "content-length: 33",
                "content-type: application/json",
                "x-id: 7"
            ]
        );
        assert_eq!(body, r#"{"status":"error","error":"gone"}"#);
    }

    #[test]
    fn test_into_http() {
        let response = Response::raw("hi").with_status(http::StatusCode::ACCEPTED);
        let converted = http::Response::<Vec<u8>>::try_from(response).unwrap();
        assert_eq!(converted.status(), http::StatusCode::ACCEPTED);
        assert_eq!(converted.body(), b"hi");
    }

    #[test]
    fn convert_response() {
        let response = Response::raw("");

        assert!(Ok::<_, std::convert::Infallible>(response)
            .into_response()
            .is_ok());
    }

    #[test]
    fn convert_dynamic_response() {
        let boxed: Box<dyn Any + Send> = Box::new(Response::raw("x"));
        assert!(boxed.into_response().is_ok());

        let boxed: Box<dyn Any + Send> = Box::new("not a response");
        let error = boxed.into_response().unwrap_err();
        assert!(matches!(
            error.downcast_ref::<TrellisError>(),
            Some(TrellisError::InvalidHandlerResponse(_))
        ));
    }
}
