//! Process-side request handlers
//!
//! Endpoints that cannot be served by nginx run a chain of handlers inside
//! the process. Each handler either answers the request or passes it on to the
//! next one in the chain.

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, LOCATION};
use http::StatusCode;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Request with a fully buffered body
pub type Request = http::Request<Bytes>;

/// Response with a fully buffered body
pub type Response = http::Response<Bytes>;

/// Outcome of running one handler
#[derive(Debug)]
pub enum Flow {
    /// Continue with the next handler in the chain
    Next(Request),
    /// Stop the chain and send this response
    Respond(Response),
}

/// A process-side request handler
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn handle(&self, req: Request) -> Flow;
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Flow> + Send + 'static,
{
    async fn handle(&self, req: Request) -> Flow {
        (self)(req).await
    }
}

impl fmt::Debug for dyn Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<handler>")
    }
}

/// Handlers are shared between the declaration and the dispatch table
pub type SharedHandler = Arc<dyn Handler>;

/// Wrap a handler for use in a declaration
pub fn handler<H: Handler>(h: H) -> SharedHandler {
    Arc::new(h)
}

/// Path parameters captured while dispatching, stored in request extensions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(HashMap<String, String>);

impl PathParams {
    pub fn new(params: HashMap<String, String>) -> Self {
        Self(params)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Build a response with a status code and body
pub fn respond(code: u16, body: impl Into<Bytes>) -> Response {
    let mut response = Response::new(body.into());
    *response.status_mut() = StatusCode::from_u16(code).unwrap_or(StatusCode::OK);
    response
}

/// Create not found response
pub fn not_found() -> Response {
    respond(404, "Not Found")
}

/// Create method not allowed response
pub fn method_not_allowed() -> Response {
    respond(405, "Method Not Allowed")
}

/// Create internal server error response
pub fn internal_error() -> Response {
    respond(500, "Internal Server Error")
}

/// Create redirect response
pub fn redirect(to: &str, code: u16) -> Response {
    let mut response = Response::new(Bytes::new());
    *response.status_mut() = StatusCode::from_u16(code).unwrap_or(StatusCode::FOUND);
    match HeaderValue::from_str(to) {
        Ok(value) => {
            response.headers_mut().insert(LOCATION, value);
        }
        Err(e) => tracing::warn!("Invalid redirect target {:?}: {}", to, e),
    }
    response
}

/// Fixed response handler
#[derive(Debug, Clone)]
pub struct Respond {
    pub status: u16,
    pub body: Bytes,
    pub headers: BTreeMap<String, String>,
}

impl Respond {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: BTreeMap::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

#[async_trait]
impl Handler for Respond {
    async fn handle(&self, _req: Request) -> Flow {
        let mut response = respond(self.status, self.body.clone());
        for (name, value) in &self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    response.headers_mut().append(name, value);
                }
                _ => tracing::warn!("Skipping invalid header {}: {}", name, value),
            }
        }
        Flow::Respond(response)
    }
}

/// Redirect handler
#[derive(Debug, Clone)]
pub struct Redirect {
    pub to: String,
    pub code: u16,
}

#[async_trait]
impl Handler for Redirect {
    async fn handle(&self, _req: Request) -> Flow {
        Flow::Respond(redirect(&self.to, self.code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(path: &str) -> Request {
        http::Request::builder()
            .uri(path)
            .body(Bytes::new())
            .unwrap()
    }

    #[tokio::test]
    async fn test_closure_handler() {
        let h = handler(|req: Request| async move {
            if req.uri().path() == "/skip" {
                Flow::Next(req)
            } else {
                Flow::Respond(respond(201, "made"))
            }
        });

        match h.handle(request("/make")).await {
            Flow::Respond(resp) => {
                assert_eq!(resp.status(), StatusCode::CREATED);
                assert_eq!(resp.body().as_ref(), b"made");
            }
            Flow::Next(_) => panic!("expected a response"),
        }
        assert!(matches!(h.handle(request("/skip")).await, Flow::Next(_)));
    }

    #[tokio::test]
    async fn test_respond_handler_headers() {
        let h = Respond::new(200, "ok").header("X-Panela", "1");
        let Flow::Respond(resp) = h.handle(request("/")).await else {
            panic!("expected a response");
        };
        assert_eq!(resp.headers()["x-panela"], "1");
    }

    #[test]
    fn test_redirect_response() {
        let resp = redirect("/login", 301);
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(resp.headers()[LOCATION], "/login");

        let fallback = redirect("/x", 42);
        assert_eq!(fallback.status(), StatusCode::FOUND);
    }
}
