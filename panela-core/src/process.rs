//! Contract between the compiler and the process-handler server

use crate::error::Result;
use crate::handler::SharedHandler;
use crate::model::VerbSet;
use async_trait::async_trait;
use std::net::SocketAddr;

/// Header nginx sets to the port of the server block that proxied a request
pub const PORT_HEADER: &str = "x-forwarded-port";

/// A process-served endpoint handed to the backend
#[derive(Debug, Clone)]
pub struct Registration {
    /// Host the endpoint was declared on
    pub hostname: String,
    /// Port of that host
    pub port: u16,
    /// Full pathname, as emitted in the nginx location
    pub pathname: String,
    pub verbs: VerbSet,
    /// Middleware in scope followed by the endpoint handler
    pub chain: Vec<SharedHandler>,
}

/// Server answering the locations nginx proxies to the process.
///
/// Every registration happens before `listen`, which consumes the backend.
#[async_trait]
pub trait ProcessBackend: Send + Sized + 'static {
    /// Handle to the listening server
    type Running: Send;

    fn register(&mut self, registration: Registration);

    /// Reject registrations `listen` could not serve together
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Bind `addr` and start serving; resolves once the socket is bound
    async fn listen(self, addr: SocketAddr) -> Result<Self::Running>;
}

/// Creates the backend the first time a process endpoint is compiled
pub trait BackendFactory {
    type Backend: ProcessBackend;

    fn create(&mut self) -> Self::Backend;
}

impl<F, B> BackendFactory for F
where
    F: FnMut() -> B,
    B: ProcessBackend,
{
    type Backend = B;

    fn create(&mut self) -> B {
        self()
    }
}
