//! Process-handler listener

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use panela_core::handler::respond;
use panela_core::process::{ProcessBackend, Registration};
use panela_core::{Error, Result};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::router::DispatchTable;

/// Collects registrations until it is asked to listen
#[derive(Debug, Default)]
pub struct ProcessServer {
    registrations: Vec<Registration>,
}

impl ProcessServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }
}

#[async_trait]
impl ProcessBackend for ProcessServer {
    type Running = RunningServer;

    fn register(&mut self, registration: Registration) {
        tracing::debug!(
            "Registering {} {} on {} ({} handlers)",
            registration.verbs,
            registration.pathname,
            registration.hostname,
            registration.chain.len()
        );
        self.registrations.push(registration);
    }

    fn validate(&self) -> Result<()> {
        DispatchTable::build(&self.registrations).map(|_| ())
    }

    async fn listen(self, addr: SocketAddr) -> Result<RunningServer> {
        let table = Arc::new(DispatchTable::build(&self.registrations)?);

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Server(format!("Failed to bind process handlers on {}: {}", addr, e)))?;
        let local_addr = listener.local_addr()?;

        tracing::info!(
            "Process handlers listening on http://{} ({} endpoints)",
            local_addr,
            self.registrations.len()
        );

        let (shutdown, signal) = watch::channel(false);
        let join = tokio::spawn(accept_loop(listener, table, signal));

        Ok(RunningServer {
            local_addr,
            shutdown,
            join,
        })
    }
}

async fn accept_loop(listener: TcpListener, table: Arc<DispatchTable>, mut signal: watch::Receiver<bool>) {
    loop {
        let stream = tokio::select! {
            _ = signal.changed() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => stream,
                Err(e) => {
                    tracing::warn!("Process handlers accept error: {}", e);
                    continue;
                }
            },
        };

        let io = TokioIo::new(stream);
        let table = table.clone();
        let mut stop = signal.clone();

        tokio::task::spawn(async move {
            let service = service_fn(move |req| handle_request(req, table.clone()));
            let conn = http1::Builder::new().serve_connection(io, service);
            tokio::pin!(conn);

            let result = tokio::select! {
                result = conn.as_mut() => result,
                _ = stop.changed() => {
                    conn.as_mut().graceful_shutdown();
                    conn.await
                }
            };
            if let Err(err) = result {
                tracing::error!("Error serving connection: {:?}", err);
            }
        });
    }

    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Process handlers on {} stopped", addr);
    }
}

async fn handle_request(
    req: hyper::Request<Incoming>,
    table: Arc<DispatchTable>,
) -> std::result::Result<hyper::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let response = match body.collect().await {
        Ok(collected) => {
            let req = http::Request::from_parts(parts, collected.to_bytes());
            table.dispatch(req).await
        }
        Err(e) => {
            tracing::warn!("Failed to read request body: {}", e);
            respond(400, "Bad Request")
        }
    };

    let (parts, body) = response.into_parts();
    Ok(hyper::Response::from_parts(parts, Full::new(body)))
}

/// Handle to a listening process-handler server.
///
/// Dropping the handle stops the server as well.
#[derive(Debug)]
pub struct RunningServer {
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl RunningServer {
    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting, finish in-flight connections gracefully
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown.send(true);
        self.join
            .await
            .map_err(|e| Error::Server(format!("Process handlers task failed: {}", e)))
    }
}
