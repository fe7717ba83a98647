//! Panela process-handler server
//!
//! Serves the endpoints nginx proxies to the process: one listener shared by
//! every host, dispatching on the `Host` header and the request path.

pub mod router;
pub mod server;

pub use router::{DispatchTable, Dispatched};
pub use server::{ProcessServer, RunningServer};
