//! Panela Core Library
//!
//! This crate provides the declaration side of Panela: the host/route/endpoint
//! model, the handler API used by process-served endpoints, compiler settings,
//! the process-backend contract and error types.

pub mod config;
pub mod error;
pub mod handler;
pub mod model;
pub mod pool;
pub mod process;

pub use error::{BuildError, CompilationError, DeclarationError, Error, Result};

/// Panela version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Commonly used declaration types
pub mod prelude {
    pub use crate::handler::{handler, Flow, Handler, Request, Response, SharedHandler};
    pub use crate::model::{
        Application, Arg, Endpoint, EndpointArgs, EndpointHandler, Host, HostOptions,
        IntoEndpointArgs, Middleware, Routable, Route, RouteEntry, ServingMode, Verb, VerbSet,
    };
}
