//! Declaration model: applications, hosts, routes and endpoints

mod application;
mod builder;
mod endpoint;
mod host;
mod route;
mod verb;

pub use application::Application;
pub use builder::{Builder, BuilderOptions, Database, Engine};
pub use endpoint::{Endpoint, EndpointHandler, Middleware, ServingMode};
pub use host::{Host, HostOptions};
pub use route::{Arg, EndpointArgs, IntoEndpointArgs, Routable, Route, RouteEntry, ANY_PATH};
pub use verb::{Verb, VerbSet};
