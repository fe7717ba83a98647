//! Virtual hosts

use crate::error::DeclarationError;
use crate::model::route::{Routable, Route, RouteEntry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Options of a virtual host
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostOptions {
    /// Port nginx listens on for this host
    #[serde(default = "default_port")]
    pub port: u16,

    /// Document root, emitted as `root` when set
    #[serde(default)]
    pub root: Option<String>,

    /// Free-form options kept for application code
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl HostOptions {
    pub fn port(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            port: default_port(),
            root: None,
            extra: BTreeMap::new(),
        }
    }
}

fn default_port() -> u16 {
    80
}

/// A route bound to a hostname and port.
///
/// Endpoints declared directly on the host live in its base route; routes
/// created with [`Routable::route`] are kept in a separate list. The compiler
/// visits both, base entries first.
#[derive(Debug)]
pub struct Host {
    hostname: String,
    options: HostOptions,
    base: Route,
    routes: Vec<Route>,
}

impl Host {
    pub fn new(hostname: impl Into<String>, options: HostOptions) -> Result<Self, DeclarationError> {
        let hostname = hostname.into();
        if hostname.trim().is_empty() {
            return Err(DeclarationError::MissingHostname);
        }
        Ok(Self {
            hostname,
            options,
            base: Route::new(""),
            routes: Vec::new(),
        })
    }

    /// Name of the host, same as its hostname
    pub fn name(&self) -> &str {
        &self.hostname
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> u16 {
        self.options.port
    }

    pub fn root_directory(&self) -> Option<&str> {
        self.options.root.as_deref()
    }

    pub fn config(&self) -> &HostOptions {
        &self.options
    }

    /// Top-level routes, in declaration order
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Top-level route by pathname
    pub fn route_named(&self, pathname: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.pathname() == pathname)
    }
}

impl Routable for Host {
    fn pathname(&self) -> &str {
        self.base.pathname()
    }

    fn entries(&self) -> &[RouteEntry] {
        self.base.entries()
    }

    fn push_entry(&mut self, entry: RouteEntry) {
        self.base.push_entry(entry);
    }

    fn route<F>(&mut self, pathname: &str, build: F) -> Result<&mut Self, DeclarationError>
    where
        F: FnOnce(&mut Route) -> Result<(), DeclarationError>,
    {
        let mut route = Route::new(pathname);
        build(&mut route)?;
        self.routes.push(route);
        Ok(self)
    }
}
