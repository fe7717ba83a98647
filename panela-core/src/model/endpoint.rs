//! Endpoints, middleware and the serving-mode classifier

use crate::error::DeclarationError;
use crate::handler::SharedHandler;
use crate::model::verb::VerbSet;
use std::fmt;
use std::path::Path;

/// What answers an endpoint
#[derive(Debug, Clone)]
pub enum EndpointHandler {
    /// Path to a file or directory served by nginx
    File(String),
    /// Handler run inside the process
    Process(SharedHandler),
}

impl From<&str> for EndpointHandler {
    fn from(path: &str) -> Self {
        EndpointHandler::File(path.to_string())
    }
}

impl From<String> for EndpointHandler {
    fn from(path: String) -> Self {
        EndpointHandler::File(path)
    }
}

impl From<SharedHandler> for EndpointHandler {
    fn from(handler: SharedHandler) -> Self {
        EndpointHandler::Process(handler)
    }
}

/// How an endpoint is served, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServingMode {
    /// nginx serves a whole directory
    StaticNginx,
    /// nginx serves one named file
    FileNginx,
    /// nginx proxies to the process-handler server
    Process,
}

impl ServingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServingMode::StaticNginx => "static",
            ServingMode::FileNginx => "file",
            ServingMode::Process => "process",
        }
    }

    pub fn nginx_served(&self) -> bool {
        !matches!(self, ServingMode::Process)
    }

    fn classify(
        pathname: &str,
        verbs: &VerbSet,
        handlers: &[EndpointHandler],
    ) -> Result<Self, DeclarationError> {
        match handlers {
            [EndpointHandler::File(_)] if verbs.is_static_marker() => Ok(ServingMode::StaticNginx),
            [EndpointHandler::File(_)] => Ok(ServingMode::FileNginx),
            [EndpointHandler::Process(_)] if verbs.is_static_marker() => {
                Err(DeclarationError::StaticRequiresDirectory {
                    pathname: pathname.to_string(),
                })
            }
            [EndpointHandler::Process(_)] => Ok(ServingMode::Process),
            _ => Err(DeclarationError::HandlerCount {
                pathname: pathname.to_string(),
                count: handlers.len(),
            }),
        }
    }
}

impl fmt::Display for ServingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared path, verb set and handler
#[derive(Debug)]
pub struct Endpoint {
    pathname: String,
    verbs: VerbSet,
    handler: EndpointHandler,
    mode: ServingMode,
}

impl Endpoint {
    /// Create an endpoint, classifying its serving mode.
    ///
    /// Exactly one handler is accepted: a file path or a callable.
    pub fn new(
        pathname: impl Into<String>,
        verbs: VerbSet,
        mut handlers: Vec<EndpointHandler>,
    ) -> Result<Self, DeclarationError> {
        let pathname = pathname.into();
        if pathname.is_empty() {
            return Err(DeclarationError::EmptyPathname);
        }
        if verbs.is_empty() {
            return Err(DeclarationError::MissingVerbs { pathname });
        }
        if verbs.contains(super::Verb::Static) && verbs.len() > 1 {
            return Err(DeclarationError::StaticMarkerMixed { pathname });
        }

        let mode = ServingMode::classify(&pathname, &verbs, &handlers)?;
        let Some(handler) = handlers.pop() else {
            return Err(DeclarationError::HandlerCount { pathname, count: 0 });
        };

        Ok(Self {
            pathname,
            verbs,
            handler,
            mode,
        })
    }

    /// Name of the endpoint, same as its pathname
    pub fn name(&self) -> &str {
        &self.pathname
    }

    pub fn pathname(&self) -> &str {
        &self.pathname
    }

    pub fn verbs(&self) -> &VerbSet {
        &self.verbs
    }

    pub fn handlers(&self) -> &[EndpointHandler] {
        std::slice::from_ref(&self.handler)
    }

    pub fn mode(&self) -> ServingMode {
        self.mode
    }

    pub fn nginx_served(&self) -> bool {
        self.mode.nginx_served()
    }

    pub fn is_static(&self) -> bool {
        self.mode == ServingMode::StaticNginx
    }

    /// File or directory served by nginx
    pub fn file_path(&self) -> Option<&str> {
        match &self.handler {
            EndpointHandler::File(path) => Some(path),
            EndpointHandler::Process(_) => None,
        }
    }

    /// Base name of the served file, used by `try_files`
    pub fn file_name(&self) -> Option<String> {
        let path = self.file_path()?;
        let name = Path::new(path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.trim_matches('/').to_string());
        Some(name)
    }

    pub fn process_handler(&self) -> Option<&SharedHandler> {
        match &self.handler {
            EndpointHandler::Process(handler) => Some(handler),
            EndpointHandler::File(_) => None,
        }
    }
}

/// Process-side handler attached to a route scope.
///
/// Middleware never reaches the nginx configuration. It runs in front of the
/// handler of every process-served endpoint declared after it, in the same
/// route or a nested one, whose pathname it applies to.
#[derive(Debug)]
pub struct Middleware {
    pathname: String,
    handler: SharedHandler,
}

impl Middleware {
    pub fn new(pathname: impl Into<String>, handler: SharedHandler) -> Self {
        Self {
            pathname: pathname.into(),
            handler,
        }
    }

    pub fn pathname(&self) -> &str {
        &self.pathname
    }

    pub fn handler(&self) -> &SharedHandler {
        &self.handler
    }

    /// Whether this middleware runs for an endpoint pathname
    pub fn applies_to(&self, pathname: &str) -> bool {
        let scope = self.pathname.as_str();
        if scope.is_empty() || scope == "*" {
            return true;
        }
        if let Some(prefix) = scope.strip_suffix('*') {
            return pathname.starts_with(prefix);
        }
        if scope.ends_with('/') {
            return pathname.starts_with(scope);
        }
        pathname == scope
            || pathname
                .strip_prefix(scope)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}
