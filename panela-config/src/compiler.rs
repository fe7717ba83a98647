//! Route compiler
//!
//! Walks every declared host and produces two things: the nginx
//! configuration tree and the registrations of process-served endpoints.

use crate::hosts::HostsFile;
use crate::nginx::{Clause, ConfigurationRoot};
use panela_core::config::{on_off, Boilerplate, CompilerSettings};
use panela_core::handler::SharedHandler;
use panela_core::model::{Application, Endpoint, Host, Middleware, Routable, Route, RouteEntry, ServingMode};
use panela_core::model::ANY_PATH;
use panela_core::process::{BackendFactory, ProcessBackend, Registration, PORT_HEADER};
use panela_core::CompilationError;
use std::collections::HashMap;
use std::fs;

type CompileResult<T> = Result<T, CompilationError>;

/// Result of walking an application
#[derive(Debug)]
pub struct Compilation<B> {
    pub config: ConfigurationRoot,
    /// Present once at least one process-served endpoint was compiled
    pub backend: Option<B>,
    /// Distinct hostnames, in the order they were first declared
    pub aliases: Vec<String>,
    pub registrations: usize,
}

impl<B> Compilation<B> {
    /// Rendered configuration text
    pub fn render(&self) -> String {
        self.config.to_string()
    }
}

/// Compiles applications into an nginx configuration and a process backend
#[derive(Debug)]
pub struct Compiler<F, H> {
    settings: CompilerSettings,
    factory: F,
    hosts_file: H,
}

impl<F, H> Compiler<F, H>
where
    F: BackendFactory,
    H: HostsFile,
{
    pub fn new(settings: CompilerSettings, factory: F, hosts_file: H) -> Self {
        Self {
            settings,
            factory,
            hosts_file,
        }
    }

    pub fn settings(&self) -> &CompilerSettings {
        &self.settings
    }

    pub fn hosts_file(&self) -> &H {
        &self.hosts_file
    }

    /// Walk the application in memory. Nothing is aliased or written.
    pub fn build(&mut self, app: &Application) -> CompileResult<Compilation<F::Backend>> {
        let mut config = ConfigurationRoot::new();
        let mut aliases: Vec<String> = Vec::new();
        let mut traversal = Traversal {
            settings: &self.settings,
            factory: &mut self.factory,
            backend: None,
            registrations: 0,
        };

        let boilerplate = &self.settings.boilerplate;
        global_directives(&mut config, boilerplate);
        config.try_clause("http", |http| {
            http_directives(http, boilerplate);
            for host in app.hosts() {
                if !aliases.iter().any(|alias| alias == host.hostname()) {
                    aliases.push(host.hostname().to_string());
                }
                http.try_clause("server", |server| traversal.visit_host(host, server))?;
            }
            Ok::<(), CompilationError>(())
        })?;

        if let Some(backend) = &traversal.backend {
            backend
                .validate()
                .map_err(|e| CompilationError::ConflictingRoutes(e.to_string()))?;
        }

        Ok(Compilation {
            config,
            backend: traversal.backend,
            aliases,
            registrations: traversal.registrations,
        })
    }

    /// Build, write the configuration file, then alias every hostname
    pub fn compile(&mut self, app: &Application) -> CompileResult<Compilation<F::Backend>> {
        let compilation = self.build(app)?;

        let path = &self.settings.output_path;
        fs::write(path, compilation.render()).map_err(|source| CompilationError::Write {
            path: path.clone(),
            source,
        })?;
        tracing::info!(
            "Wrote nginx configuration to {} ({} hosts, {} process endpoints)",
            path.display(),
            app.hosts().len(),
            compilation.registrations
        );

        if self.settings.hosts_file.manage {
            for hostname in &compilation.aliases {
                match self.hosts_file.set_alias(hostname) {
                    Ok(true) => tracing::info!("Added hosts alias for {}", hostname),
                    Ok(false) => tracing::debug!("Hosts alias for {} already present", hostname),
                    Err(e) => tracing::warn!("Failed to add hosts alias for {}: {}", hostname, e),
                }
            }
        }

        Ok(compilation)
    }

    /// Compile, then start the process backend if any endpoint needs it
    pub async fn run(
        &mut self,
        app: &Application,
    ) -> CompileResult<Option<<F::Backend as ProcessBackend>::Running>> {
        let compilation = self.compile(app)?;
        let Some(backend) = compilation.backend else {
            tracing::info!("No process-served endpoints, nothing to listen on");
            return Ok(None);
        };

        let running = backend
            .listen(self.settings.proxy.socket_addr())
            .await
            .map_err(|e| CompilationError::Backend(e.to_string()))?;
        Ok(Some(running))
    }
}

fn global_directives(config: &mut Clause, b: &Boilerplate) {
    if let Some(user) = &b.user {
        config.directive("user", user);
    }
    config
        .directive("worker_processes", &b.worker_processes)
        .directive("pid", b.pid.display())
        .clause("events", |events| {
            events.directive("worker_connections", b.worker_connections);
        });
}

fn http_directives(http: &mut Clause, b: &Boilerplate) {
    http.directive("sendfile", on_off(b.sendfile))
        .directive("tcp_nopush", on_off(b.tcp_nopush))
        .directive("tcp_nodelay", on_off(b.tcp_nodelay))
        .directive("keepalive_timeout", b.keepalive_timeout)
        .directive("types_hash_max_size", b.types_hash_max_size)
        .directive("include", b.mime_types.display())
        .directive("default_type", &b.default_type)
        .directive("access_log", b.access_log.display())
        .directive("error_log", b.error_log.display())
        .directive("gzip", on_off(b.gzip));
    if let Some(disable) = &b.gzip_disable {
        http.directive("gzip_disable", disable);
    }
}

struct Traversal<'s, F: BackendFactory> {
    settings: &'s CompilerSettings,
    factory: &'s mut F,
    backend: Option<F::Backend>,
    registrations: usize,
}

/// State of one server block
struct ServerScope<'a> {
    host: &'a Host,
    /// Mode of every location emitted so far
    emitted: HashMap<String, ServingMode>,
    /// Middleware visible at the current point of the walk
    middleware: Vec<&'a Middleware>,
}

impl<F: BackendFactory> Traversal<'_, F> {
    fn visit_host(&mut self, host: &Host, server: &mut Clause) -> CompileResult<()> {
        server
            .directive("listen", host.port())
            .directive("server_name", host.hostname())
            .directive("client_max_body_size", &self.settings.client_max_body_size);
        if let Some(root) = host.root_directory() {
            server.directive("root", root);
        }
        tracing::info!("Compiling host {}:{}", host.hostname(), host.port());

        let mut scope = ServerScope {
            host,
            emitted: HashMap::new(),
            middleware: Vec::new(),
        };
        // Base middleware stays in scope for the top-level routes.
        self.visit_entries(host.entries(), server, &mut scope, 0)?;
        for route in host.routes() {
            self.visit_route(route, server, &mut scope, 1)?;
        }
        Ok(())
    }

    fn visit_route<'a>(
        &mut self,
        route: &'a Route,
        server: &mut Clause,
        scope: &mut ServerScope<'a>,
        depth: usize,
    ) -> CompileResult<()> {
        if depth > self.settings.max_route_depth {
            return Err(CompilationError::NestingTooDeep {
                pathname: route.pathname().to_string(),
                limit: self.settings.max_route_depth,
            });
        }
        let mark = scope.middleware.len();
        self.visit_entries(route.entries(), server, scope, depth)?;
        scope.middleware.truncate(mark);
        Ok(())
    }

    fn visit_entries<'a>(
        &mut self,
        entries: &'a [RouteEntry],
        server: &mut Clause,
        scope: &mut ServerScope<'a>,
        depth: usize,
    ) -> CompileResult<()> {
        for entry in entries {
            match entry {
                RouteEntry::Middleware(middleware) => scope.middleware.push(middleware),
                RouteEntry::Endpoint(endpoint) => self.emit(endpoint, server, scope)?,
                RouteEntry::Route(route) => self.visit_route(route, server, scope, depth + 1)?,
            }
        }
        Ok(())
    }

    fn emit(&mut self, endpoint: &Endpoint, server: &mut Clause, scope: &mut ServerScope<'_>) -> CompileResult<()> {
        let pathname = location_path(endpoint.pathname());
        let mode = endpoint.mode();

        let duplicate = match scope.emitted.get(pathname) {
            None => false,
            Some(&ServingMode::Process) if mode == ServingMode::Process => true,
            Some(&first) => {
                return Err(CompilationError::ConflictingLocation {
                    hostname: scope.host.hostname().to_string(),
                    pathname: pathname.to_string(),
                    first: first.as_str(),
                    second: mode.as_str(),
                });
            }
        };

        let index = &self.settings.index;
        match mode {
            ServingMode::StaticNginx => {
                server.location(pathname, |location| {
                    location.directive("index", index);
                });
            }
            ServingMode::FileNginx => {
                let file_name = endpoint.file_name().unwrap_or_default();
                server.location(pathname, |location| {
                    location
                        .directive("index", index)
                        .directive("try_files", format!("/{} =404", file_name));
                });
            }
            ServingMode::Process => {
                if !duplicate {
                    let upstream = self.settings.proxy.upstream_url();
                    server.location(pathname, |location| {
                        location
                            .directive("proxy_pass", upstream)
                            .directive("proxy_http_version", "1.1")
                            .directive("proxy_set_header", "Upgrade $http_upgrade")
                            .directive("proxy_set_header", "Connection 'upgrade'")
                            .directive("proxy_set_header", "Host $host")
                            .directive("proxy_set_header", format!("{} $server_port", PORT_HEADER))
                            .directive("proxy_set_header", "X-Forwarded-For $remote_addr");
                    });
                }
                self.register(endpoint, scope);
            }
        }

        tracing::info!("  {} {} [{}]", endpoint.verbs(), pathname, mode);
        scope.emitted.insert(pathname.to_string(), mode);
        Ok(())
    }

    fn register(&mut self, endpoint: &Endpoint, scope: &ServerScope<'_>) {
        let Some(handler) = endpoint.process_handler() else {
            return;
        };
        let pathname = endpoint.pathname();
        let chain: Vec<SharedHandler> = scope
            .middleware
            .iter()
            .filter(|middleware| middleware.applies_to(pathname))
            .map(|middleware| middleware.handler().clone())
            .chain(std::iter::once(handler.clone()))
            .collect();

        let factory = &mut *self.factory;
        let backend = self.backend.get_or_insert_with(|| {
            tracing::debug!("Creating process backend");
            factory.create()
        });
        backend.register(Registration {
            hostname: scope.host.hostname().to_string(),
            port: scope.host.port(),
            pathname: pathname.to_string(),
            verbs: endpoint.verbs().clone(),
            chain,
        });
        self.registrations += 1;
    }
}

/// nginx prefix for a pathname; a trailing `*` marks a prefix match
fn location_path(pathname: &str) -> &str {
    if pathname.is_empty() || pathname == ANY_PATH {
        return "/";
    }
    match pathname.strip_suffix('*') {
        Some("") => "/",
        Some(prefix) => prefix,
        None => pathname,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_path() {
        assert_eq!(location_path("*"), "/");
        assert_eq!(location_path("/api*"), "/api");
        assert_eq!(location_path("/api/*"), "/api/");
        assert_eq!(location_path("/api"), "/api");
        assert_eq!(location_path("/"), "/");
    }
}
