//! Panela configuration compiler
//!
//! Turns declared hosts and routes into an nginx configuration file and
//! starts the process-handler server for the endpoints nginx proxies back.
//!
//! # Example
//!
//! ```rust,ignore
//! use panela_config::listen;
//! use panela_core::config::CompilerSettings;
//! use panela_core::prelude::*;
//!
//! let mut app = Application::new();
//! app.host("example.test", HostOptions::default())?
//!     .static_dir("/assets", "/srv/assets")?
//!     .get(("/api", handler(|_req: Request| async { Flow::Respond(respond(200, "ok")) })))?;
//!
//! let running = listen(&app, CompilerSettings::default()).await?;
//! ```

pub mod compiler;
pub mod hosts;
pub mod nginx;

pub use compiler::{Compilation, Compiler};
pub use hosts::{EtcHosts, HostsFile};
pub use nginx::{Clause, ConfigurationRoot, Directive, Entry, Location};

use panela_core::config::CompilerSettings;
use panela_core::model::Application;
use panela_core::CompilationError;
use panela_server::{ProcessServer, RunningServer};

/// Compiler backed by the bundled process server and the system hosts file
pub type DefaultCompiler = Compiler<fn() -> ProcessServer, EtcHosts>;

/// Create a compiler from settings
pub fn compiler(settings: CompilerSettings) -> DefaultCompiler {
    let hosts = EtcHosts::new(settings.hosts_file.path.clone());
    Compiler::new(settings, ProcessServer::new as fn() -> ProcessServer, hosts)
}

/// Compile `app`, write the configuration and serve its process endpoints
pub async fn listen(
    app: &Application,
    settings: CompilerSettings,
) -> Result<Option<RunningServer>, CompilationError> {
    compiler(settings).run(app).await
}
