//! Panela - declare hosts and routes, compile them into an nginx configuration
//!
//! This is the main entry point for the Panela CLI.

mod manifest;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use panela_core::config::{CompilerSettings, SettingsLoader};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::manifest::Manifest;

/// Panela - compile declared routes into nginx configuration plus a process server
#[derive(Parser)]
#[command(name = "panela")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a manifest and write the nginx configuration
    Compile(CompileArgs),

    /// Compile a manifest, then serve its process endpoints until Ctrl-C
    Serve(CompileArgs),

    /// Check a manifest without writing anything
    Validate {
        /// Path to the manifest (TOML or JSON)
        #[arg(default_value = "panela.toml")]
        manifest: PathBuf,

        /// Settings file overriding the manifest settings
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Print the rendered configuration
        #[arg(long)]
        print: bool,
    },

    /// Show version information
    Version,
}

#[derive(Args)]
struct CompileArgs {
    /// Path to the manifest (TOML or JSON)
    #[arg(default_value = "panela.toml")]
    manifest: PathBuf,

    /// Settings file overriding the manifest settings
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Where to write the nginx configuration
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Do not touch the hosts file
    #[arg(long)]
    no_hosts: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match cli.command {
        Commands::Compile(args) => {
            let (manifest, settings) = load(&args.manifest, args.settings.as_ref())?;
            let settings = args.apply(settings);
            let app = manifest.to_application()?;

            let compilation = panela_config::compiler(settings.clone())
                .compile(&app)
                .context("Compilation failed")?;
            println!(
                "✅ Wrote {} ({} hosts, {} process endpoints)",
                settings.output_path.display(),
                app.hosts().len(),
                compilation.registrations
            );
        }

        Commands::Serve(args) => {
            let (manifest, settings) = load(&args.manifest, args.settings.as_ref())?;
            let settings = args.apply(settings);
            let app = manifest.to_application()?;

            let running = panela_config::listen(&app, settings)
                .await
                .context("Failed to start")?;
            let Some(running) = running else {
                println!("✅ Configuration written, no process endpoints to serve");
                return Ok(());
            };

            println!("🚀 Process handlers running on http://{}", running.local_addr());
            tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
            tracing::info!("Shutting down");
            running.shutdown().await?;
        }

        Commands::Validate {
            manifest,
            settings,
            print,
        } => {
            let (manifest, settings) = load(&manifest, settings.as_ref())?;
            let app = manifest.to_application()?;
            let compilation = panela_config::compiler(settings)
                .build(&app)
                .context("Compilation failed")?;

            if print {
                println!("{}", compilation.render());
            }
            println!(
                "✅ Manifest is valid ({} hosts, {} process endpoints)",
                app.hosts().len(),
                compilation.registrations
            );
        }

        Commands::Version => {
            println!("Panela v{}", panela_core::VERSION);
        }
    }

    Ok(())
}

/// Read the manifest and resolve the settings for this run
fn load(manifest: &Path, settings: Option<&PathBuf>) -> anyhow::Result<(Manifest, CompilerSettings)> {
    let mut manifest = Manifest::load(manifest)?;
    let settings = match settings {
        Some(path) => SettingsLoader::load(path)?,
        None => manifest.settings.take().unwrap_or_default(),
    };
    Ok((manifest, settings))
}

impl CompileArgs {
    fn apply(&self, mut settings: CompilerSettings) -> CompilerSettings {
        if let Some(output) = &self.output {
            settings.output_path = output.clone();
        }
        if self.no_hosts {
            settings.hosts_file.manage = false;
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_compile_args_override_settings() {
        let cli = Cli::parse_from(["panela", "compile", "site.toml", "-o", "/tmp/out.conf", "--no-hosts"]);
        let Commands::Compile(args) = cli.command else {
            panic!("expected compile");
        };
        let settings = args.apply(CompilerSettings::default());
        assert_eq!(settings.output_path, PathBuf::from("/tmp/out.conf"));
        assert!(!settings.hosts_file.manage);
    }
}
