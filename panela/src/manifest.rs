//! Declarative application manifest
//!
//! Hosts, routes and endpoints described in TOML or JSON, turned into the
//! same declarations the Rust API produces.

use panela_core::config::CompilerSettings;
use panela_core::handler::{handler, Redirect, Respond};
use panela_core::model::{Application, HostOptions, Routable, Verb, VerbSet, ANY_PATH};
use panela_core::{DeclarationError, Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

type Options = serde_json::Map<String, serde_json::Value>;

/// Root of a manifest file
#[derive(Debug, Default, Deserialize)]
pub struct Manifest {
    /// Settings used when none are given on the command line
    #[serde(default)]
    pub settings: Option<CompilerSettings>,

    #[serde(default, rename = "engine")]
    pub engines: Vec<NamedOptions>,

    #[serde(default, rename = "database")]
    pub databases: Vec<NamedOptions>,

    #[serde(default, rename = "host")]
    pub hosts: Vec<HostSpec>,
}

#[derive(Debug, Deserialize)]
pub struct NamedOptions {
    pub name: String,
    #[serde(default)]
    pub options: Options,
}

#[derive(Debug, Deserialize)]
pub struct HostSpec {
    pub hostname: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    #[serde(default, rename = "endpoint")]
    pub endpoints: Vec<EndpointSpec>,
    #[serde(default, rename = "route")]
    pub routes: Vec<RouteSpec>,
}

#[derive(Debug, Deserialize)]
pub struct RouteSpec {
    pub path: String,
    #[serde(default, rename = "endpoint")]
    pub endpoints: Vec<EndpointSpec>,
    #[serde(default, rename = "route")]
    pub routes: Vec<RouteSpec>,
}

/// One endpoint; exactly one target must be set
#[derive(Debug, Deserialize)]
pub struct EndpointSpec {
    #[serde(default)]
    pub path: Option<String>,
    /// Verb names, `all` for every HTTP verb. Defaults to `get`.
    #[serde(default)]
    pub verbs: Vec<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub directory: Option<String>,
    #[serde(default)]
    pub respond: Option<RespondSpec>,
    #[serde(default)]
    pub redirect: Option<RedirectSpec>,
}

#[derive(Debug, Deserialize)]
pub struct RespondSpec {
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct RedirectSpec {
    pub to: String,
    #[serde(default = "default_redirect_code")]
    pub code: u16,
}

fn default_status() -> u16 {
    200
}

fn default_redirect_code() -> u16 {
    302
}

impl Manifest {
    /// Load a manifest, picking the format by extension
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read manifest {}: {}", path.display(), e)))?;

        match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
            "json" => Self::from_json(&content),
            _ => Self::from_toml(&content),
        }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::Config(format!("Invalid JSON manifest: {}", e)))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML manifest: {}", e)))
    }

    /// Declare everything the manifest describes
    pub fn to_application(&self) -> Result<Application> {
        let mut app = Application::new();
        for engine in &self.engines {
            app.engine(&engine.name, engine.options.clone())?;
        }
        for database in &self.databases {
            app.database(&database.name, database.options.clone())?;
        }
        for spec in &self.hosts {
            let mut options = HostOptions {
                root: spec.root.clone(),
                extra: spec.options.clone(),
                ..HostOptions::default()
            };
            if let Some(port) = spec.port {
                options.port = port;
            }
            let host = app.host(&spec.hostname, options)?;
            declare(host, &spec.endpoints, &spec.routes)?;
        }
        Ok(app)
    }
}

fn declare<R: Routable>(target: &mut R, endpoints: &[EndpointSpec], routes: &[RouteSpec]) -> std::result::Result<(), DeclarationError> {
    for endpoint in endpoints {
        endpoint.declare(target)?;
    }
    for route in routes {
        target.route(&route.path, |child| declare(child, &route.endpoints, &route.routes))?;
    }
    Ok(())
}

impl EndpointSpec {
    fn verb_set(&self) -> std::result::Result<VerbSet, DeclarationError> {
        if self.verbs.is_empty() {
            return Ok(VerbSet::single(Verb::Get));
        }
        let mut verbs = VerbSet::new();
        for name in &self.verbs {
            if name.eq_ignore_ascii_case("all") {
                for verb in Verb::HTTP {
                    verbs.insert(verb);
                }
            } else {
                verbs.insert(name.parse()?);
            }
        }
        Ok(verbs)
    }

    fn declare<R: Routable>(&self, target: &mut R) -> std::result::Result<(), DeclarationError> {
        let path = self.path.as_deref().unwrap_or(ANY_PATH);
        let targets = [
            self.file.is_some(),
            self.directory.is_some(),
            self.respond.is_some(),
            self.redirect.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count();
        if targets != 1 {
            return Err(DeclarationError::HandlerCount {
                pathname: path.to_string(),
                count: targets,
            });
        }

        if let Some(directory) = &self.directory {
            target.static_dir(path, directory.as_str())?;
            return Ok(());
        }

        let verbs = self.verb_set()?;
        if let Some(file) = &self.file {
            target.endpoint(verbs, (path, file.as_str()))?;
        } else if let Some(spec) = &self.respond {
            let mut respond = Respond::new(spec.status, spec.body.clone());
            respond.headers = spec.headers.clone();
            target.endpoint(verbs, (path, handler(respond)))?;
        } else if let Some(spec) = &self.redirect {
            let redirect = Redirect {
                to: spec.to.clone(),
                code: spec.code,
            };
            target.endpoint(verbs, (path, handler(redirect)))?;
        }
        Ok(())
    }
}
