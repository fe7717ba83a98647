//! Application registry

use crate::error::DeclarationError;
use crate::model::builder::{Builder, BuilderOptions, Database, Engine};
use crate::model::host::{Host, HostOptions};

type Options = serde_json::Map<String, serde_json::Value>;

/// Every builder, database, engine and host declared by an application.
///
/// Lookups by name return the first entry declared under that name.
#[derive(Debug, Default)]
pub struct Application {
    builders: Vec<Builder>,
    databases: Vec<Database>,
    engines: Vec<Engine>,
    hosts: Vec<Host>,
}

fn require_name(name: &str) -> Result<(), DeclarationError> {
    if name.trim().is_empty() {
        Err(DeclarationError::MissingName)
    } else {
        Ok(())
    }
}

impl Application {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a new builder
    pub fn builder(&mut self, name: &str, options: BuilderOptions) -> Result<&mut Builder, DeclarationError> {
        require_name(name)?;
        let index = self.builders.len();
        self.builders.push(Builder::new(name, options));
        Ok(&mut self.builders[index])
    }

    pub fn builders(&self) -> &[Builder] {
        &self.builders
    }

    pub fn builder_named(&self, name: &str) -> Option<&Builder> {
        self.builders.iter().find(|b| b.name() == name)
    }

    /// Declare a new database
    pub fn database(&mut self, name: &str, options: Options) -> Result<&mut Database, DeclarationError> {
        require_name(name)?;
        let index = self.databases.len();
        self.databases.push(Database::new(name, options));
        Ok(&mut self.databases[index])
    }

    pub fn databases(&self) -> &[Database] {
        &self.databases
    }

    pub fn database_named(&self, name: &str) -> Option<&Database> {
        self.databases.iter().find(|d| d.name() == name)
    }

    /// Declare a new engine
    pub fn engine(&mut self, name: &str, options: Options) -> Result<&mut Engine, DeclarationError> {
        require_name(name)?;
        let index = self.engines.len();
        self.engines.push(Engine::new(name, options));
        Ok(&mut self.engines[index])
    }

    pub fn engines(&self) -> &[Engine] {
        &self.engines
    }

    pub fn engine_named(&self, name: &str) -> Option<&Engine> {
        self.engines.iter().find(|e| e.name() == name)
    }

    /// Declare a new virtual host
    pub fn host(&mut self, hostname: &str, options: HostOptions) -> Result<&mut Host, DeclarationError> {
        let host = Host::new(hostname, options)?;
        let index = self.hosts.len();
        self.hosts.push(host);
        Ok(&mut self.hosts[index])
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn host_named(&self, hostname: &str) -> Option<&Host> {
        self.hosts.iter().find(|h| h.hostname() == hostname)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Routable;

    #[test]
    fn test_registry_lookup() {
        let mut app = Application::new();
        app.engine("views", Options::new()).unwrap();
        app.database("main", Options::new()).unwrap();
        app.builder("assets", BuilderOptions::default()).unwrap();
        app.host("a.test", HostOptions::default())
            .unwrap()
            .get(("/", "/index.html"))
            .unwrap();
        app.host("b.test", HostOptions::port(8080)).unwrap();

        assert_eq!(app.hosts().len(), 2);
        assert_eq!(app.host_named("b.test").unwrap().port(), 8080);
        assert!(app.host_named("c.test").is_none());
        assert!(app.engine_named("views").is_some());
        assert!(app.database_named("main").is_some());
        assert!(app.builder_named("assets").is_some());
        assert!(app.builder_named("other").is_none());
    }

    #[test]
    fn test_missing_names_rejected() {
        let mut app = Application::new();
        assert_eq!(app.host("", HostOptions::default()).unwrap_err(), DeclarationError::MissingHostname);
        assert_eq!(app.engine("", Options::new()).unwrap_err(), DeclarationError::MissingName);
        assert_eq!(
            app.builder(" ", BuilderOptions::default()).unwrap_err(),
            DeclarationError::MissingName
        );
        assert!(app.hosts().is_empty());
        assert!(app.engines().is_empty());
    }
}
