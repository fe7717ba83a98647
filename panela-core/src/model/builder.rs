//! Builders, engines and databases registered on an application

use crate::error::BuildError;
use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;

type Step = Box<dyn Fn() -> BoxFuture<'static, Result<(), String>> + Send + Sync>;

/// Builder options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuilderOptions {
    /// Log every step while building
    #[serde(default)]
    pub verbose: bool,
}

/// A named set of asynchronous build steps
pub struct Builder {
    name: String,
    options: BuilderOptions,
    steps: Vec<Step>,
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("name", &self.name)
            .field("options", &self.options)
            .field("steps", &self.steps.len())
            .finish()
    }
}

impl Builder {
    pub fn new(name: impl Into<String>, options: BuilderOptions) -> Self {
        Self {
            name: name.into(),
            options,
            steps: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &BuilderOptions {
        &self.options
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Append a build step
    pub fn step<F, Fut, E>(&mut self, step: F) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display + 'static,
    {
        self.steps.push(Box::new(move || {
            step().map(|result| result.map_err(|e| e.to_string())).boxed()
        }));
        self
    }

    /// Run every step concurrently, failing on the first error
    pub async fn build(&self) -> Result<(), BuildError> {
        if self.steps.is_empty() {
            return Err(BuildError::NoSteps);
        }
        if self.options.verbose {
            tracing::info!("Building \"{}\"", self.name);
        }

        let total = self.steps.len();
        let runs = self.steps.iter().enumerate().map(|(index, step)| {
            let verbose = self.options.verbose;
            let fut = step();
            async move {
                if verbose {
                    tracing::info!("Building - Step {} of {}", index + 1, total);
                }
                fut.await.map_err(|message| BuildError::Step {
                    index: index + 1,
                    message,
                })
            }
        });
        try_join_all(runs).await?;
        Ok(())
    }
}

/// A named engine and its options
#[derive(Debug, Clone, PartialEq)]
pub struct Engine {
    name: String,
    options: serde_json::Map<String, serde_json::Value>,
}

impl Engine {
    pub fn new(name: impl Into<String>, options: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.options
    }
}

/// A named database connection description.
///
/// Connecting and migrating are left to the application; this only records
/// the options under a name.
#[derive(Debug, Clone, PartialEq)]
pub struct Database {
    name: String,
    options: serde_json::Map<String, serde_json::Value>,
}

impl Database {
    pub fn new(name: impl Into<String>, options: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.options
    }
}
