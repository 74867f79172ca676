//! Tool adapter trait and registry.
//!
//! Adapters are the boundary to concrete automation transports (browser,
//! mobile, filesystem). The registry is an explicit value constructed at
//! process start and passed by handle into the dispatcher — never a global.

pub mod builtin;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::tools::builtin::{
    AppiumNavigate, AppiumSelectorProbe, ArtifactStorePersist, FilesystemFetchDoc,
    PlaywrightNavigate, PlaywrightSelectorProbe,
};

/// Result data produced by a tool invocation, keyed by output field.
pub type ToolData = BTreeMap<String, Value>;

/// Everything a tool invocation produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    /// Structured result data.
    pub data: ToolData,
    /// Free-form execution log.
    pub logs: String,
    /// Screenshot reference, if captured.
    pub screenshot: Option<String>,
    /// Video reference, if captured.
    pub video: Option<String>,
}

/// Adapter-level failures. The dispatcher treats these as round failures.
#[derive(Debug, Error)]
pub enum ToolError {
    /// A required argument was absent from the request payload.
    #[error("missing required argument '{0}'")]
    MissingArgument(&'static str),

    /// The adapter could not reach its backing resource.
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

/// An executable tool behind a named adapter.
#[async_trait]
pub trait ToolAdapter: Send + Sync {
    /// Registry name (`playwright.navigate`, `appium.selector_probe`, …).
    fn name(&self) -> &str;

    /// Execute with the given named arguments.
    async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError>;
}

/// Explicit name → adapter registry.
#[derive(Default)]
pub struct ToolRegistry {
    adapters: HashMap<String, Arc<dyn ToolAdapter>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the six built-in adapters.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PlaywrightNavigate));
        registry.register(Arc::new(PlaywrightSelectorProbe));
        registry.register(Arc::new(AppiumNavigate));
        registry.register(Arc::new(AppiumSelectorProbe));
        registry.register(Arc::new(FilesystemFetchDoc));
        registry.register(Arc::new(ArtifactStorePersist));
        registry
    }

    /// Register an adapter under its own name, replacing any previous one.
    pub fn register(&mut self, adapter: Arc<dyn ToolAdapter>) {
        let _ = self.adapters.insert(adapter.name().to_string(), adapter);
    }

    /// Look up an adapter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolAdapter>> {
        self.adapters.get(name).map(Arc::clone)
    }

    /// Registered adapter names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.adapters.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("adapters", &self.names())
            .finish()
    }
}
