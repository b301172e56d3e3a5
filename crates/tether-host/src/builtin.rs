//! The built-in `Bridge` module, registered during initialization.

use std::sync::Weak;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use tether_core::Params;
use tokio::sync::RwLock;

use crate::error::{ModuleError, ModuleResult};
use crate::module::{CapabilityModule, ModuleKey};
use crate::registry::ModuleRegistry;

/// Typed key for the built-in module.
pub const BRIDGE_MODULE: ModuleKey<BridgeModule> = ModuleKey::new(BridgeModule::NAME);

#[derive(Serialize)]
struct ModuleSummary {
    name: String,
    operations: Vec<String>,
}

/// Introspection operations: `ping`, `version` and `modules`.
///
/// Holds the registry weakly; the registry owns the module.
#[derive(Debug)]
pub struct BridgeModule {
    protocol_version: String,
    registry: Weak<RwLock<ModuleRegistry>>,
}

impl BridgeModule {
    /// Module name.
    pub const NAME: &'static str = "Bridge";

    /// Create the module for a registry speaking `protocol_version`.
    #[must_use]
    pub fn new(
        protocol_version: impl Into<String>,
        registry: Weak<RwLock<ModuleRegistry>>,
    ) -> Self {
        Self {
            protocol_version: protocol_version.into(),
            registry,
        }
    }

    async fn modules(&self) -> ModuleResult<Value> {
        let registry = self
            .registry
            .upgrade()
            .ok_or_else(|| ModuleError::internal("module registry dropped"))?;
        let summaries: Vec<ModuleSummary> = registry
            .read()
            .await
            .list()
            .into_iter()
            .map(|descriptor| ModuleSummary {
                name: descriptor.name().to_owned(),
                operations: descriptor.operations().iter().cloned().collect(),
            })
            .collect();
        serde_json::to_value(summaries).map_err(|e| ModuleError::internal(e.to_string()))
    }
}

#[async_trait]
impl CapabilityModule for BridgeModule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn operations(&self) -> Vec<String> {
        vec!["ping".into(), "version".into(), "modules".into()]
    }

    async fn handle(&self, operation: &str, _params: Params) -> ModuleResult<Value> {
        match operation {
            "ping" => Ok(json!({ "pong": true })),
            "version" => Ok(json!({ "version": self.protocol_version })),
            "modules" => self.modules().await,
            other => Err(ModuleError::new(
                tether_core::ErrorCode::METHOD_NOT_FOUND,
                format!("method not found: {}.{other}", Self::NAME),
            )),
        }
    }
}
