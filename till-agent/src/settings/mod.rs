//! Settings surface
//!
//! Persistence itself is an external collaborator: the agent consumes a plain
//! key-value store through [`SettingsStore`] and layers typed accessors on
//! top of it. Mutations that change which printers auto-print bump a change
//! epoch; the external order poller watches it to re-evaluate its targets.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::watch;
use tracing::warn;

use crate::models::{PrinterConfig, TemplateConfig};

/// Setting keys
mod keys {
    pub const AUTOMATIC_PRINTING: &str = "autoprint.enabled";
    pub const TEMPLATE_COPIES: &str = "autoprint.template_copies";
    pub const DEFAULT_TEMPLATE: &str = "autoprint.default_template";
    pub const PRINTER_CONFIGS: &str = "printers.configs";
    pub const CUSTOM_TEMPLATES: &str = "templates.custom";
    pub const STORE_NAME: &str = "store.name";
    pub const STORE_ADDRESS: &str = "store.address";
    pub const STORE_PHONE: &str = "store.phone";
    pub const CURRENCY_SYMBOL: &str = "store.currency_symbol";
}

/// External key-value store contract (persistence is not ours)
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: String);
    async fn remove(&self, key: &str);
}

/// In-memory store for tests and standalone runs
#[derive(Debug, Default)]
pub struct MemorySettings {
    entries: DashMap<String, String>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.clone())
    }

    async fn set(&self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }

    async fn remove(&self, key: &str) {
        self.entries.remove(key);
    }
}

/// Typed settings facade over the raw store
pub struct SettingsService {
    store: Arc<dyn SettingsStore>,
    config_epoch: watch::Sender<u64>,
}

impl SettingsService {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        let (config_epoch, _) = watch::channel(0);
        Self {
            store,
            config_epoch,
        }
    }

    /// Watch printer-affecting configuration changes.
    ///
    /// The value is an opaque epoch counter; any change means "re-evaluate
    /// your auto-print targets". This is the restart hook the external
    /// polling collaborator subscribes to.
    pub fn subscribe_config_changes(&self) -> watch::Receiver<u64> {
        self.config_epoch.subscribe()
    }

    fn bump_config_epoch(&self) {
        self.config_epoch.send_modify(|epoch| *epoch += 1);
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.store.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = key, error = %e, "discarding malformed setting");
                None
            }
        }
    }

    async fn set_json<T: serde::Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => self.store.set(key, raw).await,
            Err(e) => warn!(key = key, error = %e, "failed to serialize setting"),
        }
    }

    // === Automatic printing ===

    pub async fn automatic_printing_enabled(&self) -> bool {
        self.get_json(keys::AUTOMATIC_PRINTING).await.unwrap_or(false)
    }

    pub async fn set_automatic_printing_enabled(&self, enabled: bool) {
        self.set_json(keys::AUTOMATIC_PRINTING, &enabled).await;
        self.bump_config_epoch();
    }

    /// Explicit template → copies mapping for auto-print.
    ///
    /// A stored value of 0 means "skip this template" and is distinct from
    /// the template not being configured at all.
    pub async fn template_copies(&self) -> HashMap<String, u32> {
        self.get_json(keys::TEMPLATE_COPIES).await.unwrap_or_default()
    }

    pub async fn set_template_copies(&self, copies: &HashMap<String, u32>) {
        self.set_json(keys::TEMPLATE_COPIES, copies).await;
        self.bump_config_epoch();
    }

    pub async fn default_auto_print_template(&self) -> Option<String> {
        self.get_json(keys::DEFAULT_TEMPLATE).await
    }

    pub async fn set_default_auto_print_template(&self, template_id: &str) {
        self.set_json(keys::DEFAULT_TEMPLATE, &template_id).await;
        self.bump_config_epoch();
    }

    // === Printer configs ===

    pub async fn printer_configs(&self) -> Vec<PrinterConfig> {
        self.get_json(keys::PRINTER_CONFIGS).await.unwrap_or_default()
    }

    pub async fn printer_config(&self, id: &str) -> Option<PrinterConfig> {
        self.printer_configs().await.into_iter().find(|c| c.id == id)
    }

    /// The printer marked default, if any.
    pub async fn default_printer_config(&self) -> Option<PrinterConfig> {
        self.printer_configs().await.into_iter().find(|c| c.is_default)
    }

    /// Insert or replace a printer config.
    ///
    /// Keeps the single-default invariant: marking this config default clears
    /// the flag on every other config of the same transport kind.
    pub async fn save_printer_config(&self, config: PrinterConfig) {
        let mut configs = self.printer_configs().await;
        configs.retain(|c| c.id != config.id);
        if config.is_default {
            for other in configs.iter_mut() {
                if other.transport == config.transport {
                    other.is_default = false;
                }
            }
        }
        configs.push(config);
        self.set_json(keys::PRINTER_CONFIGS, &configs).await;
        self.bump_config_epoch();
    }

    /// Remove a printer config from the store.
    ///
    /// Callers must force-disconnect any live transport for the id first
    /// (see `Services::delete_printer`).
    pub async fn delete_printer_config(&self, id: &str) {
        let mut configs = self.printer_configs().await;
        configs.retain(|c| c.id != id);
        self.set_json(keys::PRINTER_CONFIGS, &configs).await;
        self.bump_config_epoch();
    }

    // === Custom templates ===

    pub async fn custom_templates(&self) -> Vec<TemplateConfig> {
        self.get_json(keys::CUSTOM_TEMPLATES).await.unwrap_or_default()
    }

    pub async fn save_custom_template(&self, template: TemplateConfig) {
        let mut templates = self.custom_templates().await;
        templates.retain(|t| t.template_id != template.template_id);
        templates.push(template);
        self.set_json(keys::CUSTOM_TEMPLATES, &templates).await;
    }

    pub async fn delete_custom_template(&self, template_id: &str) {
        let mut templates = self.custom_templates().await;
        templates.retain(|t| t.template_id != template_id);
        self.set_json(keys::CUSTOM_TEMPLATES, &templates).await;
    }

    // === Store info ===

    pub async fn store_name(&self) -> String {
        self.store.get(keys::STORE_NAME).await.unwrap_or_default()
    }

    pub async fn set_store_name(&self, name: &str) {
        self.store.set(keys::STORE_NAME, name.to_string()).await;
    }

    pub async fn store_address(&self) -> String {
        self.store.get(keys::STORE_ADDRESS).await.unwrap_or_default()
    }

    pub async fn set_store_address(&self, address: &str) {
        self.store.set(keys::STORE_ADDRESS, address.to_string()).await;
    }

    pub async fn store_phone(&self) -> String {
        self.store.get(keys::STORE_PHONE).await.unwrap_or_default()
    }

    pub async fn set_store_phone(&self, phone: &str) {
        self.store.set(keys::STORE_PHONE, phone.to_string()).await;
    }

    pub async fn currency_symbol(&self) -> String {
        self.store
            .get(keys::CURRENCY_SYMBOL)
            .await
            .unwrap_or_else(|| "$".to_string())
    }

    pub async fn set_currency_symbol(&self, symbol: &str) {
        self.store
            .set(keys::CURRENCY_SYMBOL, symbol.to_string())
            .await;
    }
}
