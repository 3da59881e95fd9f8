//! Service assembly
//!
//! Process-scoped services with explicit construction and shutdown. Nothing
//! here is a global: the settings store and the licensing gate arrive as
//! trait objects so tests substitute fakes, and the transport factory can be
//! swapped the same way.

use std::sync::Arc;

use crate::autoprint::AutoPrintCoordinator;
use crate::core::Config;
use crate::licensing::EligibilityGate;
use crate::models::PrinterConfig;
use crate::printer::{
    DefaultTransportFactory, PrinterManager, PrinterOpResult, TransportFactory,
};
use crate::render;
use crate::settings::{SettingsService, SettingsStore};
use crate::templates::TemplateStore;

/// All agent services, wired together
pub struct Services {
    pub settings: Arc<SettingsService>,
    pub templates: Arc<TemplateStore>,
    pub manager: Arc<PrinterManager>,
    pub coordinator: Arc<AutoPrintCoordinator>,
}

impl Services {
    /// Assemble with the production transport factory.
    pub fn new(
        config: &Config,
        store: Arc<dyn SettingsStore>,
        gate: Arc<dyn EligibilityGate>,
    ) -> Self {
        let factory = Arc::new(DefaultTransportFactory::new(
            config.connect_timeout(),
            config.probe_timeout(),
        ));
        Self::with_factory(config, store, gate, factory)
    }

    /// Assemble with a caller-provided transport factory (tests).
    pub fn with_factory(
        config: &Config,
        store: Arc<dyn SettingsStore>,
        gate: Arc<dyn EligibilityGate>,
        factory: Arc<dyn TransportFactory>,
    ) -> Self {
        let settings = Arc::new(SettingsService::new(store));
        let templates = Arc::new(TemplateStore::new(settings.clone()));
        let manager = Arc::new(
            PrinterManager::new(factory, gate)
                .with_inter_copy_delay(config.inter_copy_delay())
                .with_scan_timeout(config.scan_timeout()),
        );
        let coordinator = Arc::new(AutoPrintCoordinator::new(
            manager.clone(),
            settings.clone(),
            templates.clone(),
        ));
        Self {
            settings,
            templates,
            manager,
            coordinator,
        }
    }

    /// Delete a printer config.
    ///
    /// Any live transport for the id is force-disconnected before the config
    /// leaves the store, so no orphaned handle can survive the deletion.
    pub async fn delete_printer(&self, id: &str) {
        self.manager.forget(id).await;
        self.settings.delete_printer_config(id).await;
    }

    /// Manual test print: one attempt, result surfaces immediately.
    pub async fn print_test(&self, config: &PrinterConfig) -> PrinterOpResult<bool> {
        let page = render::test_page(config, &self.settings.store_name().await);
        self.manager.print(config, &page, 1).await
    }

    /// Disconnect everything.
    pub async fn shutdown(&self) {
        self.manager.shutdown().await;
    }
}
