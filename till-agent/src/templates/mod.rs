//! Template store
//!
//! Resolves template ids to [`TemplateConfig`] snapshots. Built-in presets
//! (full_details, delivery, kitchen) always exist; the operator can override
//! a preset or clone it under a new id, both persisted through the settings
//! surface. Callers receive owned snapshots, so a template referenced by an
//! in-flight print job is immune to concurrent edits.

use std::sync::Arc;

use thiserror::Error;

use crate::models::{TemplateConfig, TemplateType};
use crate::settings::SettingsService;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Invalid template: {0}")]
    Invalid(String),
}

/// Preset and custom template lookup
pub struct TemplateStore {
    settings: Arc<SettingsService>,
}

impl TemplateStore {
    pub fn new(settings: Arc<SettingsService>) -> Self {
        Self { settings }
    }

    /// Resolve an id to an owned snapshot: stored configuration first, then
    /// the built-in preset of that id.
    pub async fn resolve(&self, template_id: &str) -> Option<TemplateConfig> {
        if let Some(stored) = self
            .settings
            .custom_templates()
            .await
            .into_iter()
            .find(|t| t.template_id == template_id)
        {
            return Some(stored);
        }
        Self::preset(template_id)
    }

    /// Built-in preset for an id, if it names one.
    pub fn preset(template_id: &str) -> Option<TemplateConfig> {
        let template_type = match template_id {
            "full_details" => TemplateType::FullDetails,
            "delivery" => TemplateType::Delivery,
            "kitchen" => TemplateType::Kitchen,
            _ => return None,
        };
        Some(TemplateConfig::default_for(template_type))
    }

    /// All templates: stored ones plus any preset not overridden.
    pub async fn list(&self) -> Vec<TemplateConfig> {
        let mut templates = self.settings.custom_templates().await;
        for id in TemplateConfig::preset_ids() {
            if !templates.iter().any(|t| t.template_id == id) {
                templates.push(Self::preset(id).expect("preset ids resolve"));
            }
        }
        templates
    }

    /// Persist a template (preset override or custom clone).
    pub async fn save(&self, template: TemplateConfig) -> Result<(), TemplateError> {
        if !template.is_valid() {
            return Err(TemplateError::Invalid(template.template_id));
        }
        self.settings.save_custom_template(template.touched()).await;
        Ok(())
    }

    /// Clone an existing template under a fresh id.
    pub async fn clone_template(&self, source_id: &str, name: &str) -> Option<TemplateConfig> {
        let source = self.resolve(source_id).await?;
        let clone = source.cloned_as(uuid::Uuid::new_v4().to_string(), name);
        self.settings.save_custom_template(clone.clone()).await;
        Some(clone)
    }

    /// Delete a stored template. Presets reappear as their defaults.
    pub async fn delete(&self, template_id: &str) {
        self.settings.delete_custom_template(template_id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemorySettings;

    fn store() -> TemplateStore {
        TemplateStore::new(Arc::new(SettingsService::new(Arc::new(
            MemorySettings::new(),
        ))))
    }

    #[tokio::test]
    async fn test_presets_resolve() {
        let templates = store();
        for id in TemplateConfig::preset_ids() {
            let template = templates.resolve(id).await.unwrap();
            assert_eq!(template.template_id, id);
        }
        assert!(templates.resolve("nope").await.is_none());
    }

    #[tokio::test]
    async fn test_stored_override_shadows_preset() {
        let templates = store();
        let mut kitchen = TemplateStore::preset("kitchen").unwrap();
        kitchen.show_order_date = false;
        templates.save(kitchen).await.unwrap();

        let resolved = templates.resolve("kitchen").await.unwrap();
        assert!(!resolved.show_order_date);

        templates.delete("kitchen").await;
        let resolved = templates.resolve("kitchen").await.unwrap();
        assert!(resolved.show_order_date);
    }

    #[tokio::test]
    async fn test_list_merges_presets_and_customs() {
        let templates = store();
        let clone = TemplateStore::preset("kitchen")
            .unwrap()
            .cloned_as("kitchen-bar", "Bar Kitchen");
        templates.save(clone).await.unwrap();

        let all = templates.list().await;
        assert_eq!(all.len(), 4);
        assert!(all.iter().any(|t| t.template_id == "kitchen-bar"));
        assert!(all.iter().any(|t| t.template_id == "kitchen"));
    }

    #[tokio::test]
    async fn test_clone_gets_fresh_id_and_persists() {
        let templates = store();
        let clone = templates.clone_template("kitchen", "Bar Kitchen").await.unwrap();
        assert_ne!(clone.template_id, "kitchen");
        assert_eq!(clone.template_name, "Bar Kitchen");

        let resolved = templates.resolve(&clone.template_id).await.unwrap();
        assert!(!resolved.show_item_prices);
    }

    #[tokio::test]
    async fn test_invalid_template_rejected() {
        let templates = store();
        let mut bad = TemplateStore::preset("kitchen").unwrap();
        bad.template_name = String::new();
        assert!(templates.save(bad).await.is_err());
    }
}
