//! Receipt template model
//!
//! A template is a named set of visibility flags controlling which receipt
//! sections render. Section-level state ("all/none/partial") is always
//! derived from the child flags, never stored.

use serde::{Deserialize, Serialize};

use crate::utils::time::now_millis;

/// Built-in template families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateType {
    /// Customer-facing receipt with everything on it
    FullDetails,
    /// Courier copy, emphasizes the delivery block
    Delivery,
    /// Kitchen ticket: items and notes, no money
    Kitchen,
}

impl TemplateType {
    /// Stable id used for the built-in preset of this type
    pub fn preset_id(&self) -> &'static str {
        match self {
            Self::FullDetails => "full_details",
            Self::Delivery => "delivery",
            Self::Kitchen => "kitchen",
        }
    }
}

/// Derived state of a section's child flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionState {
    All,
    None,
    Partial,
}

fn section_state(children: &[bool]) -> SectionState {
    match children.iter().filter(|on| **on).count() {
        0 => SectionState::None,
        n if n == children.len() => SectionState::All,
        _ => SectionState::Partial,
    }
}

/// Visibility configuration of one receipt template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub template_id: String,
    pub template_type: TemplateType,
    pub template_name: String,

    // === Store info ===
    pub show_store_info: bool,
    pub show_store_name: bool,
    pub show_store_address: bool,
    pub show_store_phone: bool,

    // === Order info ===
    pub show_order_info: bool,
    pub show_order_number: bool,
    pub show_order_date: bool,

    // === Customer info ===
    pub show_customer_info: bool,
    pub show_customer_name: bool,
    pub show_customer_phone: bool,
    pub show_delivery_info: bool,

    // === Order content ===
    pub show_order_content: bool,
    pub show_item_details: bool,
    pub show_item_prices: bool,
    pub show_order_notes: bool,
    pub show_totals: bool,

    // === Payment / footer ===
    pub show_payment_info: bool,
    pub show_footer: bool,
    pub footer_text: String,

    /// Copies override for this template, at least 1
    #[serde(default = "default_copies")]
    pub print_copies: u32,

    pub created_at: i64,
    pub updated_at: i64,
}

fn default_copies() -> u32 {
    1
}

impl TemplateConfig {
    /// Default configuration for a template family.
    pub fn default_for(template_type: TemplateType) -> Self {
        Self::default_with_id(template_type, template_type.preset_id())
    }

    /// Default configuration under a caller-chosen id (used for clones).
    pub fn default_with_id(template_type: TemplateType, template_id: impl Into<String>) -> Self {
        let now = now_millis();
        let base = Self {
            template_id: template_id.into(),
            template_type,
            template_name: String::new(),
            show_store_info: true,
            show_store_name: true,
            show_store_address: true,
            show_store_phone: true,
            show_order_info: true,
            show_order_number: true,
            show_order_date: true,
            show_customer_info: true,
            show_customer_name: true,
            show_customer_phone: true,
            show_delivery_info: false,
            show_order_content: true,
            show_item_details: true,
            show_item_prices: true,
            show_order_notes: true,
            show_totals: true,
            show_payment_info: true,
            show_footer: true,
            footer_text: "Thank you for your order!".to_string(),
            print_copies: 1,
            created_at: now,
            updated_at: now,
        };

        match template_type {
            TemplateType::FullDetails => Self {
                template_name: "Full Order Details".to_string(),
                ..base
            },
            TemplateType::Delivery => Self {
                template_name: "Delivery Receipt".to_string(),
                show_delivery_info: true,
                ..base
            },
            // The kitchen never needs store details, customer data or money
            TemplateType::Kitchen => Self {
                template_name: "Kitchen Order".to_string(),
                show_store_info: false,
                show_store_name: false,
                show_store_address: false,
                show_store_phone: false,
                show_customer_info: false,
                show_customer_name: false,
                show_customer_phone: false,
                show_item_prices: false,
                show_totals: false,
                show_payment_info: false,
                show_footer: false,
                ..base
            },
        }
    }

    /// All built-in preset ids
    pub fn preset_ids() -> [&'static str; 3] {
        [
            TemplateType::FullDetails.preset_id(),
            TemplateType::Delivery.preset_id(),
            TemplateType::Kitchen.preset_id(),
        ]
    }

    /// Clone this template under a new identity (user-created custom copy).
    pub fn cloned_as(&self, template_id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            template_id: template_id.into(),
            template_name: name.into(),
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }

    /// Number of enabled top-level sections
    pub fn enabled_field_count(&self) -> usize {
        [
            self.show_store_info,
            self.show_order_info,
            self.show_customer_info,
            self.show_order_content,
            self.show_payment_info,
            self.show_footer,
        ]
        .iter()
        .filter(|on| **on)
        .count()
    }

    /// A template must have an identity and at least one visible section.
    pub fn is_valid(&self) -> bool {
        !self.template_id.trim().is_empty()
            && !self.template_name.trim().is_empty()
            && self.enabled_field_count() >= 1
    }

    // === Derived section states (never persisted) ===

    pub fn store_info_state(&self) -> SectionState {
        section_state(&[
            self.show_store_name,
            self.show_store_address,
            self.show_store_phone,
        ])
    }

    pub fn order_info_state(&self) -> SectionState {
        section_state(&[self.show_order_number, self.show_order_date])
    }

    pub fn customer_info_state(&self) -> SectionState {
        section_state(&[
            self.show_customer_name,
            self.show_customer_phone,
            self.show_delivery_info,
        ])
    }

    pub fn order_content_state(&self) -> SectionState {
        section_state(&[
            self.show_item_details,
            self.show_item_prices,
            self.show_order_notes,
            self.show_totals,
        ])
    }

    /// Touch the modification timestamp.
    pub fn touched(mut self) -> Self {
        self.updated_at = now_millis();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        for t in [
            TemplateType::FullDetails,
            TemplateType::Delivery,
            TemplateType::Kitchen,
        ] {
            let config = TemplateConfig::default_for(t);
            assert!(config.is_valid(), "{:?} preset must be valid", t);
            assert!(config.enabled_field_count() >= 1);
        }
    }

    #[test]
    fn test_kitchen_preset_hides_money() {
        let config = TemplateConfig::default_for(TemplateType::Kitchen);
        assert!(!config.show_item_prices);
        assert!(!config.show_totals);
        assert!(!config.show_payment_info);
        assert!(config.show_item_details);
        assert!(config.show_order_notes);
    }

    #[test]
    fn test_delivery_preset_shows_delivery_block() {
        let config = TemplateConfig::default_for(TemplateType::Delivery);
        assert!(config.show_delivery_info);
    }

    #[test]
    fn test_section_state_is_derived() {
        let mut config = TemplateConfig::default_for(TemplateType::FullDetails);
        assert_eq!(config.store_info_state(), SectionState::All);
        config.show_store_phone = false;
        assert_eq!(config.store_info_state(), SectionState::Partial);
        config.show_store_name = false;
        config.show_store_address = false;
        assert_eq!(config.store_info_state(), SectionState::None);
    }

    #[test]
    fn test_no_sections_is_invalid() {
        let mut config = TemplateConfig::default_for(TemplateType::FullDetails);
        config.show_store_info = false;
        config.show_order_info = false;
        config.show_customer_info = false;
        config.show_order_content = false;
        config.show_payment_info = false;
        config.show_footer = false;
        assert!(!config.is_valid());
    }

    #[test]
    fn test_clone_gets_new_identity() {
        let preset = TemplateConfig::default_for(TemplateType::Kitchen);
        let clone = preset.cloned_as("kitchen-bar", "Bar Kitchen");
        assert_eq!(clone.template_id, "kitchen-bar");
        assert_eq!(clone.template_name, "Bar Kitchen");
        assert!(!clone.show_item_prices);
    }
}
