//! Order payload
//!
//! The shape of a "new order" event delivered by the commerce poller. All
//! human-readable fields default to empty strings so a sparse payload renders
//! as blanks instead of failing.

use serde::{Deserialize, Serialize};

/// One commerce order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    /// Display number shown on the receipt (not necessarily the id)
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub status: String,
    /// Creation time, unix millis
    #[serde(default)]
    pub date_created: i64,
    /// Grand total as the backend formatted it
    #[serde(default)]
    pub total: String,
    #[serde(default)]
    pub customer_name: String,
    /// Phone or email
    #[serde(default)]
    pub contact_info: String,
    /// Formatted billing address
    #[serde(default)]
    pub billing_info: String,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    /// Delivery/pickup metadata, absent for plain orders
    #[serde(default)]
    pub fulfillment: Option<FulfillmentInfo>,
}

/// One line item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Unit price as formatted by the backend
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub options: Vec<ItemOption>,
}

fn default_quantity() -> u32 {
    1
}

/// A selected product option (e.g. "Size: Large")
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemOption {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// Fulfillment-method metadata attached by food-ordering plugins
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FulfillmentInfo {
    /// "delivery" or "pickup"
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub delivery_address: String,
    #[serde(default)]
    pub delivery_time: String,
    #[serde(default)]
    pub delivery_fee: String,
    #[serde(default)]
    pub tip: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_payload_deserializes() {
        let order: Order = serde_json::from_str(r#"{"id": 1042}"#).unwrap();
        assert_eq!(order.id, 1042);
        assert_eq!(order.number, "");
        assert!(order.items.is_empty());
        assert!(order.fulfillment.is_none());
    }

    #[test]
    fn test_item_quantity_defaults_to_one() {
        let item: OrderItem = serde_json::from_str(r#"{"name": "Pad Thai"}"#).unwrap();
        assert_eq!(item.quantity, 1);
    }
}
