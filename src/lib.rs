//! Storefront Core
//!
//! Pricing and inventory logic behind the marketplace storefront.
//!
//! ## Features
//! - Style attribute matrices expanded into inventory rows (SKUs)
//! - Cart line totals with CSA subscription cycles
//! - Per-vendor subtotals and order summaries
//! - JSON service over in-memory repositories

pub mod api;
pub mod config;
pub mod domain;
pub mod publisher;
pub mod store;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

// =============================================================================
// Core Types
// =============================================================================

/// One configurable axis of a style, e.g. Color or Size.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    /// Assigned when the style is first saved.
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, values: &[&str]) -> Self {
        Self {
            id: None,
            name: name.into(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Attribute key to chosen value.
pub type AttributeSelection = BTreeMap<String, String>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryStatus {
    #[default]
    Active,
    Inactive,
    #[serde(alias = "delete")]
    Deleted,
}

/// One purchasable combination of a style's attribute values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub attribute_selection: AttributeSelection,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub quantity_on_hand: u32,
    #[serde(default)]
    pub status: InventoryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl InventoryRow {
    pub fn blank(attribute_selection: AttributeSelection) -> Self {
        Self {
            id: None,
            attribute_selection,
            price: Decimal::ZERO,
            quantity_on_hand: 0,
            status: InventoryStatus::Active,
            image: None,
        }
    }

    pub fn is_saved(&self) -> bool {
        self.id.is_some()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliveryType {
    #[default]
    Shipping,
    #[serde(rename = "Home Delivery", alias = "HomeDelivery")]
    HomeDelivery,
    #[serde(rename = "Pickup Location", alias = "PickupLocation")]
    PickupLocation,
    #[serde(rename = "Safe Pickup", alias = "SafePickup")]
    SafePickup,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub charge: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(default, alias = "iscsa")]
    pub is_csa: bool,
    /// `"<period>-<unit>"`, e.g. `"2-week"`.
    #[serde(default)]
    pub frequency: String,
    #[serde(default)]
    pub duration: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub id: String,
    pub vendor_id: String,
    pub price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub discount_percent: Decimal,
    #[serde(default)]
    pub delivery_type: DeliveryType,
    #[serde(default, alias = "pickuplocation", skip_serializing_if = "Option::is_none")]
    pub pickup_location: Option<PickupLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<Subscription>,
}

impl CartLineItem {
    pub fn new(id: impl Into<String>, vendor_id: impl Into<String>, price: Decimal, quantity: u32) -> Self {
        Self {
            id: id.into(),
            vendor_id: vendor_id.into(),
            price,
            quantity,
            discount_percent: Decimal::ZERO,
            delivery_type: DeliveryType::Shipping,
            pickup_location: None,
            subscription: None,
        }
    }

    pub fn is_csa(&self) -> bool {
        self.subscription.as_ref().is_some_and(|s| s.is_csa)
    }
}

/// Cart-wide totals. Derived, never persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub sub_total: Decimal,
    pub pickup_location_fee: Decimal,
    pub delivery_fee: Decimal,
    pub safe_pickup_fee: Decimal,
    pub order_total: Decimal,
}

impl OrderSummary {
    pub fn new(sub_total: Decimal, pickup_location_fee: Decimal, delivery_fee: Decimal, safe_pickup_fee: Decimal) -> Self {
        Self {
            sub_total,
            pickup_location_fee,
            delivery_fee,
            safe_pickup_fee,
            order_total: sub_total + pickup_location_fee + delivery_fee + safe_pickup_fee,
        }
    }

    /// Display copy rounded to cents. Never feed it back into arithmetic.
    pub fn rounded(&self) -> Self {
        use crate::domain::value_objects::round_currency;
        Self {
            sub_total: round_currency(self.sub_total),
            pickup_location_fee: round_currency(self.pickup_location_fee),
            delivery_fee: round_currency(self.delivery_fee),
            safe_pickup_fee: round_currency(self.safe_pickup_fee),
            order_total: round_currency(self.order_total),
        }
    }
}

/// A recovered problem in one cart line. Aggregation carries on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseWarning {
    pub item_id: String,
    pub frequency: String,
    pub message: String,
}

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorefrontError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Too many inventory combinations: {requested} requested, limit is {limit}")]
    CapacityExceeded { requested: u128, limit: usize },

    #[error("Style not found")]
    StyleNotFound,

    #[error("Cart not found")]
    CartNotFound,

    #[error("Cart item not found")]
    ItemNotFound,

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, StorefrontError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_total_is_sum_of_parts() {
        let s = OrderSummary::new(Decimal::new(20, 0), Decimal::new(5, 0), Decimal::new(3, 0), Decimal::new(1, 0));
        assert_eq!(s.order_total, Decimal::new(29, 0));
    }

    #[test]
    fn test_rounded_only_touches_display_copy() {
        let s = OrderSummary::new(Decimal::new(10005, 3), Decimal::ZERO, Decimal::ZERO, Decimal::ZERO);
        assert_eq!(s.rounded().sub_total, Decimal::new(1001, 2));
        assert_eq!(s.sub_total, Decimal::new(10005, 3));
    }

    #[test]
    fn test_line_item_wire_names() {
        let item: CartLineItem = serde_json::from_value(serde_json::json!({
            "id": "c1", "vendorId": "v1", "price": 10, "quantity": 2,
            "deliveryType": "Pickup Location", "pickuplocation": { "charge": 5 },
            "subscription": { "iscsa": true, "frequency": "2-week", "duration": 10 }
        })).unwrap();
        assert_eq!(item.delivery_type, DeliveryType::PickupLocation);
        assert_eq!(item.pickup_location.unwrap().charge, Decimal::new(5, 0));
        assert!(item.subscription.unwrap().is_csa);
    }

    #[test]
    fn test_inventory_status_accepts_delete() {
        let status: InventoryStatus = serde_json::from_str("\"delete\"").unwrap();
        assert_eq!(status, InventoryStatus::Deleted);
    }
}
