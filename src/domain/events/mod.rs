//! Domain events
use crate::DeliveryType;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum DomainEvent {
    Style(StyleEvent),
    Cart(CartEvent),
}

impl DomainEvent {
    /// Subject the event is published under, e.g. `storefront.cart.item_added`.
    pub fn subject(&self) -> String {
        match self {
            Self::Style(e) => format!("storefront.style.{}", e.name()),
            Self::Cart(e) => format!("storefront.cart.{}", e.name()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all_fields = "camelCase")]
pub enum StyleEvent {
    Created { style_id: String, product_id: String },
    AttributesChanged { style_id: String, kept: usize, added: usize, dropped: usize },
    InventorySaved { style_id: String, rows: usize, assigned: usize },
    ImagesAttached { style_id: String, count: usize },
}

impl StyleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::AttributesChanged { .. } => "attributes_changed",
            Self::InventorySaved { .. } => "inventory_saved",
            Self::ImagesAttached { .. } => "images_attached",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all_fields = "camelCase")]
pub enum CartEvent {
    ItemAdded { cart_id: String, item_id: String, quantity: u32 },
    ItemRemoved { cart_id: String, item_id: String },
    QuantityChanged { cart_id: String, item_id: String, quantity: u32 },
    DeliveryChanged { cart_id: String, item_id: String, delivery_type: DeliveryType },
    SubscriptionChanged { cart_id: String, item_id: String, is_csa: bool },
    Cleared { cart_id: String },
}

impl CartEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ItemAdded { .. } => "item_added",
            Self::ItemRemoved { .. } => "item_removed",
            Self::QuantityChanged { .. } => "quantity_changed",
            Self::DeliveryChanged { .. } => "delivery_changed",
            Self::SubscriptionChanged { .. } => "subscription_changed",
            Self::Cleared { .. } => "cleared",
        }
    }
}
