//! Cart endpoints. Carts are keyed by the shopper's session (or buyer) id.

use axum::{extract::{Path, State}, http::StatusCode, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::{invalid, ApiError, AppState};
use crate::domain::aggregates::cart::{check_amounts, MAX_AMOUNT};
use crate::domain::aggregates::{aggregate, Cart, CartTotals};
use crate::{CartLineItem, DeliveryType, OrderSummary, PickupLocation, StorefrontError, Subscription};

#[derive(Debug, Deserialize, Validate)]
pub struct SummaryRequest {
    #[validate(length(max = 500))]
    pub items: Vec<CartLineItem>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub totals: CartTotals,
    /// Totals rounded to cents for display.
    pub display: OrderSummary,
}

pub async fn summarize(State(s): State<AppState>, Json(r): Json<SummaryRequest>) -> Result<Json<SummaryResponse>, ApiError> {
    r.validate().map_err(invalid)?;
    r.items.iter().try_for_each(check_amounts)?;
    let totals = aggregate(&r.items, s.fees.as_ref());
    Ok(Json(SummaryResponse { display: totals.summary.rounded(), totals }))
}

pub async fn get_cart(State(s): State<AppState>, Path(session): Path<String>) -> Result<Json<Cart>, ApiError> {
    let cart = s.carts.find_cart(&session)?.unwrap_or_else(|| Cart::new(session, s.fees.clone()));
    Ok(Json(cart))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    #[validate(length(min = 1, max = 128))]
    pub id: String,
    #[validate(length(min = 1, max = 128))]
    pub vendor_id: String,
    #[validate(custom = "amount_in_range")]
    pub price: Decimal,
    #[validate(range(min = 1, max = 10000))]
    pub quantity: u32,
    #[serde(default)]
    pub discount_percent: Decimal,
    #[serde(default)]
    pub delivery_type: DeliveryType,
    #[serde(default, alias = "pickuplocation")]
    pub pickup_location: Option<PickupLocation>,
    #[serde(default)]
    pub subscription: Option<Subscription>,
}

fn amount_in_range(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount < Decimal::ZERO || *amount > MAX_AMOUNT { return Err(ValidationError::new("amount_out_of_range")); }
    Ok(())
}

impl From<AddToCartRequest> for CartLineItem {
    fn from(r: AddToCartRequest) -> Self {
        Self {
            id: r.id, vendor_id: r.vendor_id, price: r.price, quantity: r.quantity, discount_percent: r.discount_percent,
            delivery_type: r.delivery_type, pickup_location: r.pickup_location, subscription: r.subscription,
        }
    }
}

pub async fn add_to_cart(State(s): State<AppState>, Path(session): Path<String>, Json(r): Json<AddToCartRequest>) -> Result<(StatusCode, Json<Cart>), ApiError> {
    r.validate().map_err(invalid)?;
    let mut cart = s.carts.find_cart(&session)?.unwrap_or_else(|| Cart::new(session, s.fees.clone()));
    cart.add_item(r.into())?;
    let events = cart.take_events();
    s.carts.save_cart(cart.clone())?;
    s.events.publish_all(events).await;
    Ok((StatusCode::CREATED, Json(cart)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    #[validate(range(max = 10000))]
    pub quantity: Option<u32>,
    pub delivery_type: Option<DeliveryType>,
    #[serde(alias = "pickuplocation")]
    pub pickup_location: Option<PickupLocation>,
    pub subscription: Option<Subscription>,
    #[serde(default)]
    pub unsubscribe: bool,
}

/// Applies delivery and subscription changes before the quantity, since a
/// zero quantity removes the line.
pub async fn update_item(State(s): State<AppState>, Path((session, item)): Path<(String, String)>, Json(r): Json<UpdateItemRequest>) -> Result<Json<Cart>, ApiError> {
    r.validate().map_err(invalid)?;
    let mut cart = s.carts.find_cart(&session)?.ok_or(StorefrontError::CartNotFound)?;
    match (r.delivery_type, r.pickup_location) {
        (Some(delivery_type), pickup) => cart.set_delivery(&item, delivery_type, pickup)?,
        (None, Some(pickup)) => cart.set_delivery(&item, DeliveryType::PickupLocation, Some(pickup))?,
        (None, None) => {}
    }
    if r.unsubscribe {
        cart.set_subscription(&item, None)?;
    } else if let Some(subscription) = r.subscription {
        cart.set_subscription(&item, Some(subscription))?;
    }
    if let Some(quantity) = r.quantity { cart.update_quantity(&item, quantity)?; }
    let events = cart.take_events();
    s.carts.save_cart(cart.clone())?;
    s.events.publish_all(events).await;
    Ok(Json(cart))
}

pub async fn remove_item(State(s): State<AppState>, Path((session, item)): Path<(String, String)>) -> Result<Json<Cart>, ApiError> {
    let mut cart = s.carts.find_cart(&session)?.ok_or(StorefrontError::CartNotFound)?;
    cart.remove_item(&item)?;
    let events = cart.take_events();
    s.carts.save_cart(cart.clone())?;
    s.events.publish_all(events).await;
    Ok(Json(cart))
}

pub async fn clear_cart(State(s): State<AppState>, Path(session): Path<String>) -> Result<StatusCode, ApiError> {
    if let Some(mut cart) = s.carts.find_cart(&session)? {
        cart.clear();
        s.carts.remove_cart(&session)?;
        s.events.publish_all(cart.take_events()).await;
    }
    Ok(StatusCode::NO_CONTENT)
}
