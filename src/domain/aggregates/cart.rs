//! Cart Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::events::{CartEvent, DomainEvent};
use crate::domain::value_objects::CsaFrequency;
use crate::{CartLineItem, DeliveryType, OrderSummary, ParseWarning, PickupLocation, Result, StorefrontError, Subscription};

/// Delivery and safe-pickup charges per line. Both default to zero.
pub trait FeeSchedule: Debug + Send + Sync {
    fn delivery_fee(&self, _line: &CartLineItem) -> Decimal { Decimal::ZERO }
    fn safe_pickup_fee(&self, _line: &CartLineItem) -> Decimal { Decimal::ZERO }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoFees;
impl FeeSchedule for NoFees {}

/// Flat charge per home-delivery line and per safe-pickup line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlatFeeSchedule { pub delivery: Decimal, pub safe_pickup: Decimal }

impl FeeSchedule for FlatFeeSchedule {
    fn delivery_fee(&self, line: &CartLineItem) -> Decimal {
        if line.delivery_type == DeliveryType::HomeDelivery { self.delivery } else { Decimal::ZERO }
    }
    fn safe_pickup_fee(&self, line: &CartLineItem) -> Decimal {
        if line.delivery_type == DeliveryType::SafePickup { self.safe_pickup } else { Decimal::ZERO }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineTotal { pub item_id: String, pub vendor_id: String, pub total: Decimal }

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub summary: OrderSummary,
    pub vendor_subtotals: BTreeMap<String, Decimal>,
    pub line_totals: Vec<LineTotal>,
    pub warnings: Vec<ParseWarning>,
}

/// Upper bound for a unit price or pickup charge.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Rejects prices and pickup charges outside `0..=MAX_AMOUNT`.
pub fn check_amounts(line: &CartLineItem) -> Result<()> {
    let in_range = |amount: Decimal| amount >= Decimal::ZERO && amount <= MAX_AMOUNT;
    if !in_range(line.price) {
        return Err(StorefrontError::Validation(format!("line '{}' price {} is outside 0..={}", line.id, line.price, MAX_AMOUNT)));
    }
    if let Some(pickup) = &line.pickup_location {
        if !in_range(pickup.charge) {
            return Err(StorefrontError::Validation(format!("line '{}' pickup charge {} is outside 0..={}", line.id, pickup.charge, MAX_AMOUNT)));
        }
    }
    Ok(())
}

fn warning(line: &CartLineItem, message: String) -> ParseWarning {
    let frequency = line.subscription.as_ref().map(|s| s.frequency.clone()).unwrap_or_default();
    tracing::warn!(item_id = %line.id, frequency = %frequency, "{}", message);
    ParseWarning { item_id: line.id.clone(), frequency, message }
}

/// Effective total of one line: `price * quantity`, times the CSA cycle
/// count for CSA subscriptions.
///
/// A line whose total leaves the `Decimal` range counts as zero and is
/// reported in the warnings.
pub fn line_total(line: &CartLineItem) -> (Decimal, Vec<ParseWarning>) {
    let mut warnings = vec![];
    let multiplier = match &line.subscription {
        Some(sub) if sub.is_csa => {
            let (frequency, error) = CsaFrequency::parse_lenient(&sub.frequency);
            if let Some(e) = error {
                warnings.push(warning(line, format!("{}, using a period of 1", e)));
            }
            match frequency.cycles(sub.duration) {
                Some(cycles) => cycles,
                None => {
                    warnings.push(warning(line, format!("period {} is too small, using a period of 1", frequency.period())));
                    Decimal::from(sub.duration)
                }
            }
        }
        _ => Decimal::ONE,
    };
    let total = line
        .price
        .checked_mul(Decimal::from(line.quantity))
        .and_then(|base| base.checked_mul(multiplier));
    match total {
        Some(total) => (total, warnings),
        None => {
            warnings.push(warning(line, "line total is out of range, excluded from the order".into()));
            (Decimal::ZERO, warnings)
        }
    }
}

/// Running order sums. `add` refuses a line that would overflow any of
/// them, the order total included.
#[derive(Clone, Copy, Default)]
struct Sums { sub_total: Decimal, pickup: Decimal, delivery: Decimal, safe_pickup: Decimal }

impl Sums {
    fn add(&self, line: Sums) -> Option<Sums> {
        let next = Sums {
            sub_total: self.sub_total.checked_add(line.sub_total)?,
            pickup: self.pickup.checked_add(line.pickup)?,
            delivery: self.delivery.checked_add(line.delivery)?,
            safe_pickup: self.safe_pickup.checked_add(line.safe_pickup)?,
        };
        next.sub_total.checked_add(next.pickup)?.checked_add(next.delivery)?.checked_add(next.safe_pickup)?;
        Some(next)
    }
}

/// Rolls line items up into per-vendor subtotals and an order summary.
pub fn aggregate(lines: &[CartLineItem], fees: &dyn FeeSchedule) -> CartTotals {
    let mut totals = CartTotals::default();
    let mut sums = Sums::default();
    for line in lines {
        let (total, warnings) = line_total(line);
        totals.warnings.extend(warnings);
        let pickup = match (&line.delivery_type, &line.pickup_location) {
            (DeliveryType::PickupLocation, Some(p)) => p.charge,
            _ => Decimal::ZERO,
        };
        let line_sums = Sums { sub_total: total, pickup, delivery: fees.delivery_fee(line), safe_pickup: fees.safe_pickup_fee(line) };
        let vendor = totals.vendor_subtotals.get(&line.vendor_id).copied().unwrap_or(Decimal::ZERO);
        let (next, vendor_total, total) = match (sums.add(line_sums), vendor.checked_add(total)) {
            (Some(next), Some(vendor_total)) => (next, vendor_total, total),
            _ => {
                totals.warnings.push(warning(line, "order total is out of range, line excluded".into()));
                (sums, vendor, Decimal::ZERO)
            }
        };
        sums = next;
        totals.vendor_subtotals.insert(line.vendor_id.clone(), vendor_total);
        totals.line_totals.push(LineTotal { item_id: line.id.clone(), vendor_id: line.vendor_id.clone(), total });
    }
    totals.summary = OrderSummary::new(sums.sub_total, sums.pickup, sums.delivery, sums.safe_pickup);
    totals
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    id: String,
    session_id: String,
    items: Vec<CartLineItem>,
    totals: CartTotals,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    fees: Arc<dyn FeeSchedule>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl Cart {
    pub fn new(session_id: impl Into<String>, fees: Arc<dyn FeeSchedule>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(), session_id: session_id.into(), items: vec![],
            totals: CartTotals::default(), created_at: Utc::now(), updated_at: Utc::now(), fees, events: vec![],
        }
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn session_id(&self) -> &str { &self.session_id }
    pub fn items(&self) -> &[CartLineItem] { &self.items }
    pub fn totals(&self) -> &CartTotals { &self.totals }
    pub fn summary(&self) -> &OrderSummary { &self.totals.summary }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    /// Adds a line; adding an id already in the cart bumps its quantity.
    pub fn add_item(&mut self, item: CartLineItem) -> Result<()> {
        if item.quantity == 0 { return Err(StorefrontError::Validation("quantity must be at least 1".into())); }
        check_amounts(&item)?;
        let event = CartEvent::ItemAdded { cart_id: self.id.clone(), item_id: item.id.clone(), quantity: item.quantity };
        if let Some(existing) = self.items.iter_mut().find(|i| i.id == item.id) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            self.items.push(item);
        }
        self.recalculate();
        self.raise_event(DomainEvent::Cart(event));
        Ok(())
    }

    pub fn remove_item(&mut self, item_id: &str) -> Result<()> {
        let before = self.items.len();
        self.items.retain(|i| i.id != item_id);
        if self.items.len() == before { return Err(StorefrontError::ItemNotFound); }
        self.recalculate();
        self.raise_event(DomainEvent::Cart(CartEvent::ItemRemoved { cart_id: self.id.clone(), item_id: item_id.to_string() }));
        Ok(())
    }

    /// Zero removes the line.
    pub fn update_quantity(&mut self, item_id: &str, quantity: u32) -> Result<()> {
        if quantity == 0 { return self.remove_item(item_id); }
        self.item_mut(item_id)?.quantity = quantity;
        self.recalculate();
        self.raise_event(DomainEvent::Cart(CartEvent::QuantityChanged { cart_id: self.id.clone(), item_id: item_id.to_string(), quantity }));
        Ok(())
    }

    /// Switches the delivery type. A given pickup location replaces the
    /// line's current one.
    pub fn set_delivery(&mut self, item_id: &str, delivery_type: DeliveryType, pickup_location: Option<PickupLocation>) -> Result<()> {
        if let Some(pickup) = &pickup_location {
            if pickup.charge < Decimal::ZERO || pickup.charge > MAX_AMOUNT {
                return Err(StorefrontError::Validation(format!("pickup charge {} is outside 0..={}", pickup.charge, MAX_AMOUNT)));
            }
        }
        let item = self.item_mut(item_id)?;
        item.delivery_type = delivery_type;
        if pickup_location.is_some() { item.pickup_location = pickup_location; }
        self.recalculate();
        self.raise_event(DomainEvent::Cart(CartEvent::DeliveryChanged { cart_id: self.id.clone(), item_id: item_id.to_string(), delivery_type }));
        Ok(())
    }

    pub fn set_subscription(&mut self, item_id: &str, subscription: Option<Subscription>) -> Result<()> {
        let is_csa = subscription.as_ref().is_some_and(|s| s.is_csa);
        self.item_mut(item_id)?.subscription = subscription;
        self.recalculate();
        self.raise_event(DomainEvent::Cart(CartEvent::SubscriptionChanged { cart_id: self.id.clone(), item_id: item_id.to_string(), is_csa }));
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.recalculate();
        self.raise_event(DomainEvent::Cart(CartEvent::Cleared { cart_id: self.id.clone() }));
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }

    fn item_mut(&mut self, item_id: &str) -> Result<&mut CartLineItem> {
        self.items.iter_mut().find(|i| i.id == item_id).ok_or(StorefrontError::ItemNotFound)
    }

    fn recalculate(&mut self) {
        self.totals = aggregate(&self.items, self.fees.as_ref());
        self.updated_at = Utc::now();
    }

    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}
