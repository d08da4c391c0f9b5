//! Style Aggregate
//!
//! A style owns its attributes and the inventory rows generated from them.
//! Rows are the Cartesian product of the attribute value lists, enumerated
//! odometer-style with the last attribute varying fastest. Before the first
//! save a row is addressed by its index in that order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::domain::events::{DomainEvent, StyleEvent};
use crate::domain::value_objects::AttributeKey;
use crate::{Attribute, AttributeSelection, InventoryRow, InventoryStatus, Result, StorefrontError};

pub const DEFAULT_MAX_COMBINATIONS: usize = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExpansionLimits {
    pub max_combinations: usize,
}

impl Default for ExpansionLimits {
    fn default() -> Self { Self { max_combinations: DEFAULT_MAX_COMBINATIONS } }
}

/// Number of rows `attributes` expands to. Saturates instead of overflowing.
pub fn combination_count(attributes: &[Attribute]) -> u128 {
    attributes.iter().fold(1u128, |acc, a| acc.saturating_mul(a.values.len() as u128))
}

/// Expands attributes into one blank inventory row per combination.
///
/// No attributes yields a single row with an empty selection. Fails before
/// allocating anything when the count exceeds `limits`.
pub fn expand(attributes: &[Attribute], limits: ExpansionLimits) -> Result<Vec<InventoryRow>> {
    let keys = check_attributes(attributes, limits)?;
    let total = combination_count(attributes) as usize;
    let mut rows = Vec::with_capacity(total);
    let mut cursor = vec![0usize; attributes.len()];
    for _ in 0..total {
        let selection: AttributeSelection = keys
            .iter()
            .zip(attributes)
            .zip(&cursor)
            .map(|((key, attribute), &i)| (key.to_string(), attribute.values[i].clone()))
            .collect();
        rows.push(InventoryRow::blank(selection));

        for (slot, attribute) in cursor.iter_mut().zip(attributes).rev() {
            *slot += 1;
            if *slot < attribute.values.len() { break; }
            *slot = 0;
        }
    }
    tracing::debug!(rows = rows.len(), attributes = attributes.len(), "expanded style attributes");
    Ok(rows)
}

/// Checks that `attributes` expand within `limits` and returns their
/// selection keys in order.
pub fn check_attributes(attributes: &[Attribute], limits: ExpansionLimits) -> Result<Vec<AttributeKey>> {
    let keys = selection_keys(attributes)?;
    let requested = combination_count(attributes);
    if requested > limits.max_combinations as u128 {
        tracing::warn!(requested = %requested, limit = limits.max_combinations, "style expansion refused");
        return Err(StorefrontError::CapacityExceeded { requested, limit: limits.max_combinations });
    }
    Ok(keys)
}

fn selection_keys(attributes: &[Attribute]) -> Result<Vec<AttributeKey>> {
    let mut seen = HashSet::new();
    attributes
        .iter()
        .enumerate()
        .map(|(position, attribute)| {
            let key = AttributeKey::resolve(attribute.id.as_deref(), position);
            if attribute.values.is_empty() {
                return Err(StorefrontError::Validation(format!("attribute '{}' ({}) has no values", attribute.name, key)));
            }
            let mut values = HashSet::new();
            if let Some(dup) = attribute.values.iter().find(|v| !values.insert(v.as_str())) {
                return Err(StorefrontError::Validation(format!("attribute '{}' repeats value '{}'", attribute.name, dup)));
            }
            if !seen.insert(key.clone()) {
                return Err(StorefrontError::Validation(format!("attribute key '{}' is used twice", key)));
            }
            Ok(key)
        })
        .collect()
}

/// A per-row change addressed by row index.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowEdit {
    pub index: usize,
    pub price: Option<Decimal>,
    pub quantity_on_hand: Option<u32>,
    pub status: Option<InventoryStatus>,
    pub image: Option<String>,
}

pub fn apply_edits(rows: &mut [InventoryRow], edits: &[RowEdit]) -> Result<()> {
    for edit in edits {
        let len = rows.len();
        let row = rows
            .get_mut(edit.index)
            .ok_or_else(|| StorefrontError::Validation(format!("row {} out of range ({} rows)", edit.index, len)))?;
        if let Some(price) = edit.price {
            if price.is_sign_negative() && !price.is_zero() {
                return Err(StorefrontError::Validation(format!("row {} has a negative price", edit.index)));
            }
            row.price = price;
        }
        if let Some(quantity) = edit.quantity_on_hand { row.quantity_on_hand = quantity; }
        if let Some(status) = edit.status { row.status = status; }
        if let Some(image) = &edit.image { row.image = Some(image.clone()); }
    }
    Ok(())
}

/// Outcome of re-deriving rows after the attributes changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Reconciliation { pub kept: usize, pub added: usize, pub dropped: usize }

/// Re-expands `attributes`, carrying over every current row whose
/// combination still exists.
pub fn reconcile(current: &[InventoryRow], attributes: &[Attribute], limits: ExpansionLimits) -> Result<(Vec<InventoryRow>, Reconciliation)> {
    let by_selection: HashMap<&AttributeSelection, &InventoryRow> =
        current.iter().map(|row| (&row.attribute_selection, row)).collect();
    let mut kept = 0;
    let rows: Vec<InventoryRow> = expand(attributes, limits)?
        .into_iter()
        .map(|candidate| match by_selection.get(&candidate.attribute_selection) {
            Some(existing) => { kept += 1; (*existing).clone() }
            None => candidate,
        })
        .collect();
    let report = Reconciliation { kept, added: rows.len() - kept, dropped: by_selection.len() - kept };
    Ok((rows, report))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAttachment { pub inventory_id: String, pub image: String }

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    id: String,
    product_id: String,
    name: String,
    attributes: Vec<Attribute>,
    discount: Decimal,
    inventories: Vec<InventoryRow>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl Style {
    pub fn create(
        product_id: impl Into<String>,
        name: impl Into<String>,
        attributes: Vec<Attribute>,
        discount: Decimal,
        limits: ExpansionLimits,
    ) -> Result<Self> {
        let name = checked_name(name.into())?;
        check_discount(discount)?;
        let attributes = with_ids(attributes);
        check_attributes(&attributes, limits)?;
        let id = Uuid::now_v7().to_string();
        let product_id = product_id.into();
        let now = Utc::now();
        let mut style = Self {
            id: id.clone(), product_id: product_id.clone(), name, attributes, discount,
            inventories: vec![], created_at: now, updated_at: now, events: vec![],
        };
        style.raise_event(DomainEvent::Style(StyleEvent::Created { style_id: id, product_id }));
        Ok(style)
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn product_id(&self) -> &str { &self.product_id }
    pub fn name(&self) -> &str { &self.name }
    pub fn attributes(&self) -> &[Attribute] { &self.attributes }
    pub fn discount(&self) -> Decimal { self.discount }
    pub fn saved_inventory(&self) -> &[InventoryRow] { &self.inventories }
    pub fn has_saved_inventory(&self) -> bool { !self.inventories.is_empty() }

    pub fn rename(&mut self, name: impl Into<String>) -> Result<()> {
        self.name = checked_name(name.into())?;
        self.touch();
        Ok(())
    }

    pub fn set_discount(&mut self, discount: Decimal) -> Result<()> {
        check_discount(discount)?;
        self.discount = discount;
        self.touch();
        Ok(())
    }

    /// Replaces the attributes. Saved rows are reconciled by combination;
    /// on error nothing changes.
    pub fn update_attributes(&mut self, attributes: Vec<Attribute>, limits: ExpansionLimits) -> Result<Reconciliation> {
        let attributes = with_ids(attributes);
        check_attributes(&attributes, limits)?;
        let report = if self.inventories.is_empty() {
            Reconciliation::default()
        } else {
            let (rows, report) = reconcile(&self.inventories, &attributes, limits)?;
            self.inventories = rows;
            report
        };
        self.attributes = attributes;
        self.touch();
        self.raise_event(DomainEvent::Style(StyleEvent::AttributesChanged {
            style_id: self.id.clone(), kept: report.kept, added: report.added, dropped: report.dropped,
        }));
        Ok(report)
    }

    /// Saved rows if there are any, otherwise a fresh expansion.
    pub fn inventory(&self, limits: ExpansionLimits) -> Result<Vec<InventoryRow>> {
        if self.has_saved_inventory() { return Ok(self.inventories.clone()); }
        expand(&self.attributes, limits)
    }

    /// Applies `edits` to the current rows and saves them, assigning ids to
    /// new rows. Returns the ids in row order.
    pub fn save_inventory(&mut self, edits: &[RowEdit], limits: ExpansionLimits) -> Result<Vec<String>> {
        let mut rows = self.inventory(limits)?;
        apply_edits(&mut rows, edits)?;
        let mut assigned = 0;
        let ids = rows
            .iter_mut()
            .map(|row| row.id.get_or_insert_with(|| { assigned += 1; Uuid::now_v7().to_string() }).clone())
            .collect();
        self.raise_event(DomainEvent::Style(StyleEvent::InventorySaved { style_id: self.id.clone(), rows: rows.len(), assigned }));
        self.inventories = rows;
        self.touch();
        Ok(ids)
    }

    pub fn attach_images(&mut self, images: &[ImageAttachment]) -> Result<usize> {
        let positions = images
            .iter()
            .map(|a| {
                self.inventories
                    .iter()
                    .position(|row| row.id.as_deref() == Some(a.inventory_id.as_str()))
                    .ok_or_else(|| StorefrontError::Validation(format!("unknown inventory id '{}'", a.inventory_id)))
            })
            .collect::<Result<Vec<_>>>()?;
        for (position, attachment) in positions.into_iter().zip(images) {
            self.inventories[position].image = Some(attachment.image.clone());
        }
        self.touch();
        self.raise_event(DomainEvent::Style(StyleEvent::ImagesAttached { style_id: self.id.clone(), count: images.len() }));
        Ok(images.len())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

fn checked_name(name: String) -> Result<String> {
    let name = name.trim().to_string();
    if name.is_empty() { return Err(StorefrontError::Validation("style name is empty".into())); }
    Ok(name)
}

fn check_discount(discount: Decimal) -> Result<()> {
    if discount < Decimal::ZERO || discount > Decimal::ONE_HUNDRED {
        return Err(StorefrontError::Validation(format!("discount {} is outside 0..=100", discount)));
    }
    Ok(())
}

fn with_ids(attributes: Vec<Attribute>) -> Vec<Attribute> {
    attributes
        .into_iter()
        .map(|mut a| {
            if a.id.as_deref().map_or(true, str::is_empty) { a.id = Some(Uuid::new_v4().to_string()); }
            a
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection(row: &InventoryRow, keys: &[&str]) -> Vec<String> {
        keys.iter().map(|k| row.attribute_selection[*k].clone()).collect()
    }

    #[test]
    fn test_expand_odometer_order() {
        let attrs = vec![Attribute::new("Color", &["Red", "Blue"]).with_id("color"), Attribute::new("Size", &["S", "M"]).with_id("size")];
        let rows = expand(&attrs, ExpansionLimits::default()).unwrap();
        let got: Vec<_> = rows.iter().map(|r| selection(r, &["color", "size"])).collect();
        assert_eq!(got, vec![vec!["Red", "S"], vec!["Red", "M"], vec!["Blue", "S"], vec!["Blue", "M"]]);
        assert!(rows.iter().all(|r| r.price.is_zero() && r.quantity_on_hand == 0 && r.status == InventoryStatus::Active));
    }

    #[test]
    fn test_expand_cardinality_and_fallback_keys() {
        let attrs = vec![Attribute::new("A", &["1", "2", "3"]), Attribute::new("B", &["x"]), Attribute::new("C", &["p", ""])];
        let rows = expand(&attrs, ExpansionLimits::default()).unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows.len() as u128, combination_count(&attrs));
        assert_eq!(selection(&rows[1], &["attribute-0", "attribute-1", "attribute-2"]), vec!["1", "x", ""]);
        assert_eq!(rows, expand(&attrs, ExpansionLimits::default()).unwrap());
    }

    #[test]
    fn test_expand_no_attributes() {
        let rows = expand(&[], ExpansionLimits::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].attribute_selection.is_empty());
    }

    #[test]
    fn test_expand_rejects_empty_values() {
        let empty = vec![Attribute::new("Color", &[])];
        assert!(matches!(expand(&empty, ExpansionLimits::default()), Err(StorefrontError::Validation(_))));
    }

    #[test]
    fn test_repeated_values_are_rejected_not_multiplied() {
        // Repeats would yield rows with identical selections, so they are refused
        // rather than counted into the n1*...*nk product.
        let dup_value = vec![Attribute::new("Color", &["Red", "Red"]), Attribute::new("Size", &["S"])];
        match expand(&dup_value, ExpansionLimits::default()) {
            Err(StorefrontError::Validation(msg)) => assert!(msg.contains("repeats value 'Red'")),
            other => panic!("expected validation error, got {:?}", other),
        }
        let dup_key = vec![Attribute::new("A", &["1"]).with_id("k"), Attribute::new("B", &["2"]).with_id("k")];
        match expand(&dup_key, ExpansionLimits::default()) {
            Err(StorefrontError::Validation(msg)) => assert!(msg.contains("'k' is used twice")),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(matches!(
            Style::create("P1", "Tee", dup_value, Decimal::ZERO, ExpansionLimits::default()),
            Err(StorefrontError::Validation(_))
        ));
    }

    #[test]
    fn test_expand_capacity_guard() {
        let values: Vec<String> = (0..10).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = values.iter().map(String::as_str).collect();
        let attrs: Vec<_> = (0..3).map(|i| Attribute::new(format!("A{}", i), &refs)).collect();
        let limits = ExpansionLimits { max_combinations: 999 };
        assert_eq!(expand(&attrs, limits), Err(StorefrontError::CapacityExceeded { requested: 1000, limit: 999 }));
        assert_eq!(expand(&attrs, ExpansionLimits { max_combinations: 1000 }).unwrap().len(), 1000);
    }

    #[test]
    fn test_apply_edits_by_index() {
        let mut rows = expand(&[Attribute::new("Size", &["S", "M"])], ExpansionLimits::default()).unwrap();
        let edits = vec![RowEdit { index: 1, price: Some(Decimal::new(1299, 2)), quantity_on_hand: Some(4), ..Default::default() }];
        apply_edits(&mut rows, &edits).unwrap();
        assert_eq!(rows[1].price, Decimal::new(1299, 2));
        assert_eq!(rows[1].quantity_on_hand, 4);
        assert!(rows[0].price.is_zero());
        let out_of_range = vec![RowEdit { index: 2, ..Default::default() }];
        assert!(apply_edits(&mut rows, &out_of_range).is_err());
        let negative = vec![RowEdit { index: 0, price: Some(Decimal::new(-1, 0)), ..Default::default() }];
        assert!(apply_edits(&mut rows, &negative).is_err());
    }

    #[test]
    fn test_style_save_and_reconcile() {
        let attrs = vec![Attribute::new("Color", &["Red", "Blue"]), Attribute::new("Size", &["S"])];
        let mut style = Style::create("P1", "Tee", attrs, Decimal::ZERO, ExpansionLimits::default()).unwrap();
        assert!(style.attributes().iter().all(|a| a.id.is_some()));
        let limits = ExpansionLimits::default();
        let ids = style.save_inventory(&[RowEdit { index: 0, price: Some(Decimal::new(15, 0)), ..Default::default() }], limits).unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(style.save_inventory(&[], limits).unwrap(), ids);

        let mut attrs = style.attributes().to_vec();
        attrs[0].values = vec!["Red".into(), "Green".into()];
        attrs[1].values.push("M".into());
        let report = style.update_attributes(attrs, limits).unwrap();
        assert_eq!(report, Reconciliation { kept: 1, added: 3, dropped: 1 });
        let rows = style.inventory(limits).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].id.as_deref(), Some(ids[0].as_str()));
        assert_eq!(rows[0].price, Decimal::new(15, 0));
        assert!(rows[1].id.is_none());
    }

    #[test]
    fn test_failed_update_leaves_style_unchanged() {
        let mut style = Style::create("P1", "Tee", vec![Attribute::new("Size", &["S"])], Decimal::ZERO, ExpansionLimits::default()).unwrap();
        style.save_inventory(&[], ExpansionLimits::default()).unwrap();
        let before = style.attributes().to_vec();
        assert!(style.update_attributes(vec![Attribute::new("Size", &[])], ExpansionLimits::default()).is_err());
        assert_eq!(style.attributes(), before.as_slice());
    }

    #[test]
    fn test_attach_images() {
        let mut style = Style::create("P1", "Tee", vec![Attribute::new("Size", &["S", "M"])], Decimal::ZERO, ExpansionLimits::default()).unwrap();
        let ids = style.save_inventory(&[], ExpansionLimits::default()).unwrap();
        let n = style.attach_images(&[ImageAttachment { inventory_id: ids[1].clone(), image: "m.png".into() }]).unwrap();
        assert_eq!(n, 1);
        assert_eq!(style.saved_inventory()[1].image.as_deref(), Some("m.png"));
        assert!(style.attach_images(&[ImageAttachment { inventory_id: "nope".into(), image: "x".into() }]).is_err());
        let events = style.take_events();
        assert_eq!(events.first().map(|e| e.subject()), Some("storefront.style.created".to_string()));
        assert!(style.take_events().is_empty());
    }

    #[test]
    fn test_create_validates() {
        let limits = ExpansionLimits::default();
        assert!(Style::create("P1", "  ", vec![], Decimal::ZERO, limits).is_err());
        assert!(Style::create("P1", "Tee", vec![], Decimal::new(101, 0), limits).is_err());
        let empty = vec![Attribute::new("Color", &[])];
        assert!(matches!(Style::create("P1", "Tee", empty, Decimal::ZERO, limits), Err(StorefrontError::Validation(_))));
        let wide = vec![Attribute::new("A", &["1", "2"]), Attribute::new("B", &["x", "y"])];
        assert_eq!(
            Style::create("P1", "Tee", wide, Decimal::ZERO, ExpansionLimits { max_combinations: 3 }).err(),
            Some(StorefrontError::CapacityExceeded { requested: 4, limit: 3 })
        );
    }

    #[test]
    fn test_unsaved_style_update_validates() {
        let mut style = Style::create("P1", "Tee", vec![Attribute::new("Size", &["S", "M"])], Decimal::ZERO, ExpansionLimits::default()).unwrap();
        style.take_events();
        let before = style.attributes().to_vec();

        let empty = vec![Attribute::new("Size", &[])];
        assert!(matches!(style.update_attributes(empty, ExpansionLimits::default()), Err(StorefrontError::Validation(_))));
        let wide = vec![Attribute::new("Size", &["S", "M"]), Attribute::new("Color", &["Red", "Blue"])];
        assert_eq!(
            style.update_attributes(wide, ExpansionLimits { max_combinations: 3 }),
            Err(StorefrontError::CapacityExceeded { requested: 4, limit: 3 })
        );

        assert_eq!(style.attributes(), before.as_slice());
        assert!(style.take_events().is_empty());
        assert_eq!(style.inventory(ExpansionLimits::default()).unwrap().len(), 2);
    }
}
