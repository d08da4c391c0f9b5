//! Style and inventory endpoints.

use axum::{extract::{Path, State}, http::StatusCode, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{invalid, ApiError, AppState};
use crate::domain::aggregates::{style, ImageAttachment, RowEdit, Style};
use crate::{Attribute, InventoryRow};

#[derive(Debug, Deserialize, Validate)]
pub struct ExpandRequest {
    #[validate(length(max = 32))]
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Serialize)] pub struct ExpandResponse { pub total: usize, pub rows: Vec<InventoryRow> }

pub async fn expand_attributes(State(s): State<AppState>, Json(r): Json<ExpandRequest>) -> Result<Json<ExpandResponse>, ApiError> {
    r.validate().map_err(invalid)?;
    let rows = style::expand(&r.attributes, s.limits)?;
    Ok(Json(ExpandResponse { total: rows.len(), rows }))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateStyleRequest {
    #[validate(length(min = 1, max = 128))]
    pub product_id: String,
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(max = 32))]
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub discount: Decimal,
}

pub async fn create_style(State(s): State<AppState>, Json(r): Json<CreateStyleRequest>) -> Result<(StatusCode, Json<Style>), ApiError> {
    r.validate().map_err(invalid)?;
    let mut style = Style::create(r.product_id, r.name, r.attributes, r.discount, s.limits)?;
    let events = style.take_events();
    s.styles.save_style(style.clone())?;
    s.events.publish_all(events).await;
    tracing::info!(style_id = style.id(), product_id = style.product_id(), "style created");
    Ok((StatusCode::CREATED, Json(style)))
}

pub async fn get_style(State(s): State<AppState>, Path(id): Path<String>) -> Result<Json<Style>, ApiError> {
    Ok(Json(s.styles.get_style(&id)?))
}

pub async fn list_product_styles(State(s): State<AppState>, Path(product_id): Path<String>) -> Result<Json<Vec<Style>>, ApiError> {
    Ok(Json(s.styles.styles_for_product(&product_id)?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStyleRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(length(max = 32))]
    pub attributes: Option<Vec<Attribute>>,
    pub discount: Option<Decimal>,
}

pub async fn update_style(State(s): State<AppState>, Path(id): Path<String>, Json(r): Json<UpdateStyleRequest>) -> Result<Json<Style>, ApiError> {
    r.validate().map_err(invalid)?;
    let mut style = s.styles.get_style(&id)?;
    if let Some(name) = r.name { style.rename(name)?; }
    if let Some(discount) = r.discount { style.set_discount(discount)?; }
    if let Some(attributes) = r.attributes {
        let report = style.update_attributes(attributes, s.limits)?;
        tracing::info!(style_id = %id, kept = report.kept, added = report.added, dropped = report.dropped, "style attributes changed");
    }
    let events = style.take_events();
    s.styles.save_style(style.clone())?;
    s.events.publish_all(events).await;
    Ok(Json(style))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryResponse { pub style_id: String, pub saved: bool, pub rows: Vec<InventoryRow> }

pub async fn get_inventory(State(s): State<AppState>, Path(id): Path<String>) -> Result<Json<InventoryResponse>, ApiError> {
    let style = s.styles.get_style(&id)?;
    let rows = style.inventory(s.limits)?;
    Ok(Json(InventoryResponse { style_id: id, saved: style.has_saved_inventory(), rows }))
}

#[derive(Debug, Deserialize)] pub struct SaveInventoryRequest { #[serde(default)] pub edits: Vec<RowEdit> }
#[derive(Debug, Serialize)] pub struct SaveInventoryResponse { pub ids: Vec<String> }

pub async fn save_inventory(State(s): State<AppState>, Path(id): Path<String>, Json(r): Json<SaveInventoryRequest>) -> Result<Json<SaveInventoryResponse>, ApiError> {
    let mut style = s.styles.get_style(&id)?;
    let ids = style.save_inventory(&r.edits, s.limits)?;
    let events = style.take_events();
    s.styles.save_style(style)?;
    s.events.publish_all(events).await;
    tracing::info!(style_id = %id, rows = ids.len(), "inventories saved");
    Ok(Json(SaveInventoryResponse { ids }))
}

#[derive(Debug, Deserialize)] pub struct AttachImagesRequest { pub images: Vec<ImageAttachment> }
#[derive(Debug, Serialize)] pub struct AttachImagesResponse { pub attached: usize }

pub async fn attach_images(State(s): State<AppState>, Path(id): Path<String>, Json(r): Json<AttachImagesRequest>) -> Result<Json<AttachImagesResponse>, ApiError> {
    let mut style = s.styles.get_style(&id)?;
    let attached = style.attach_images(&r.images)?;
    let events = style.take_events();
    s.styles.save_style(style)?;
    s.events.publish_all(events).await;
    Ok(Json(AttachImagesResponse { attached }))
}
