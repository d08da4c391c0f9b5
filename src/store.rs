//! Repositories the HTTP layer reads and writes aggregates through.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::aggregates::{Cart, Style};
use crate::{Result, StorefrontError};

pub trait StyleRepository: Send + Sync {
    fn get_style(&self, id: &str) -> Result<Style>;
    fn save_style(&self, style: Style) -> Result<()>;
    fn styles_for_product(&self, product_id: &str) -> Result<Vec<Style>>;
}

pub trait CartRepository: Send + Sync {
    fn find_cart(&self, session_id: &str) -> Result<Option<Cart>>;
    fn save_cart(&self, cart: Cart) -> Result<()>;
    fn remove_cart(&self, session_id: &str) -> Result<bool>;
}

/// Process-local store. Last write wins.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    styles: RwLock<HashMap<String, Style>>,
    carts: RwLock<HashMap<String, Cart>>,
}

impl InMemoryStore {
    pub fn new() -> Self { Self::default() }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorefrontError { StorefrontError::Storage(e.to_string()) }

impl StyleRepository for InMemoryStore {
    fn get_style(&self, id: &str) -> Result<Style> {
        self.styles.read().map_err(poisoned)?.get(id).cloned().ok_or(StorefrontError::StyleNotFound)
    }

    fn save_style(&self, style: Style) -> Result<()> {
        self.styles.write().map_err(poisoned)?.insert(style.id().to_string(), style);
        Ok(())
    }

    fn styles_for_product(&self, product_id: &str) -> Result<Vec<Style>> {
        let mut styles: Vec<Style> = self
            .styles
            .read()
            .map_err(poisoned)?
            .values()
            .filter(|s| s.product_id() == product_id)
            .cloned()
            .collect();
        styles.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(styles)
    }
}

impl CartRepository for InMemoryStore {
    fn find_cart(&self, session_id: &str) -> Result<Option<Cart>> {
        Ok(self.carts.read().map_err(poisoned)?.get(session_id).cloned())
    }

    fn save_cart(&self, cart: Cart) -> Result<()> {
        self.carts.write().map_err(poisoned)?.insert(cart.session_id().to_string(), cart);
        Ok(())
    }

    fn remove_cart(&self, session_id: &str) -> Result<bool> {
        Ok(self.carts.write().map_err(poisoned)?.remove(session_id).is_some())
    }
}
