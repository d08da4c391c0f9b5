//! Aggregates module
pub mod cart;
pub mod style;

pub use cart::{aggregate, line_total, Cart, CartTotals, FeeSchedule, FlatFeeSchedule, LineTotal, NoFees};
pub use style::{expand, ExpansionLimits, ImageAttachment, Reconciliation, RowEdit, Style};
