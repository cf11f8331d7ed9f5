use serde::{Deserialize, Serialize};

/// Stock level relative to the item's low-stock threshold.
///
/// Out of stock is a special case of low stock: `is_low()` holds for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    /// Quantity equal to the threshold is already low.
    pub fn classify(quantity_on_hand: i64, low_stock_threshold: i64) -> Self {
        if quantity_on_hand <= 0 {
            StockStatus::OutOfStock
        } else if quantity_on_hand <= low_stock_threshold {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    pub fn is_low(&self) -> bool {
        !matches!(self, StockStatus::InStock)
    }

    pub fn is_out(&self) -> bool {
        matches!(self, StockStatus::OutOfStock)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::InStock => "in_stock",
            StockStatus::LowStock => "low_stock",
            StockStatus::OutOfStock => "out_of_stock",
        }
    }
}
