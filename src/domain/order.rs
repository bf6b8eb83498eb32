use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::validation;

/// Fulfilment status. Any status may be set from any other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Confirmed,
    Shipped,
    Delivered,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "confirmed" => Ok(OrderStatus::Confirmed),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            other => Err(format!(
                "Invalid order status '{other}', expected confirmed, shipped or delivered"
            )),
        }
    }
}

/// One product line, with name and price frozen at the time of ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub sku: String,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
}

impl LineItem {
    pub fn new(sku: impl Into<String>, product_name: impl Into<String>, unit_price: Decimal, quantity: u32) -> Self {
        Self {
            sku: sku.into(),
            product_name: product_name.into(),
            unit_price,
            quantity,
            line_total: validation::round_money(unit_price * Decimal::from(quantity)),
        }
    }
}

/// Represents a customer order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: String,
    pub line_items: Vec<LineItem>,
    pub order_total: Decimal,
    pub order_date: DateTime<Utc>,
    /// `HH:MM:SS` of `order_date`.
    pub order_time: String,
    pub recipient: String,
    pub status: OrderStatus,
    pub owner_id: String,
    pub owner_display_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn total_of(items: &[LineItem]) -> Decimal {
        validation::round_money(items.iter().map(|item| item.line_total).sum())
    }

    pub fn format_time(at: &DateTime<Utc>) -> String {
        at.format("%H:%M:%S").to_string()
    }

    /// Units of `sku` this order holds across its lines.
    pub fn quantity_of(&self, sku: &str) -> u32 {
        self.line_items
            .iter()
            .filter(|item| item.sku == sku)
            .map(|item| item.quantity)
            .sum()
    }
}

/// Payload for persisting a fully priced order.
#[derive(Debug, Clone)]
pub struct OrderCreate {
    pub line_items: Vec<LineItem>,
    pub recipient: String,
    pub status: OrderStatus,
    pub owner_id: String,
    pub owner_display_name: String,
    pub placed_at: DateTime<Utc>,
}

/// Payload for updating an existing order. The total is recomputed when lines change.
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub line_items: Option<Vec<LineItem>>,
    pub recipient: Option<String>,
    pub status: Option<OrderStatus>,
}

// =============================================================================
// Requests as received from callers
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemRequest {
    pub sku: String,
    pub quantity: i64,
}

impl OrderItemRequest {
    pub fn new(sku: impl Into<String>, quantity: i64) -> Self {
        Self { sku: sku.into(), quantity }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub owner_id: String,
    pub items: Vec<OrderItemRequest>,
    pub recipient: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    pub owner_id: String,
    pub order_id: String,
    #[serde(default)]
    pub items: Option<Vec<OrderItemRequest>>,
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// A requested line after validation: SKU normalized, quantity ≥ 1,
/// duplicates merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidItem {
    pub sku: String,
    pub quantity: u32,
}

#[derive(Debug, Clone)]
pub struct ValidCreateOrder {
    pub owner_id: String,
    pub items: Vec<ValidItem>,
    pub recipient: String,
    pub status: OrderStatus,
}

#[derive(Debug, Clone)]
pub struct ValidUpdateOrder {
    pub owner_id: String,
    pub order_id: String,
    pub items: Option<Vec<ValidItem>>,
    pub recipient: Option<String>,
    pub status: Option<OrderStatus>,
}

pub fn normalize_code(sku: &str) -> String {
    sku.trim().to_uppercase()
}

fn validate_items(items: Vec<OrderItemRequest>) -> Result<Vec<ValidItem>, String> {
    if items.is_empty() {
        return Err("Order items are required".to_string());
    }
    let mut merged: Vec<ValidItem> = Vec::with_capacity(items.len());
    for item in items {
        let sku = normalize_code(&item.sku);
        if sku.is_empty() {
            return Err("Product SKU is required for every item".to_string());
        }
        if item.quantity < 1 {
            return Err(format!("Quantity for {sku} must be at least 1"));
        }
        let quantity = u32::try_from(item.quantity).map_err(|_| format!("Quantity for {sku} is too large"))?;
        match merged.iter_mut().find(|existing| existing.sku == sku) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(quantity)
                    .ok_or_else(|| format!("Quantity for {sku} is too large"))?;
            }
            None => merged.push(ValidItem { sku, quantity }),
        }
    }
    Ok(merged)
}

fn owner(owner_id: &str) -> Result<String, String> {
    let owner_id = owner_id.trim();
    if owner_id.is_empty() {
        return Err("User ID is required".to_string());
    }
    Ok(owner_id.to_string())
}

impl CreateOrderRequest {
    pub fn validate(self) -> Result<ValidCreateOrder, String> {
        let owner_id = owner(&self.owner_id)?;
        let items = validate_items(self.items)?;
        let recipient = validation::required_text(&self.recipient, "Recipient", validation::MAX_RECIPIENT_LEN)?;
        let status = self.status.as_deref().map(str::parse::<OrderStatus>).transpose()?.unwrap_or_default();
        Ok(ValidCreateOrder { owner_id, items, recipient, status })
    }
}

impl UpdateOrderRequest {
    pub fn validate(self) -> Result<ValidUpdateOrder, String> {
        let owner_id = owner(&self.owner_id)?;
        let order_id = normalize_code(&self.order_id);
        if order_id.is_empty() {
            return Err("Order ID is required".to_string());
        }
        if self.items.is_none() && self.recipient.is_none() && self.status.is_none() {
            return Err("No valid fields to update".to_string());
        }
        Ok(ValidUpdateOrder {
            owner_id,
            order_id,
            items: self.items.map(validate_items).transpose()?,
            recipient: self
                .recipient
                .map(|r| validation::required_text(&r, "Recipient", validation::MAX_RECIPIENT_LEN))
                .transpose()?,
            status: self.status.as_deref().map(str::parse::<OrderStatus>).transpose()?,
        })
    }
}
