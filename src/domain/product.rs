use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::validation;

/// Represents a catalog entry. Identified by its SKU and owned by one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub price: Decimal,
    pub stock: u32,
    pub is_active: bool,
    pub owner_id: String,
    pub owner_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated catalog fields plus the owner they are filed under.
#[derive(Debug, Clone)]
pub struct ProductCreate {
    pub owner_id: String,
    pub owner_name: String,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub price: Decimal,
    pub stock: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<u32>,
    pub is_active: Option<bool>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        *self == ProductPatch::default()
    }
}

/// New catalog entry as received from a caller.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: String,
    pub price: Decimal,
    pub stock: i64,
}

/// Catalog edit as received from a caller. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i64>,
    pub is_active: Option<bool>,
}

fn stock(value: i64) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| "Stock must be a valid non-negative integer".to_string())
}

impl NewProductRequest {
    pub fn validate(self, owner_id: String, owner_name: String) -> Result<ProductCreate, String> {
        Ok(ProductCreate {
            owner_id,
            owner_name,
            name: validation::required_text(&self.name, "Name", validation::MAX_PRODUCT_NAME_LEN)?,
            description: validation::optional_text(
                self.description.as_deref(),
                "Description",
                validation::MAX_DESCRIPTION_LEN,
            )?,
            category: validation::required_text(&self.category, "Category", validation::MAX_CATEGORY_LEN)?,
            price: validation::price(self.price)?,
            stock: stock(self.stock)?,
        })
    }
}

impl ProductUpdateRequest {
    pub fn validate(self) -> Result<ProductPatch, String> {
        let patch = ProductPatch {
            name: self
                .name
                .map(|v| validation::required_text(&v, "Name", validation::MAX_PRODUCT_NAME_LEN))
                .transpose()?,
            description: self
                .description
                .map(|v| validation::optional_text(Some(&v), "Description", validation::MAX_DESCRIPTION_LEN))
                .transpose()?,
            category: self
                .category
                .map(|v| validation::required_text(&v, "Category", validation::MAX_CATEGORY_LEN))
                .transpose()?,
            price: self.price.map(validation::price).transpose()?,
            stock: self.stock.map(stock).transpose()?,
            is_active: self.is_active,
        };
        if patch.is_empty() {
            return Err("No valid fields to update".to_string());
        }
        Ok(patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> NewProductRequest {
        NewProductRequest {
            name: " Desk Lamp ".into(),
            description: Some("  ".into()),
            category: "Lighting".into(),
            price: Decimal::new(1999, 2),
            stock: 4,
        }
    }

    #[test]
    fn test_new_product_validation() {
        let create = request().validate("u1".into(), "Owner".into()).unwrap();
        assert_eq!(create.name, "Desk Lamp");
        assert_eq!(create.description, None);
        assert_eq!(create.stock, 4);

        let negative = NewProductRequest { stock: -1, ..request() };
        assert!(negative.validate("u1".into(), "Owner".into()).unwrap_err().contains("Stock"));

        let precise = NewProductRequest { price: Decimal::new(19999, 3), ..request() };
        assert!(precise.validate("u1".into(), "Owner".into()).is_err());
    }

    #[test]
    fn test_update_requires_a_field() {
        assert_eq!(
            ProductUpdateRequest::default().validate().unwrap_err(),
            "No valid fields to update"
        );
        let patch = ProductUpdateRequest { description: Some(String::new()), ..Default::default() }
            .validate()
            .unwrap();
        assert_eq!(patch.description, Some(None));
    }
}
