use chrono::Utc;

use super::actions::{ProductAction, ProductActionResult, StockReservation};
use crate::actor_framework::Entity;
use crate::domain::{Product, ProductCreate, ProductPatch};
use crate::validation;

impl Entity for Product {
    const KIND: &'static str = "Product";

    type Id = String;
    type CreateParams = ProductCreate;
    type Patch = ProductPatch;
    type Action = ProductAction;
    type ActionResult = ProductActionResult;

    fn id(&self) -> &String {
        &self.sku
    }

    /// Creates a new Product under the SKU minted by the caller.
    ///
    /// # Notes
    /// New products are always active.
    fn from_create_params(sku: String, params: ProductCreate) -> Result<Self, String> {
        let now = Utc::now();
        Ok(Self {
            sku: sku.to_uppercase(),
            name: validation::required_text(&params.name, "Name", validation::MAX_PRODUCT_NAME_LEN)?,
            description: validation::optional_text(
                params.description.as_deref(),
                "Description",
                validation::MAX_DESCRIPTION_LEN,
            )?,
            category: validation::required_text(&params.category, "Category", validation::MAX_CATEGORY_LEN)?,
            price: validation::price(params.price)?,
            stock: params.stock,
            is_active: true,
            owner_id: params.owner_id,
            owner_name: params.owner_name,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies catalog edits. Price changes never touch existing orders,
    /// which keep their own copy of the unit price.
    fn on_update(&mut self, patch: ProductPatch) -> Result<(), String> {
        if let Some(name) = patch.name {
            self.name = validation::required_text(&name, "Name", validation::MAX_PRODUCT_NAME_LEN)?;
        }
        if let Some(description) = patch.description {
            self.description =
                validation::optional_text(description.as_deref(), "Description", validation::MAX_DESCRIPTION_LEN)?;
        }
        if let Some(category) = patch.category {
            self.category = validation::required_text(&category, "Category", validation::MAX_CATEGORY_LEN)?;
        }
        if let Some(price) = patch.price {
            self.price = validation::price(price)?;
        }
        if let Some(stock) = patch.stock {
            self.stock = stock;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Handles stock actions.
    ///
    /// # Errors
    /// Reserving against an inactive product and restoring past `u32::MAX` fail.
    /// An exchange on an inactive product only fails when it takes more than it
    /// hands back.
    fn handle_action(&mut self, action: ProductAction) -> Result<ProductActionResult, String> {
        match action {
            ProductAction::CheckStock => Ok(ProductActionResult::CheckStock(self.stock)),
            ProductAction::ReserveStock(amount) => {
                if !self.is_active {
                    return Err(format!("Product {} is no longer available", self.sku));
                }
                let outcome = match self.stock.checked_sub(amount) {
                    Some(remaining) => {
                        self.stock = remaining;
                        self.updated_at = Utc::now();
                        StockReservation::Reserved { remaining }
                    }
                    None => StockReservation::Insufficient { available: self.stock },
                };
                Ok(ProductActionResult::ReserveStock(outcome))
            }
            ProductAction::RestoreStock(amount) => {
                self.stock = self
                    .stock
                    .checked_add(amount)
                    .ok_or_else(|| format!("Stock for {} would overflow", self.sku))?;
                self.updated_at = Utc::now();
                Ok(ProductActionResult::RestoreStock(self.stock))
            }
            ProductAction::Exchange { release, reserve } => {
                if reserve > release && !self.is_active {
                    return Err(format!("Product {} is no longer available", self.sku));
                }
                let pool = self
                    .stock
                    .checked_add(release)
                    .ok_or_else(|| format!("Stock for {} would overflow", self.sku))?;
                let outcome = match pool.checked_sub(reserve) {
                    Some(remaining) => {
                        self.stock = remaining;
                        self.updated_at = Utc::now();
                        StockReservation::Reserved { remaining }
                    }
                    None => StockReservation::Insufficient { available: pool },
                };
                Ok(ProductActionResult::Exchange(outcome))
            }
        }
    }
}
