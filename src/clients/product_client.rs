use tracing::{debug, info, instrument, warn};

use crate::actor_framework::{FrameworkError, ResourceClient};
use crate::clients::UserClient;
use crate::domain::{normalize_code, NewProductRequest, Product, ProductPatch, ProductUpdateRequest};
use crate::product_actor::{
    Page, PageRequest, ProductAction, ProductActionResult, ProductError, ProductFilter, StockReservation,
};
use crate::sequence::{IdFormat, SequenceClient, PRODUCT_KEY};

/// Client for the product catalog and its stock.
///
/// Catalog operations take the caller's user id and only ever see that
/// user's products. The stock accessors (`find_by_id`, `reserve_stock`,
/// `restore_stock`) are unscoped; the order lifecycle checks ownership itself.
#[derive(Clone)]
pub struct ProductClient {
    inner: ResourceClient<Product>,
    sequence: SequenceClient,
    user_client: UserClient,
}

impl ProductClient {
    pub fn new(inner: ResourceClient<Product>, sequence: SequenceClient, user_client: UserClient) -> Self {
        Self { inner, sequence, user_client }
    }

    /// Adds a product to the owner's catalog under a freshly minted SKU.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_product(&self, owner_id: &str, request: NewProductRequest) -> Result<Product, ProductError> {
        let owner_name = self
            .user_client
            .display_name(owner_id)
            .await
            .map_err(|e| ProductError::ActorCommunicationError(e.to_string()))?
            .ok_or_else(|| ProductError::ValidationError(format!("User {owner_id} not found")))?;
        let params = request
            .validate(owner_id.to_string(), owner_name)
            .map_err(ProductError::ValidationError)?;

        let sku = self
            .sequence
            .next_id(PRODUCT_KEY, IdFormat::SKU)
            .await
            .map_err(|e| ProductError::SkuAllocation(e.to_string()))?;
        let product = self.inner.create(sku, params).await?;

        info!(sku = %product.sku, stock = product.stock, "Product created");
        Ok(product)
    }

    /// The owner's product, active or not.
    #[instrument(skip(self))]
    pub async fn get_owned_product(&self, owner_id: &str, sku: &str) -> Result<Product, ProductError> {
        let sku = normalize_code(sku);
        match self.get_product(sku.clone()).await? {
            Some(product) if product.owner_id == owner_id => Ok(product),
            _ => Err(ProductError::NotFound(sku)),
        }
    }

    #[instrument(skip(self, request))]
    pub async fn update_product(
        &self,
        owner_id: &str,
        sku: &str,
        request: ProductUpdateRequest,
    ) -> Result<Product, ProductError> {
        let patch = request.validate().map_err(ProductError::ValidationError)?;
        let product = self.get_owned_product(owner_id, sku).await?;
        let updated = self.inner.update(product.sku, patch).await?;
        info!(sku = %updated.sku, "Product updated");
        Ok(updated)
    }

    /// Soft delete. The record stays so existing orders can still hand stock back.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, owner_id: &str, sku: &str) -> Result<Product, ProductError> {
        let product = self.get_owned_product(owner_id, sku).await?;
        let patch = ProductPatch { is_active: Some(false), ..Default::default() };
        let deleted = self.inner.update(product.sku, patch).await?;
        info!(sku = %deleted.sku, "Product deactivated");
        Ok(deleted)
    }

    /// The owner's products matching `filter`, newest first.
    #[instrument(skip(self, filter))]
    pub async fn list_products(
        &self,
        owner_id: &str,
        filter: ProductFilter,
        page: PageRequest,
    ) -> Result<Page<Product>, ProductError> {
        let owner_id = owner_id.to_string();
        let mut products = self
            .find_products(move |p| p.owner_id == owner_id && filter.matches(p))
            .await?;
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.sku.cmp(&a.sku)));
        debug!(count = products.len(), "Products matched");
        Ok(Page::paginate(products, page))
    }

    /// Looks up a product that can still be ordered.
    ///
    /// # Errors
    /// `NotFound` when the SKU is unknown, `Inactive` when it was deleted.
    #[instrument(skip(self))]
    pub async fn find_by_id(&self, sku: &str) -> Result<Product, ProductError> {
        let sku = normalize_code(sku);
        match self.get_product(sku.clone()).await? {
            Some(product) if product.is_active => Ok(product),
            Some(_) => Err(ProductError::Inactive(sku)),
            None => Err(ProductError::NotFound(sku)),
        }
    }

    #[instrument(skip(self))]
    pub async fn check_stock(&self, sku: &str) -> Result<u32, ProductError> {
        match self.inner.perform_action(normalize_code(sku), ProductAction::CheckStock).await? {
            ProductActionResult::CheckStock(level) => Ok(level),
            other => Err(unexpected(other)),
        }
    }

    /// Takes `quantity` units if that many are left. Returns the remaining stock.
    ///
    /// # Errors
    /// `InsufficientStock` carries the product name and the amount that was
    /// available when the reservation was refused.
    #[instrument(skip(self))]
    pub async fn reserve_stock(&self, sku: &str, quantity: u32) -> Result<u32, ProductError> {
        let sku = normalize_code(sku);
        let outcome = self
            .inner
            .perform_action(sku.clone(), ProductAction::ReserveStock(quantity))
            .await
            .map_err(|e| match e {
                FrameworkError::Rejected(_) => ProductError::Inactive(sku.clone()),
                other => ProductError::from(other),
            })?;

        match outcome {
            ProductActionResult::ReserveStock(StockReservation::Reserved { remaining }) => {
                debug!(remaining, "Stock reserved");
                Ok(remaining)
            }
            ProductActionResult::ReserveStock(StockReservation::Insufficient { available }) => {
                warn!(available, requested = quantity, "Stock reservation refused");
                Err(self.shortfall(sku, available, quantity).await)
            }
            other => Err(unexpected(other)),
        }
    }

    /// Hands `quantity` units back. Works on deactivated products too.
    #[instrument(skip(self))]
    pub async fn restore_stock(&self, sku: &str, quantity: u32) -> Result<u32, ProductError> {
        match self
            .inner
            .perform_action(normalize_code(sku), ProductAction::RestoreStock(quantity))
            .await?
        {
            ProductActionResult::RestoreStock(level) => {
                debug!(level, "Stock restored");
                Ok(level)
            }
            other => Err(unexpected(other)),
        }
    }

    /// Swaps a holding of `release` units for one of `reserve` units without
    /// the released units ever reaching other buyers. Returns the stock left.
    #[instrument(skip(self))]
    pub async fn exchange_stock(&self, sku: &str, release: u32, reserve: u32) -> Result<u32, ProductError> {
        let sku = normalize_code(sku);
        let outcome = self
            .inner
            .perform_action(sku.clone(), ProductAction::Exchange { release, reserve })
            .await
            .map_err(|e| match e {
                FrameworkError::Rejected(_) if reserve > release => ProductError::Inactive(sku.clone()),
                other => ProductError::from(other),
            })?;

        match outcome {
            ProductActionResult::Exchange(StockReservation::Reserved { remaining }) => {
                debug!(remaining, "Stock exchanged");
                Ok(remaining)
            }
            ProductActionResult::Exchange(StockReservation::Insufficient { available }) => {
                warn!(available, requested = reserve, "Stock exchange refused");
                Err(self.shortfall(sku, available, reserve).await)
            }
            other => Err(unexpected(other)),
        }
    }

    async fn shortfall(&self, sku: String, available: u32, requested: u32) -> ProductError {
        match self.get_product(sku.clone()).await {
            Ok(product) => {
                let name = product.map(|p| p.name).unwrap_or(sku);
                ProductError::InsufficientStock { name, available, requested }
            }
            Err(e) => e,
        }
    }
}

fn unexpected(result: ProductActionResult) -> ProductError {
    ProductError::ActorCommunicationError(format!("Unexpected result: {result:?}"))
}

crate::impl_client_methods!(ProductClient, Product, ProductError, product);
