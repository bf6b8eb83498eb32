use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{error, info, instrument, warn};

use crate::actor_framework::ResourceClient;
use crate::clients::{ProductClient, UserClient};
use crate::domain::{
    normalize_code, CreateOrderRequest, LineItem, Order, OrderCreate, OrderPatch, UpdateOrderRequest, ValidItem,
    ValidUpdateOrder,
};
use crate::order_actor::{OrderAction, OrderActionResult, OrderError};
use crate::product_actor::ProductError;
use crate::sequence::{IdFormat, SequenceClient, ORDER_KEY};

/// Client for the order store.
///
/// This is the one place where orders and catalog stock meet: it prices
/// orders, mints their ids and keeps product stock in step with every
/// create, update and delete. Updates and deletes of the same order are
/// serialized; different orders proceed in parallel and rely on the
/// product store's conditional reserve for stock safety.
#[derive(Clone)]
pub struct OrderClient {
    inner: ResourceClient<Order>,
    user_client: UserClient,
    product_client: ProductClient,
    sequence: SequenceClient,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl OrderClient {
    pub fn new(
        inner: ResourceClient<Order>,
        user_client: UserClient,
        product_client: ProductClient,
        sequence: SequenceClient,
    ) -> Self {
        Self {
            inner,
            user_client,
            product_client,
            sequence,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Validates, prices, persists and then reserves stock for a new order.
    ///
    /// If a reservation loses a race after the order was stored, the lines
    /// already reserved are handed back and the order is removed again.
    #[instrument(skip(self, request), fields(owner_id = %request.owner_id, order_id = tracing::field::Empty))]
    pub async fn create_order(&self, request: CreateOrderRequest) -> Result<Order, OrderError> {
        info!("Processing create_order request");
        let request = request.validate().map_err(OrderError::ValidationError)?;
        let owner_display_name = self.owner_display_name(&request.owner_id).await?;
        let line_items = self.price_items(&request.owner_id, &request.items, None).await?;

        let order_id = self.sequence.next_id(ORDER_KEY, IdFormat::ORDER).await?;
        tracing::Span::current().record("order_id", order_id.as_str());

        let payload = OrderCreate {
            line_items,
            recipient: request.recipient,
            status: request.status,
            owner_id: request.owner_id,
            owner_display_name,
            placed_at: Utc::now(),
        };
        let order = self.inner.create(order_id, payload).await?;

        if let Err(e) = self.reserve_lines(&order.line_items).await {
            warn!(error = %e, "Stock reservation failed, removing order");
            if let Err(cleanup) = self.inner.delete(order.order_id.clone()).await {
                error!(error = %cleanup, "Failed to remove order after reservation failure");
            }
            return Err(e);
        }

        info!(total = %order.order_total, "Order created");
        Ok(order)
    }

    /// Changes an order's items, recipient or status.
    ///
    /// New items are checked against stock that already includes this
    /// order's old quantities. Each product's holding is swapped in a single
    /// store action, so units this order gives up are never visible to other
    /// buyers while the update can still fail. On failure the stored order
    /// is left untouched.
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    pub async fn update_order(&self, request: UpdateOrderRequest) -> Result<Order, OrderError> {
        let request = request.validate().map_err(OrderError::ValidationError)?;
        let order_id = request.order_id.clone();

        let guard = self.lock_order(&order_id).await;
        let result = self.update_locked(request).await;
        drop(guard);
        self.unlock_order(&order_id);
        result
    }

    async fn update_locked(&self, request: ValidUpdateOrder) -> Result<Order, OrderError> {
        let existing = self.load_owned(&request.owner_id, &request.order_id).await?;
        if !existing.is_active {
            return Err(OrderError::order_not_found(&existing.order_id));
        }

        let mut patch = OrderPatch {
            line_items: None,
            recipient: request.recipient,
            status: request.status,
        };

        let Some(items) = request.items else {
            let updated = self.inner.update(existing.order_id, patch).await?;
            info!("Order updated");
            return Ok(updated);
        };

        let new_lines = self.price_items(&request.owner_id, &items, Some(&existing)).await?;
        let (draws, returns): (Vec<_>, Vec<_>) = stock_exchanges(&existing.line_items, &new_lines)
            .into_iter()
            .partition(StockExchange::draws);
        self.apply_draws(&draws).await?;

        patch.line_items = Some(new_lines);
        let updated = match self.inner.update(existing.order_id, patch).await {
            Ok(updated) => updated,
            Err(e) => {
                self.settle(&inverses(&draws), "stock exchange undo").await?;
                return Err(e.into());
            }
        };
        self.settle(&returns, "stock return").await?;

        info!(total = %updated.order_total, "Order updated with new items");
        Ok(updated)
    }

    /// Soft-deletes an order and hands its stock back.
    ///
    /// Deleting an already deleted order succeeds without touching stock.
    #[instrument(skip(self))]
    pub async fn delete_order(&self, owner_id: &str, order_id: &str) -> Result<Order, OrderError> {
        let order_id = normalize_code(order_id);
        let guard = self.lock_order(&order_id).await;
        let result = self.delete_locked(owner_id, &order_id).await;
        drop(guard);
        self.unlock_order(&order_id);
        result
    }

    /// Stock goes back before the order is deactivated, so a failed restore
    /// leaves an active order that a retry can delete again.
    async fn delete_locked(&self, owner_id: &str, order_id: &str) -> Result<Order, OrderError> {
        let order = self.load_owned(owner_id, order_id).await?;
        if !order.is_active {
            info!("Order was already deleted");
            return Ok(order);
        }

        self.release_lines(&order.line_items).await?;
        match self.inner.perform_action(order.order_id.clone(), OrderAction::Deactivate).await {
            Ok(OrderActionResult::Deactivated(true)) => info!("Order deleted and stock restored"),
            Ok(OrderActionResult::Deactivated(false)) => warn!("Order was deactivated outside the order lock"),
            Err(e) => {
                warn!(error = %e, "Deactivation failed, re-reserving stock");
                self.reserve_lines(&order.line_items)
                    .await
                    .map_err(|undo| OrderError::internal("stock re-reserve", undo))?;
                return Err(e.into());
            }
        }

        self.inner
            .get(order.order_id.clone())
            .await?
            .ok_or_else(|| OrderError::order_not_found(&order.order_id))
    }

    /// One of the owner's orders, deleted or not.
    #[instrument(skip(self))]
    pub async fn get_order(&self, owner_id: &str, order_id: &str) -> Result<Order, OrderError> {
        self.load_owned(owner_id, &normalize_code(order_id)).await
    }

    /// The owner's active orders, most recent first.
    #[instrument(skip(self))]
    pub async fn list_orders(&self, owner_id: &str) -> Result<Vec<Order>, OrderError> {
        let owner_id = owner_id.to_string();
        let mut orders = self.find_orders(move |o| o.is_active && o.owner_id == owner_id).await?;
        orders.sort_by(|a, b| {
            b.order_date
                .cmp(&a.order_date)
                .then_with(|| b.order_id.cmp(&a.order_id))
        });
        Ok(orders)
    }

    async fn load_owned(&self, owner_id: &str, order_id: &str) -> Result<Order, OrderError> {
        match self.inner.get(order_id.to_string()).await? {
            Some(order) if order.owner_id == owner_id => Ok(order),
            Some(_) => {
                warn!(order_id, "Order belongs to another user");
                Err(OrderError::order_not_found(order_id))
            }
            None => Err(OrderError::order_not_found(order_id)),
        }
    }

    async fn owner_display_name(&self, owner_id: &str) -> Result<String, OrderError> {
        self.user_client
            .display_name(owner_id)
            .await
            .map_err(|e| OrderError::internal("user store", e))?
            .ok_or_else(|| OrderError::ValidationError(format!("User {owner_id} not found")))
    }

    /// Looks up each of the owner's products and freezes its name and current
    /// price into a line. Another user's product reads as missing.
    ///
    /// The stock comparison here is advisory; the reservation decides. Units
    /// already held by `held` count as available.
    async fn price_items(
        &self,
        owner_id: &str,
        items: &[ValidItem],
        held: Option<&Order>,
    ) -> Result<Vec<LineItem>, OrderError> {
        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            let product = self.product_client.find_by_id(&item.sku).await?;
            if product.owner_id != owner_id {
                warn!(sku = %product.sku, "Product belongs to another user");
                return Err(OrderError::product_not_found(&item.sku));
            }
            let available = product
                .stock
                .saturating_add(held.map_or(0, |order| order.quantity_of(&product.sku)));
            if available < item.quantity {
                warn!(sku = %product.sku, available, requested = item.quantity, "Insufficient stock");
                return Err(OrderError::InsufficientStock {
                    product_name: product.name,
                    available,
                    requested: item.quantity,
                });
            }
            lines.push(LineItem::new(product.sku, product.name, product.price, item.quantity));
        }
        Ok(lines)
    }

    /// Reserves every line or none of them.
    async fn reserve_lines(&self, lines: &[LineItem]) -> Result<(), OrderError> {
        for (done, line) in lines.iter().enumerate() {
            if let Err(e) = self.product_client.reserve_stock(&line.sku, line.quantity).await {
                if let Err(undo) = self.release_lines(&lines[..done]).await {
                    error!(error = %undo, "Failed to release partially reserved lines");
                }
                return Err(e.into());
            }
        }
        Ok(())
    }

    /// Restores every line or none of them.
    async fn release_lines(&self, lines: &[LineItem]) -> Result<(), OrderError> {
        for (done, line) in lines.iter().enumerate() {
            if let Err(e) = self.product_client.restore_stock(&line.sku, line.quantity).await {
                for undone in &lines[..done] {
                    if let Err(undo) = self.product_client.reserve_stock(&undone.sku, undone.quantity).await {
                        error!(sku = %undone.sku, error = %undo, "Failed to re-reserve after restore failure");
                    }
                }
                return Err(OrderError::internal("stock restore", e));
            }
        }
        Ok(())
    }

    /// Applies exchanges that take stock, all of them or none. Undoing one
    /// only hands units back, so the undo cannot be refused for lack of stock.
    async fn apply_draws(&self, draws: &[StockExchange]) -> Result<(), OrderError> {
        for (done, exchange) in draws.iter().enumerate() {
            if let Err(e) = self.exchange(exchange).await {
                self.settle(&inverses(&draws[..done]), "stock exchange undo").await?;
                return Err(e.into());
            }
        }
        Ok(())
    }

    /// Applies exchanges that never take more than they give back. Every one
    /// is attempted; any failure is a store fault and reported as internal.
    async fn settle(&self, exchanges: &[StockExchange], context: &str) -> Result<(), OrderError> {
        let mut failed = None;
        for exchange in exchanges {
            if let Err(e) = self.exchange(exchange).await {
                error!(sku = %exchange.sku, error = %e, context, "Stock exchange failed");
                failed.get_or_insert(e);
            }
        }
        match failed {
            Some(e) => Err(OrderError::internal(context, e)),
            None => Ok(()),
        }
    }

    async fn exchange(&self, exchange: &StockExchange) -> Result<u32, ProductError> {
        self.product_client
            .exchange_stock(&exchange.sku, exchange.release, exchange.reserve)
            .await
    }

    async fn lock_order(&self, order_id: &str) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(order_id.to_string()).or_default().value().clone();
        lock.lock_owned().await
    }

    fn unlock_order(&self, order_id: &str) {
        self.locks.remove_if(order_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

crate::impl_query_method!(OrderClient, Order, OrderError, order);

/// One product's change in holding when an order's lines are replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StockExchange {
    sku: String,
    release: u32,
    reserve: u32,
}

impl StockExchange {
    fn draws(&self) -> bool {
        self.reserve > self.release
    }

    fn inverse(&self) -> Self {
        Self {
            sku: self.sku.clone(),
            release: self.reserve,
            reserve: self.release,
        }
    }
}

fn inverses(exchanges: &[StockExchange]) -> Vec<StockExchange> {
    exchanges.iter().map(StockExchange::inverse).collect()
}

/// Per-product differences between two line sets, skipping unchanged ones.
fn stock_exchanges(old: &[LineItem], new: &[LineItem]) -> Vec<StockExchange> {
    let mut exchanges: Vec<StockExchange> = Vec::new();
    for (line, is_new) in old.iter().map(|l| (l, false)).chain(new.iter().map(|l| (l, true))) {
        let index = match exchanges.iter().position(|x| x.sku == line.sku) {
            Some(index) => index,
            None => {
                exchanges.push(StockExchange { sku: line.sku.clone(), release: 0, reserve: 0 });
                exchanges.len() - 1
            }
        };
        let entry = &mut exchanges[index];
        if is_new {
            entry.reserve += line.quantity;
        } else {
            entry.release += line.quantity;
        }
    }
    exchanges.retain(|x| x.release != x.reserve);
    exchanges
}
