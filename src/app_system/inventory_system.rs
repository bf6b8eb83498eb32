use tracing::{error, info};

use super::{AppError, Config};
use crate::actor_framework::ResourceActor;
use crate::clients::{OrderClient, ProductClient, UserClient};
use crate::domain::{Order, Product, User};
use crate::sequence::{SequenceClient, SequenceService};

/// The running system: every store started, every client wired.
///
/// Stores start in dependency order (sequence, users, products, orders) and
/// stop when the last client handle for them is dropped.
pub struct InventorySystem {
    pub order_client: OrderClient,
    pub user_client: UserClient,
    pub product_client: ProductClient,
    pub sequence_client: SequenceClient,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl InventorySystem {
    pub fn new(config: &Config) -> Self {
        let buffer = config.channel_buffer;

        let (sequence_service, sequence_client) = SequenceService::new(buffer, config.sequence_start);
        let sequence_handle = tokio::spawn(sequence_service.run());

        let (user_actor, user_resource_client) = ResourceActor::<User>::new(buffer);
        let user_client = UserClient::new(user_resource_client);
        let user_handle = tokio::spawn(user_actor.run());

        let (product_actor, product_resource_client) = ResourceActor::<Product>::new(buffer);
        let product_client = ProductClient::new(product_resource_client, sequence_client.clone(), user_client.clone());
        let product_handle = tokio::spawn(product_actor.run());

        let (order_actor, order_resource_client) = ResourceActor::<Order>::new(buffer);
        let order_client = OrderClient::new(
            order_resource_client,
            user_client.clone(),
            product_client.clone(),
            sequence_client.clone(),
        );
        let order_handle = tokio::spawn(order_actor.run());

        info!(buffer, sequence_start = config.sequence_start, "Inventory system started");

        Self {
            order_client,
            user_client,
            product_client,
            sequence_client,
            handles: vec![order_handle, product_handle, user_handle, sequence_handle],
        }
    }

    /// Drops every client so the stores' channels close, then waits for the
    /// store tasks to finish. Clones handed out elsewhere keep their stores
    /// alive until they are dropped too.
    pub async fn shutdown(self) -> Result<(), AppError> {
        info!("Shutting down system...");
        drop(self.order_client);
        drop(self.product_client);
        drop(self.user_client);
        drop(self.sequence_client);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Actor task failed");
                return Err(AppError::Shutdown(e.to_string()));
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}
