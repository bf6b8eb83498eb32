//! # Mock Framework
//!
//! Utilities for testing clients in isolation.
//!
//! Use [`create_mock_client`] (or [`create_mock_sequence`]) to get a client and
//! a receiver. Then use helpers like [`expect_get`] or [`expect_action`] to
//! assert what the client sent and decide what it gets back.

use tokio::sync::{mpsc, oneshot};

use crate::actor_framework::{Entity, FrameworkError, Response, ResourceClient, ResourceRequest};
use crate::app_system::SequenceError;
use crate::sequence::{SequenceClient, SequenceRequest};

/// Creates a mock client and a receiver for asserting requests.
///
/// The client talks to a channel the test controls instead of a running
/// `ResourceActor`, so the test can answer each request (success, failure,
/// stale data) deterministically.
pub fn create_mock_client<T: Entity>(buffer_size: usize) -> (ResourceClient<T>, mpsc::Receiver<ResourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}

pub fn create_mock_sequence(buffer_size: usize) -> (SequenceClient, mpsc::Receiver<SequenceRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (SequenceClient::new(sender), receiver)
}

/// Helper to verify that the next message is a Create request
pub async fn expect_create<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, T::CreateParams, Response<T>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Create { id, params, respond_to }) => Some((id, params, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Get request
pub async fn expect_get<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, Response<Option<T>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Get { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Delete request
pub async fn expect_delete<T: Entity>(receiver: &mut mpsc::Receiver<ResourceRequest<T>>) -> Option<(T::Id, Response<T>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Delete { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is an Action request
pub async fn expect_action<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, T::Action, Response<T::ActionResult>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Action { id, action, respond_to }) => Some((id, action, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message asks for a sequence value
pub async fn expect_next_value(
    receiver: &mut mpsc::Receiver<SequenceRequest>,
) -> Option<(String, oneshot::Sender<Result<u64, SequenceError>>)> {
    match receiver.recv().await {
        Some(SequenceRequest::NextValue { key, respond_to }) => Some((key, respond_to)),
        _ => None,
    }
}

/// Fails a pending request the way a crashed store would.
pub fn respond_closed<R>(respond_to: Response<R>) {
    let _ = respond_to.send(Err(FrameworkError::ActorClosed));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::clients::{OrderClient, ProductClient, UserClient};
    use crate::domain::{
        CreateOrderRequest, LineItem, Order, OrderCreate, OrderItemRequest, OrderStatus, Product, Role, User,
    };
    use crate::order_actor::{OrderAction, OrderActionResult, OrderError};
    use crate::product_actor::{ProductAction, ProductActionResult, StockReservation};
    use crate::sequence::ORDER_KEY;

    fn owner() -> User {
        let now = Utc::now();
        User {
            id: "u1".into(),
            full_name: "Alice".into(),
            email: "alice@example.com".into(),
            password_hash: String::new(),
            role: Role::User,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn mug(stock: u32) -> Product {
        let now = Utc::now();
        Product {
            sku: "PROD00001".into(),
            name: "Mug".into(),
            description: None,
            category: "Kitchen".into(),
            price: Decimal::new(1000, 2),
            stock,
            is_active: true,
            owner_id: "u1".into(),
            owner_name: "Alice".into(),
            created_at: now,
            updated_at: now,
        }
    }

    fn placed_order() -> Order {
        Order::from_create_params(
            "ORD000001".into(),
            OrderCreate {
                line_items: vec![LineItem::new("PROD00001", "Mug", Decimal::new(1000, 2), 3)],
                recipient: "Bob".into(),
                status: OrderStatus::Confirmed,
                owner_id: "u1".into(),
                owner_display_name: "Alice".into(),
                placed_at: Utc::now(),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_mock_client() {
        let (client, mut receiver) = create_mock_client::<Product>(10);

        let get_task = tokio::spawn(async move { client.get("PROD00001".to_string()).await });

        let (id, responder) = expect_get(&mut receiver).await.expect("Expected Get request");
        assert_eq!(id, "PROD00001");
        responder.send(Ok(Some(mug(3)))).unwrap();

        let result = get_task.await.unwrap();
        assert_eq!(result.unwrap().map(|p| p.stock), Some(3));
    }

    /// A reservation that loses a race after the order was stored must remove
    /// the order again and report the shortfall.
    #[tokio::test]
    async fn test_create_order_rolls_back_when_reservation_loses_race() {
        let (user_inner, mut users) = create_mock_client::<User>(10);
        let (product_inner, mut products) = create_mock_client::<Product>(10);
        let (order_inner, mut orders) = create_mock_client::<Order>(10);
        let (sequence, mut sequence_requests) = create_mock_sequence(10);

        let user_client = UserClient::new(user_inner);
        let product_client = ProductClient::new(product_inner, sequence.clone(), user_client.clone());
        let order_client = OrderClient::new(order_inner, user_client, product_client, sequence);

        let create_task = tokio::spawn(async move {
            order_client
                .create_order(CreateOrderRequest {
                    owner_id: "u1".into(),
                    items: vec![OrderItemRequest::new("PROD00001", 3)],
                    recipient: "Bob".into(),
                    status: None,
                })
                .await
        });

        let (_, respond) = expect_get(&mut users).await.expect("owner lookup");
        respond.send(Ok(Some(owner()))).unwrap();

        // The advisory check still sees enough stock.
        let (sku, respond) = expect_get(&mut products).await.expect("product lookup");
        assert_eq!(sku, "PROD00001");
        respond.send(Ok(Some(mug(5)))).unwrap();

        let (key, respond) = expect_next_value(&mut sequence_requests).await.expect("order id");
        assert_eq!(key, ORDER_KEY);
        respond.send(Ok(7)).unwrap();

        let (id, params, respond) = expect_create(&mut orders).await.expect("order persisted");
        assert_eq!(id, "ORD000007");
        let stored = Order::from_create_params(id, params).unwrap();
        respond.send(Ok(stored.clone())).unwrap();

        // Someone else took the stock in between.
        let (_, action, respond) = expect_action(&mut products).await.expect("reservation");
        assert!(matches!(action, ProductAction::ReserveStock(3)));
        respond
            .send(Ok(ProductActionResult::ReserveStock(StockReservation::Insufficient { available: 1 })))
            .unwrap();
        let (_, respond) = expect_get(&mut products).await.expect("name lookup");
        respond.send(Ok(Some(mug(1)))).unwrap();

        let (deleted, respond) = expect_delete(&mut orders).await.expect("order removed");
        assert_eq!(deleted, "ORD000007");
        respond.send(Ok(stored)).unwrap();

        let result = create_task.await.unwrap();
        assert_eq!(
            result,
            Err(OrderError::InsufficientStock { product_name: "Mug".into(), available: 1, requested: 3 })
        );
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_as_internal() {
        let (user_inner, mut users) = create_mock_client::<User>(10);
        let (product_inner, _products) = create_mock_client::<Product>(10);
        let (order_inner, _orders) = create_mock_client::<Order>(10);
        let (sequence, _sequence_requests) = create_mock_sequence(10);

        let user_client = UserClient::new(user_inner);
        let product_client = ProductClient::new(product_inner, sequence.clone(), user_client.clone());
        let order_client = OrderClient::new(order_inner, user_client, product_client, sequence);

        let create_task = tokio::spawn(async move {
            order_client
                .create_order(CreateOrderRequest {
                    owner_id: "u1".into(),
                    items: vec![OrderItemRequest::new("PROD00001", 1)],
                    recipient: "Bob".into(),
                    status: None,
                })
                .await
        });

        let (_, respond) = expect_get(&mut users).await.expect("owner lookup");
        respond_closed(respond);

        let err = create_task.await.unwrap().unwrap_err();
        assert_eq!(err, OrderError::Internal);
        assert_eq!(err.to_string(), "An internal error occurred");
    }

    /// A delete whose stock restore fails must leave the order active, so a
    /// retry still hands the stock back.
    #[tokio::test]
    async fn test_delete_keeps_order_active_when_restore_fails() {
        let (user_inner, _users) = create_mock_client::<User>(10);
        let (product_inner, mut products) = create_mock_client::<Product>(10);
        let (order_inner, mut orders) = create_mock_client::<Order>(10);
        let (sequence, _sequence_requests) = create_mock_sequence(10);

        let user_client = UserClient::new(user_inner);
        let product_client = ProductClient::new(product_inner, sequence.clone(), user_client.clone());
        let order_client = OrderClient::new(order_inner, user_client, product_client, sequence);

        let client = order_client.clone();
        let delete_task = tokio::spawn(async move { client.delete_order("u1", "ord000001").await });

        let (id, respond) = expect_get(&mut orders).await.expect("order lookup");
        assert_eq!(id, "ORD000001");
        respond.send(Ok(Some(placed_order()))).unwrap();

        let (sku, action, respond) = expect_action(&mut products).await.expect("stock restore");
        assert_eq!(sku, "PROD00001");
        assert!(matches!(action, ProductAction::RestoreStock(3)));
        respond_closed(respond);

        assert_eq!(delete_task.await.unwrap(), Err(OrderError::Internal));
        assert!(orders.try_recv().is_err(), "order must not be deactivated");

        // The retry finds the order still active and restores its stock.
        let delete_task = tokio::spawn(async move { order_client.delete_order("u1", "ORD000001").await });

        let (_, respond) = expect_get(&mut orders).await.expect("order lookup");
        respond.send(Ok(Some(placed_order()))).unwrap();

        let (_, action, respond) = expect_action(&mut products).await.expect("stock restore");
        assert!(matches!(action, ProductAction::RestoreStock(3)));
        respond.send(Ok(ProductActionResult::RestoreStock(5))).unwrap();

        let (_, action, respond) = expect_action(&mut orders).await.expect("deactivation");
        assert!(matches!(action, OrderAction::Deactivate));
        respond.send(Ok(OrderActionResult::Deactivated(true))).unwrap();

        let mut deleted = placed_order();
        deleted.is_active = false;
        let (_, respond) = expect_get(&mut orders).await.expect("final read");
        respond.send(Ok(Some(deleted))).unwrap();

        let result = delete_task.await.unwrap().unwrap();
        assert!(!result.is_active);
    }
}
