use anyhow::Context;
use rust_decimal::Decimal;
use tracing::{error, info, Instrument};

use inventrix::app_system::{setup_tracing, Config, InventorySystem};
use inventrix::domain::{
    CreateOrderRequest, LoginRequest, NewProductRequest, OrderItemRequest, SignupRequest, UpdateOrderRequest,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // Setup tracing once for the entire application
    setup_tracing(&config);

    info!("Starting inventrix");
    let system = InventorySystem::new(&config);

    let span = tracing::info_span!("account");
    let owner = async {
        system
            .user_client
            .signup(SignupRequest {
                full_name: "Alice Example".into(),
                email: "alice@example.com".into(),
                password: "correct horse".into(),
            })
            .await?;
        system
            .user_client
            .login(LoginRequest {
                email: "alice@example.com".into(),
                password: "correct horse".into(),
            })
            .await
    }
    .instrument(span)
    .await
    .context("account setup failed")?;
    info!(user_id = %owner.id, "Logged in");

    let product = system
        .product_client
        .create_product(
            &owner.id,
            NewProductRequest {
                name: "Ceramic Mug".into(),
                description: Some("350ml, dishwasher safe".into()),
                category: "Kitchen".into(),
                price: Decimal::new(1250, 2),
                stock: 5,
            },
        )
        .await
        .context("creating product failed")?;
    info!(sku = %product.sku, stock = product.stock, "Product ready");

    let span = tracing::info_span!("order_processing");
    let order = async {
        system
            .order_client
            .create_order(CreateOrderRequest {
                owner_id: owner.id.clone(),
                items: vec![OrderItemRequest::new(product.sku.clone(), 3)],
                recipient: "Bob Buyer".into(),
                status: None,
            })
            .await
    }
    .instrument(span)
    .await
    .context("creating order failed")?;
    info!(order = %serde_json::to_string(&order)?, "Order created");

    // Asking for more than is left is refused with the available amount.
    let refused = system
        .order_client
        .create_order(CreateOrderRequest {
            owner_id: owner.id.clone(),
            items: vec![OrderItemRequest::new(product.sku.clone(), 3)],
            recipient: "Carol Buyer".into(),
            status: None,
        })
        .await;
    if let Err(e) = refused {
        info!(error = %e, "Second order refused as expected");
    }

    let updated = system
        .order_client
        .update_order(UpdateOrderRequest {
            owner_id: owner.id.clone(),
            order_id: order.order_id.clone(),
            items: Some(vec![OrderItemRequest::new(product.sku.clone(), 5)]),
            recipient: None,
            status: Some("shipped".into()),
        })
        .await
        .context("updating order failed")?;
    info!(order_id = %updated.order_id, total = %updated.order_total, status = %updated.status, "Order updated");

    for listed in system.order_client.list_orders(&owner.id).await? {
        info!(order_id = %listed.order_id, date = %listed.order_date, time = %listed.order_time, "Listed order");
    }

    match system.order_client.delete_order(&owner.id, &updated.order_id).await {
        Ok(deleted) => info!(order_id = %deleted.order_id, active = deleted.is_active, "Order deleted"),
        Err(e) => error!(error = %e, "Deleting order failed"),
    }
    let stock = system.product_client.check_stock(&product.sku).await?;
    info!(sku = %product.sku, stock, "Stock after delete");

    // Shutdown system gracefully
    system.shutdown().await?;

    info!("Application completed successfully");
    Ok(())
}
