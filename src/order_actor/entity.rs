use chrono::Utc;

use super::actions::{OrderAction, OrderActionResult};
use crate::actor_framework::Entity;
use crate::domain::{LineItem, Order, OrderCreate, OrderPatch};
use crate::validation;

/// Re-derive every line total from unit price and quantity so a stored order
/// can never carry a total that disagrees with its lines.
fn reprice(items: Vec<LineItem>) -> Result<Vec<LineItem>, String> {
    if items.is_empty() {
        return Err("Order must contain at least one item".to_string());
    }
    items
        .into_iter()
        .map(|item| -> Result<LineItem, String> {
            validation::quantity(item.quantity)?;
            Ok(LineItem::new(item.sku, item.product_name, item.unit_price, item.quantity))
        })
        .collect()
}

impl Entity for Order {
    const KIND: &'static str = "Order";

    type Id = String;
    type CreateParams = OrderCreate;
    type Patch = OrderPatch;
    type Action = OrderAction;
    type ActionResult = OrderActionResult;

    fn id(&self) -> &String {
        &self.order_id
    }

    /// Creates a new Order from priced lines.
    ///
    /// # Notes
    /// `order_date`, `order_time` and both timestamps come from `placed_at`.
    fn from_create_params(order_id: String, params: OrderCreate) -> Result<Self, String> {
        let line_items = reprice(params.line_items)?;
        Ok(Self {
            order_id: order_id.to_uppercase(),
            order_total: Order::total_of(&line_items),
            line_items,
            order_date: params.placed_at,
            order_time: Order::format_time(&params.placed_at),
            recipient: validation::required_text(&params.recipient, "Recipient", validation::MAX_RECIPIENT_LEN)?,
            status: params.status,
            owner_id: params.owner_id,
            owner_display_name: params.owner_display_name,
            is_active: true,
            created_at: params.placed_at,
            updated_at: params.placed_at,
        })
    }

    /// Updates lines, recipient and status. The total is recomputed whenever
    /// lines are replaced.
    fn on_update(&mut self, patch: OrderPatch) -> Result<(), String> {
        if !self.is_active {
            return Err(format!("Order {} has been deleted", self.order_id));
        }
        if let Some(items) = patch.line_items {
            self.line_items = reprice(items)?;
            self.order_total = Order::total_of(&self.line_items);
        }
        if let Some(recipient) = patch.recipient {
            self.recipient = validation::required_text(&recipient, "Recipient", validation::MAX_RECIPIENT_LEN)?;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    fn handle_action(&mut self, action: OrderAction) -> Result<OrderActionResult, String> {
        match action {
            OrderAction::Deactivate => {
                let changed = self.is_active;
                if changed {
                    self.is_active = false;
                    self.updated_at = Utc::now();
                }
                Ok(OrderActionResult::Deactivated(changed))
            }
        }
    }
}
