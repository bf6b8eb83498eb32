/// Custom actions for Order entities.
#[derive(Debug, Clone)]
pub enum OrderAction {
    /// Soft delete. Reports whether this call is the one that flipped the flag,
    /// so stock is released exactly once.
    Deactivate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderActionResult {
    Deactivated(bool),
}
