/// Custom actions for Product entities.
///
/// These actions represent domain-specific operations that can be performed
/// on a product beyond standard CRUD operations. Each one runs inside the
/// product store's task, so the check and the mutation cannot interleave
/// with another request.
#[derive(Debug, Clone)]
pub enum ProductAction {
    /// Reads the current stock level without modifying it.
    CheckStock,
    /// Decrements stock by the given amount, but only if that much is left.
    ReserveStock(u32),
    /// Increments stock by the given amount (an order line being released).
    RestoreStock(u32),
    /// Hands `release` units back and takes `reserve` units in one step. The
    /// reservation is checked against stock plus `release`, and a shortfall
    /// leaves the level unchanged.
    Exchange { release: u32, reserve: u32 },
}

/// Results from ProductActions - variants match 1:1 with ProductAction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductActionResult {
    CheckStock(u32),
    ReserveStock(StockReservation),
    /// Stock level after the restore.
    RestoreStock(u32),
    Exchange(StockReservation),
}

/// Outcome of a conditional decrement. A shortfall is a normal answer, not an
/// error, so the caller gets the available amount back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockReservation {
    Reserved { remaining: u32 },
    Insufficient { available: u32 },
}
