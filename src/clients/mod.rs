//! Typed clients over the stores. Each one wraps a `ResourceClient`, adds
//! tracing and maps transport failures into its domain error.

#[macro_use]
pub mod macros;
pub mod order_client;
pub mod product_client;
pub mod user_client;

pub use order_client::OrderClient;
pub use product_client::ProductClient;
pub use user_client::UserClient;
