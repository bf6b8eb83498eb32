//! Sequence generator: named monotonic counters used to mint SKUs and order ids.
//!
//! A single task owns every counter, so `next_value` is an increment-and-fetch
//! with no window between the read and the write, however many callers race
//! on the same key.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument};

use crate::app_system::SequenceError;

/// Counter key for product SKUs.
pub const PRODUCT_KEY: &str = "productId";
/// Counter key for order ids.
pub const ORDER_KEY: &str = "orderId";

pub type ServiceResponse<T> = oneshot::Sender<Result<T, SequenceError>>;

/// How a counter value is rendered into a human-readable identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdFormat {
    pub prefix: &'static str,
    pub width: usize,
}

impl IdFormat {
    pub const SKU: IdFormat = IdFormat { prefix: "PROD", width: 5 };
    pub const ORDER: IdFormat = IdFormat { prefix: "ORD", width: 6 };

    /// Zero-pads to the configured width; wider values are printed in full.
    pub fn render(&self, value: u64) -> String {
        format!("{}{:0width$}", self.prefix, value, width = self.width)
    }
}

#[derive(Debug)]
pub enum SequenceRequest {
    NextValue {
        key: String,
        respond_to: ServiceResponse<u64>,
    },
    CurrentValue {
        key: String,
        respond_to: ServiceResponse<Option<u64>>,
    },
}

pub struct SequenceService {
    receiver: mpsc::Receiver<SequenceRequest>,
    counters: HashMap<String, u64>,
    start_value: u64,
}

impl SequenceService {
    pub fn new(buffer_size: usize, start_value: u64) -> (Self, SequenceClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let service = Self {
            receiver,
            counters: HashMap::new(),
            start_value,
        };
        (service, SequenceClient::new(sender))
    }

    #[instrument(name = "sequence_service", skip(self), fields(start_value = self.start_value))]
    pub async fn run(mut self) {
        info!("SequenceService starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                SequenceRequest::NextValue { key, respond_to } => {
                    let _ = respond_to.send(self.handle_next_value(key));
                }
                SequenceRequest::CurrentValue { key, respond_to } => {
                    let _ = respond_to.send(Ok(self.counters.get(&key).copied()));
                }
            }
        }
        info!(counters = self.counters.len(), "SequenceService stopped");
    }

    #[instrument(fields(key = %key), skip(self))]
    fn handle_next_value(&mut self, key: String) -> Result<u64, SequenceError> {
        let counter = self.counters.entry(key.clone()).or_insert(self.start_value);
        *counter = counter.checked_add(1).ok_or(SequenceError::Exhausted(key))?;
        debug!(value = *counter, "Issued sequence value");
        Ok(*counter)
    }
}

#[derive(Clone)]
pub struct SequenceClient {
    sender: mpsc::Sender<SequenceRequest>,
}

impl SequenceClient {
    pub fn new(sender: mpsc::Sender<SequenceRequest>) -> Self {
        Self { sender }
    }

    /// Mint the next identifier for `key` in the given format.
    pub async fn next_id(&self, key: &str, format: IdFormat) -> Result<String, SequenceError> {
        let value = self.next_value(key.to_string()).await?;
        Ok(format.render(value))
    }
}

/// Generate client methods with oneshot channel boilerplate and automatic tracing.
macro_rules! client_method {
    ($client:ty => fn $method:ident($($param:ident: $param_type:ty),*) -> $return_type:ty as $request:ident::$variant:ident) => {
        impl $client {
            #[instrument(skip(self))]
            pub async fn $method(&self, $($param: $param_type),*) -> Result<$return_type, SequenceError> {
                debug!("Sending request");
                let (respond_to, response) = oneshot::channel();
                self.sender
                    .send($request::$variant { $($param,)* respond_to })
                    .await
                    .map_err(|_| SequenceError::ActorCommunicationError("Actor closed".to_string()))?;
                response
                    .await
                    .map_err(|_| SequenceError::ActorCommunicationError("Actor dropped".to_string()))?
            }
        }
    };
}

client_method!(SequenceClient => fn next_value(key: String) -> u64 as SequenceRequest::NextValue);
client_method!(SequenceClient => fn current_value(key: String) -> Option<u64> as SequenceRequest::CurrentValue);
