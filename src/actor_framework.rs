//! # Resource Actor Framework
//!
//! A generic keyed store that runs as a single task. Every store in the system
//! (users, products, orders) is a [`ResourceActor`] over its own [`Entity`]
//! type and is reached only through a cloneable [`ResourceClient`].
//!
//! One task owns the map, so each request (including a custom [`Entity::Action`])
//! runs to completion before the next one starts. That is what makes
//! conditional updates such as "decrement stock only if enough is left" atomic.

use std::collections::HashMap;
use std::fmt::{self, Debug, Display};
use std::hash::Hash;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, warn};

// =============================================================================
// 1. THE ABSTRACTION
// =============================================================================

/// Trait that any domain entity must implement to be managed by ResourceActor
pub trait Entity: Clone + Send + Sync + 'static {
    /// Short name used in logs and error messages.
    const KIND: &'static str;

    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug;
    type CreateParams: Send + Sync + Debug;
    type Patch: Send + Sync + Debug;
    type Action: Send + Sync + Debug;
    type ActionResult: Send + Sync + Debug;

    fn id(&self) -> &Self::Id;

    /// Construct the full entity from the id minted by the caller and the params.
    fn from_create_params(id: Self::Id, params: Self::CreateParams) -> Result<Self, String>;

    /// Secondary key that must be unique across the store (e.g. an email).
    fn unique_key(&self) -> Option<String> {
        None
    }

    // --- Lifecycle Hooks ---

    fn on_create(&mut self) -> Result<(), String> {
        Ok(())
    }

    /// Apply a patch. Runs against a copy; the stored value is replaced only on success.
    fn on_update(&mut self, patch: Self::Patch) -> Result<(), String>;

    fn on_delete(&self) -> Result<(), String> {
        Ok(())
    }

    // --- Action Handler ---

    /// Handle a custom domain-specific action. Runs against a copy, like `on_update`.
    fn handle_action(&mut self, action: Self::Action) -> Result<Self::ActionResult, String>;
}

/// Errors surfaced by the framework itself, independent of the entity type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FrameworkError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("{kind} already exists: {key}")]
    AlreadyExists { kind: &'static str, key: String },
    #[error("{0}")]
    Rejected(String),
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped")]
    ActorDropped,
}

impl FrameworkError {
    fn not_found<T: Entity>(id: &T::Id) -> Self {
        FrameworkError::NotFound {
            kind: T::KIND,
            id: id.to_string(),
        }
    }
}

// =============================================================================
// 2. THE GENERIC MESSAGES
// =============================================================================

pub type Response<T> = oneshot::Sender<Result<T, FrameworkError>>;

/// Filter evaluated inside the actor for `Query` requests.
pub type Predicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

pub enum ResourceRequest<T: Entity> {
    Create {
        id: T::Id,
        params: T::CreateParams,
        respond_to: Response<T>,
    },
    Get {
        id: T::Id,
        respond_to: Response<Option<T>>,
    },
    Update {
        id: T::Id,
        patch: T::Patch,
        respond_to: Response<T>,
    },
    Delete {
        id: T::Id,
        respond_to: Response<T>,
    },
    Action {
        id: T::Id,
        action: T::Action,
        respond_to: Response<T::ActionResult>,
    },
    Query {
        predicate: Predicate<T>,
        respond_to: Response<Vec<T>>,
    },
}

impl<T: Entity> Debug for ResourceRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceRequest::Create { id, params, .. } => f
                .debug_struct("Create")
                .field("id", id)
                .field("params", params)
                .finish(),
            ResourceRequest::Get { id, .. } => f.debug_struct("Get").field("id", id).finish(),
            ResourceRequest::Update { id, patch, .. } => f
                .debug_struct("Update")
                .field("id", id)
                .field("patch", patch)
                .finish(),
            ResourceRequest::Delete { id, .. } => f.debug_struct("Delete").field("id", id).finish(),
            ResourceRequest::Action { id, action, .. } => f
                .debug_struct("Action")
                .field("id", id)
                .field("action", action)
                .finish(),
            ResourceRequest::Query { .. } => f.write_str("Query"),
        }
    }
}

// =============================================================================
// 3. THE GENERIC ACTOR SERVER
// =============================================================================

pub struct ResourceActor<T: Entity> {
    receiver: mpsc::Receiver<ResourceRequest<T>>,
    store: HashMap<T::Id, T>,
    unique: HashMap<String, T::Id>,
}

impl<T: Entity> ResourceActor<T> {
    pub fn new(buffer_size: usize) -> (Self, ResourceClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            store: HashMap::new(),
            unique: HashMap::new(),
        };
        (actor, ResourceClient::new(sender))
    }

    /// Actor loop. Stops once every client has been dropped.
    #[instrument(name = "resource_actor", skip(self), fields(kind = T::KIND))]
    pub async fn run(mut self) {
        info!("Store starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ResourceRequest::Create { id, params, respond_to } => {
                    let _ = respond_to.send(self.handle_create(id, params));
                }
                ResourceRequest::Get { id, respond_to } => {
                    let _ = respond_to.send(Ok(self.store.get(&id).cloned()));
                }
                ResourceRequest::Update { id, patch, respond_to } => {
                    let _ = respond_to.send(self.handle_update(id, patch));
                }
                ResourceRequest::Delete { id, respond_to } => {
                    let _ = respond_to.send(self.handle_delete(id));
                }
                ResourceRequest::Action { id, action, respond_to } => {
                    let _ = respond_to.send(self.handle_action(id, action));
                }
                ResourceRequest::Query { predicate, respond_to } => {
                    let items: Vec<T> = self.store.values().filter(|item| predicate(*item)).cloned().collect();
                    debug!(matched = items.len(), "Query served");
                    let _ = respond_to.send(Ok(items));
                }
            }
        }
        info!(items = self.store.len(), "Store stopped");
    }

    fn handle_create(&mut self, id: T::Id, params: T::CreateParams) -> Result<T, FrameworkError> {
        let mut item = T::from_create_params(id, params).map_err(FrameworkError::Rejected)?;
        item.on_create().map_err(FrameworkError::Rejected)?;

        // The entity may normalize the id it was given; key the store by its own.
        let id = item.id().clone();
        if self.store.contains_key(&id) {
            warn!(%id, "Duplicate id on create");
            return Err(FrameworkError::AlreadyExists { kind: T::KIND, key: id.to_string() });
        }

        if let Some(key) = item.unique_key() {
            if self.unique.contains_key(&key) {
                debug!(%key, "Unique key already taken");
                return Err(FrameworkError::AlreadyExists { kind: T::KIND, key });
            }
            self.unique.insert(key, id.clone());
        }
        self.store.insert(id, item.clone());
        Ok(item)
    }

    fn handle_update(&mut self, id: T::Id, patch: T::Patch) -> Result<T, FrameworkError> {
        let current = self.store.get(&id).ok_or_else(|| FrameworkError::not_found::<T>(&id))?;
        let mut next = current.clone();
        next.on_update(patch).map_err(FrameworkError::Rejected)?;
        self.replace(id, next)
    }

    fn handle_delete(&mut self, id: T::Id) -> Result<T, FrameworkError> {
        let item = self.store.get(&id).ok_or_else(|| FrameworkError::not_found::<T>(&id))?;
        item.on_delete().map_err(FrameworkError::Rejected)?;
        let item = self.store.remove(&id).ok_or_else(|| FrameworkError::not_found::<T>(&id))?;
        if let Some(key) = item.unique_key() {
            self.unique.remove(&key);
        }
        Ok(item)
    }

    fn handle_action(&mut self, id: T::Id, action: T::Action) -> Result<T::ActionResult, FrameworkError> {
        let current = self.store.get(&id).ok_or_else(|| FrameworkError::not_found::<T>(&id))?;
        let mut next = current.clone();
        let result = next.handle_action(action).map_err(FrameworkError::Rejected)?;
        self.replace(id, next)?;
        Ok(result)
    }

    /// Swap in a modified entity, keeping the unique index consistent.
    fn replace(&mut self, id: T::Id, next: T) -> Result<T, FrameworkError> {
        let old_key = self.store.get(&id).and_then(T::unique_key);
        let new_key = next.unique_key();
        if new_key != old_key {
            if let Some(key) = &new_key {
                if self.unique.get(key).is_some_and(|owner| owner != &id) {
                    return Err(FrameworkError::AlreadyExists { kind: T::KIND, key: key.clone() });
                }
            }
            if let Some(key) = old_key {
                self.unique.remove(&key);
            }
            if let Some(key) = new_key {
                self.unique.insert(key, id.clone());
            }
        }
        self.store.insert(id, next.clone());
        Ok(next)
    }
}

// =============================================================================
// 4. THE GENERIC CLIENT
// =============================================================================

#[derive(Clone)]
pub struct ResourceClient<T: Entity> {
    sender: mpsc::Sender<ResourceRequest<T>>,
}

impl<T: Entity> ResourceClient<T> {
    pub fn new(sender: mpsc::Sender<ResourceRequest<T>>) -> Self {
        Self { sender }
    }

    async fn request<R>(
        &self,
        build: impl FnOnce(Response<R>) -> ResourceRequest<T>,
    ) -> Result<R, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    pub async fn create(&self, id: T::Id, params: T::CreateParams) -> Result<T, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Create { id, params, respond_to }).await
    }

    pub async fn get(&self, id: T::Id) -> Result<Option<T>, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Get { id, respond_to }).await
    }

    pub async fn update(&self, id: T::Id, patch: T::Patch) -> Result<T, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Update { id, patch, respond_to }).await
    }

    pub async fn delete(&self, id: T::Id) -> Result<T, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Delete { id, respond_to }).await
    }

    pub async fn perform_action(&self, id: T::Id, action: T::Action) -> Result<T::ActionResult, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Action { id, action, respond_to }).await
    }

    pub async fn query(
        &self,
        predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Result<Vec<T>, FrameworkError> {
        let predicate: Predicate<T> = Box::new(predicate);
        self.request(|respond_to| ResourceRequest::Query { predicate, respond_to }).await
    }
}

// =============================================================================
// 5. EXAMPLE USAGE (Test)
// =============================================================================
