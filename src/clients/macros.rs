/// `get_<name>(id)`: raw lookup by id, no ownership or activity checks.
#[macro_export]
macro_rules! impl_get_method {
    ($client_name:ident, $entity:ty, $error:ty, $entity_name_snake:ident) => {
        paste::paste! {
            impl $client_name {
                #[tracing::instrument(skip(self))]
                pub async fn [<get_ $entity_name_snake>](&self, id: String) -> Result<Option<$entity>, $error> {
                    tracing::debug!("Sending request");
                    self.inner.get(id).await.map_err(<$error>::from)
                }
            }
        }
    };
}

/// `find_<name>s(predicate)`: every stored record matching `predicate`, in no
/// particular order.
#[macro_export]
macro_rules! impl_query_method {
    ($client_name:ident, $entity:ty, $error:ty, $entity_name_snake:ident) => {
        paste::paste! {
            impl $client_name {
                #[tracing::instrument(skip(self, predicate))]
                pub async fn [<find_ $entity_name_snake s>](
                    &self,
                    predicate: impl Fn(&$entity) -> bool + Send + Sync + 'static,
                ) -> Result<Vec<$entity>, $error> {
                    tracing::debug!("Sending query");
                    self.inner.query(predicate).await.map_err(<$error>::from)
                }
            }
        }
    };
}

#[macro_export]
macro_rules! impl_client_methods {
    ($client_name:ident, $entity:ty, $error:ty, $entity_name_snake:ident) => {
        $crate::impl_get_method!($client_name, $entity, $error, $entity_name_snake);
        $crate::impl_query_method!($client_name, $entity, $error, $entity_name_snake);
    };
}

#[macro_export]
macro_rules! impl_client_new {
    ($client_name:ident, $entity:ty) => {
        impl $client_name {
            pub fn new(inner: $crate::actor_framework::ResourceClient<$entity>) -> Self {
                Self { inner }
            }
        }
    };
}

#[macro_export]
macro_rules! impl_basic_client {
    ($client_name:ident, $entity:ty, $error:ty, $entity_name_snake:ident) => {
        $crate::impl_client_new!($client_name, $entity);
        $crate::impl_client_methods!($client_name, $entity, $error, $entity_name_snake);
    };
}
