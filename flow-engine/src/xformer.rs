//! Result transformation applied by the [`Flow`](crate::flow::Flow) before a
//! result batch is handed to the client.

use std::fmt;
use std::sync::Arc;

/// How a flow transforms a result batch before delivering it to the client.
///
/// `Elementwise` maps the closure over each element of the batch in order;
/// `Batch` applies the closure once to the whole batch. Absent an `xformer`
/// (`Xformer::identity()`) the batch passes through unchanged.
pub enum Xformer<V> {
    Identity,
    Elementwise(Arc<dyn Fn(V) -> V + Send + Sync>),
    Batch(Arc<dyn Fn(Vec<V>) -> Vec<V> + Send + Sync>),
}

impl<V> Xformer<V> {
    pub fn identity() -> Self {
        Xformer::Identity
    }

    pub fn elementwise<F>(f: F) -> Self
    where
        F: Fn(V) -> V + Send + Sync + 'static,
    {
        Xformer::Elementwise(Arc::new(f))
    }

    pub fn batch<F>(f: F) -> Self
    where
        F: Fn(Vec<V>) -> Vec<V> + Send + Sync + 'static,
    {
        Xformer::Batch(Arc::new(f))
    }

    pub(crate) fn apply(&self, batch: Vec<V>) -> Vec<V> {
        match self {
            Xformer::Identity => batch,
            Xformer::Elementwise(f) => batch.into_iter().map(|v| f(v)).collect(),
            Xformer::Batch(f) => f(batch),
        }
    }
}

impl<V> Default for Xformer<V> {
    fn default() -> Self {
        Xformer::Identity
    }
}

impl<V> fmt::Debug for Xformer<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Xformer::Identity => "Identity",
            Xformer::Elementwise(_) => "Elementwise(..)",
            Xformer::Batch(_) => "Batch(..)",
        };
        f.debug_tuple("Xformer").field(&kind).finish()
    }
}
