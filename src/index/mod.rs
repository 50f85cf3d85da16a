//! Index management
//!
//! Ensures a named search index exists before (or after) a load. Creation
//! itself is not idempotent on the server; idempotence comes from checking
//! `FT.INFO` first. Two managers racing through the check may both issue
//! `FT.CREATE`; the loser gets an "Index already exists" reply, which is
//! reported as success here.

pub mod schema;

pub use schema::{merchant_index, probe_index, FieldKind, IndexDescriptor, IndexOn, SchemaField};

use crate::common::{Error, Result};
use crate::store::Store;
use tracing::info;

/// What `ensure` had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    Existed,
    Created,
}

pub struct IndexManager<'a, S> {
    store: &'a S,
}

impl<'a, S: Store> IndexManager<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Create the index unless one with the same name already exists
    pub async fn ensure(&self, descriptor: &IndexDescriptor) -> Result<EnsureOutcome> {
        if self.store.index_info(&descriptor.name).await?.is_some() {
            info!("Index '{}' already exists, skipping creation", descriptor.name);
            return Ok(EnsureOutcome::Existed);
        }

        info!(
            "Creating index '{}' on {} prefix '{}' ({} fields)",
            descriptor.name,
            descriptor.on,
            descriptor.prefix,
            descriptor.fields.len()
        );
        match self.store.create_index(descriptor).await {
            Ok(()) => Ok(EnsureOutcome::Created),
            Err(Error::IndexCreate { reason, .. }) if is_already_exists(&reason) => {
                info!("Index '{}' was created concurrently", descriptor.name);
                Ok(EnsureOutcome::Existed)
            }
            Err(e) => Err(e),
        }
    }
}

fn is_already_exists(reason: &str) -> bool {
    reason.to_lowercase().contains("already exists")
}
