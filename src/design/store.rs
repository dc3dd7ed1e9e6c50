use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::design::{Design, NewDesign};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Design {0} does not exist")]
    NotFound(u64),
}

/// Persistence for saved designs.
#[async_trait]
pub trait DesignStore: Send + Sync {
    async fn get(&self, id: u64) -> Result<Option<Design>, StoreError>;

    /// Persist a new design and return it with its assigned id.
    async fn create(&self, design: NewDesign) -> Result<Design, StoreError>;

    /// Overwrite an existing design, refreshing its modification time.
    async fn update(&self, design: Design) -> Result<Design, StoreError>;
}

/// Designs indexed by id
#[derive(Debug)]
pub struct DesignTable {
    designs: HashMap<u64, Design>,
    next_id: u64,
}

impl Default for DesignTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DesignTable {
    pub fn new() -> Self {
        Self {
            designs: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn get(&self, id: u64) -> Option<&Design> {
        self.designs.get(&id)
    }

    pub fn insert(&mut self, new: NewDesign) -> Design {
        let id = self.next_id;
        self.next_id += 1;
        let design = Design {
            id,
            owner: new.owner,
            name: new.name,
            desc: new.desc,
            is_auto: new.is_auto,
            data: new.data,
            mtime: Utc::now(),
        };
        self.designs.insert(id, design.clone());
        design
    }

    /// Replace a stored design. Returns false if the id is unknown.
    pub fn replace(&mut self, design: Design) -> bool {
        match self.designs.get_mut(&design.id) {
            Some(slot) => {
                *slot = design;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.designs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.designs.is_empty()
    }
}

/// Process-local design store.
#[derive(Debug, Default)]
pub struct MemoryDesignStore {
    table: RwLock<DesignTable>,
}

impl MemoryDesignStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.len()
    }
}

#[async_trait]
impl DesignStore for MemoryDesignStore {
    async fn get(&self, id: u64) -> Result<Option<Design>, StoreError> {
        Ok(self.table.read().await.get(id).cloned())
    }

    async fn create(&self, design: NewDesign) -> Result<Design, StoreError> {
        let design = self.table.write().await.insert(design);
        tracing::debug!(design_id = design.id, owner = %design.owner, "Design created");
        Ok(design)
    }

    async fn update(&self, mut design: Design) -> Result<Design, StoreError> {
        design.mtime = Utc::now();
        if !self.table.write().await.replace(design.clone()) {
            return Err(StoreError::NotFound(design.id));
        }
        tracing::debug!(design_id = design.id, "Design updated");
        Ok(design)
    }
}
