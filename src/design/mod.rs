pub mod codec;
pub mod store;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

pub use codec::{DesignDecodeError, JobParam, SparkDesign};
pub use store::{DesignStore, MemoryDesignStore, StoreError};

/// Name given to designs created implicitly by running an unsaved query.
pub const AUTO_DESIGN_NAME: &str = "Unsaved query";

/// A saved job submission template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Design {
    pub id: u64,
    pub owner: String,
    pub name: String,
    pub desc: String,
    /// Created by an execute call rather than an explicit save
    pub is_auto: bool,
    /// Encoded [`SparkDesign`]
    pub data: String,
    pub mtime: DateTime<Utc>,
}

/// A design that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewDesign {
    pub owner: String,
    pub name: String,
    pub desc: String,
    pub is_auto: bool,
    pub data: String,
}

impl NewDesign {
    pub fn auto(owner: impl Into<String>, query: &SparkDesign) -> Self {
        Self {
            owner: owner.into(),
            name: AUTO_DESIGN_NAME.to_string(),
            desc: String::new(),
            is_auto: true,
            data: query.encode(),
        }
    }
}

/// Flattened design as returned to the editor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignView {
    pub id: u64,
    pub name: String,
    pub desc: String,
    pub app_name: String,
    pub class_path: String,
    pub auto_context: bool,
    pub context: Option<String>,
    /// Params as stored, values keep their JSON types
    pub params: Vec<Value>,
}

impl Design {
    pub fn is_owned_by(&self, user: &str) -> bool {
        self.owner == user
    }

    pub fn query(&self) -> Result<SparkDesign, DesignDecodeError> {
        SparkDesign::decode(&self.data)
    }

    pub fn to_view(&self) -> Result<DesignView, DesignDecodeError> {
        let query = self.query()?;
        let params =
            serde_json::from_str(&query.params).map_err(DesignDecodeError::InvalidParams)?;
        Ok(DesignView {
            id: self.id,
            name: self.name.clone(),
            desc: self.desc.clone(),
            app_name: query.app_name,
            class_path: query.class_path,
            auto_context: query.auto_context,
            context: query.context,
            params,
        })
    }
}
