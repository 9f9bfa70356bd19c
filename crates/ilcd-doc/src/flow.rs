//! Typed access to flow data set identity.

use anyhow::{anyhow, Context, Result};

use crate::node::TreeNode;
use crate::tree::Document;

/// UUID of a flow data set, relative to the `flowDataSet` root.
pub const FLOW_UUID_PATH: &str = "flowInformation/dataSetInformation/UUID";

/// Human-readable base names of a flow, relative to the `flowDataSet` root.
pub const FLOW_BASE_NAME_PATH: &str = "flowInformation/dataSetInformation/name/baseName";

/// Data set version of a flow, relative to the `flowDataSet` root.
pub const FLOW_VERSION_PATH: &str = "administrativeInformation/publicationAndOwnership/dataSetVersion";

const FLOW_ROOT: &str = "flowDataSet";

/// Identity of a flow data set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowInfo {
    pub uuid: String,
    pub version: Option<String>,
}

impl FlowInfo {
    /// Extract the identity from raw flow data set bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let doc = Document::parse(bytes).context("parse flow data set")?;
        Self::from_document(&doc)
    }

    pub fn from_document(doc: &Document) -> Result<Self> {
        let root = doc.root();
        if root.local_name() != FLOW_ROOT {
            return Err(anyhow!(
                "expected <{}> root, found <{}>",
                FLOW_ROOT,
                root.local_name()
            ));
        }
        let uuid = root
            .find(FLOW_UUID_PATH)
            .map(|e| e.text().trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("flow data set has no UUID"))?;
        let version = root
            .find(FLOW_VERSION_PATH)
            .map(|e| e.text().trim().to_string())
            .filter(|s| !s.is_empty());
        Ok(Self { uuid, version })
    }

    /// Archive file name: `<uuid>_<version>.xml`, or `<uuid>.xml` without a version.
    pub fn file_name(&self) -> String {
        match &self.version {
            Some(version) => format!("{}_{}.xml", self.uuid, version),
            None => format!("{}.xml", self.uuid),
        }
    }
}
