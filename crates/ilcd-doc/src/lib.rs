//! Editable XML documents for ILCD data sets.
//!
//! This crate provides:
//! - [`Document`] / [`Element`]: a lossless XML tree built on quick-xml events.
//!   Nodes that are never touched are written back byte for byte (escaping,
//!   namespace prefixes, comments and the XML declaration included).
//! - [`TreeNode`]: the small capability trait that rewriting code is written
//!   against (path queries, text and attribute access, child insertion).
//! - [`FlowInfo`]: typed extraction of a flow data set's identity and version.

pub mod flow;
pub mod node;
pub mod tree;

pub use flow::{FlowInfo, FLOW_BASE_NAME_PATH, FLOW_UUID_PATH, FLOW_VERSION_PATH};
pub use node::TreeNode;
pub use tree::{Document, Element, Node};
