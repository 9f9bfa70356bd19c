//! Rewriting of flow references inside process and LCIA method data sets.
//!
//! Only embedded references change: the `refObjectId` and `uri` of each
//! `referenceToFlowDataSet`, the sibling `location`, and (reverse only) the
//! inlined short names. The document's own identity is never touched.

use anyhow::{anyhow, Context, Result};
use ilcd_doc::{Document, TreeNode};
use tracing::debug;

use crate::mapping::{mapping_key, Direction, MappingTable, UsageStats};

const FLOW_REF: &str = "referenceToFlowDataSet";
const FLOW_REF_NAME: &str = "referenceToFlowDataSet/shortDescription";
const LOCATION: &str = "location";
const REF_OBJECT_ID: &str = "refObjectId";
const URI: &str = "uri";

/// Conventional relative URI of a flow data set, as seen from a sibling folder.
pub fn flow_uri(id: &str) -> String {
    format!("../flows/{}.xml", id)
}

/// Data sets that embed flow references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferencingDataSet {
    Process,
    LciaMethod,
}

impl ReferencingDataSet {
    pub fn from_root(local_name: &str) -> Option<Self> {
        match local_name {
            "processDataSet" => Some(Self::Process),
            "LCIAMethodDataSet" => Some(Self::LciaMethod),
            _ => None,
        }
    }

    /// Reference sites, relative to the root element.
    fn sites_path(self) -> &'static str {
        match self {
            Self::Process => "exchanges/exchange",
            Self::LciaMethod => "characterisationFactors/factor",
        }
    }

    fn uuid_path(self) -> &'static str {
        match self {
            Self::Process => "processInformation/dataSetInformation/UUID",
            Self::LciaMethod => "LCIAMethodInformation/dataSetInformation/UUID",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Process => "process",
            Self::LciaMethod => "LCIA method",
        }
    }
}

/// Rewrites flow references for one package run.
pub struct ReferenceRewriter<'a> {
    table: &'a MappingTable,
    stats: &'a mut UsageStats,
    direction: Direction,
}

impl<'a> ReferenceRewriter<'a> {
    pub fn new(table: &'a MappingTable, stats: &'a mut UsageStats, direction: Direction) -> Self {
        Self {
            table,
            stats,
            direction,
        }
    }

    /// Parse, rewrite and re-serialize a process or LCIA method data set.
    pub fn rewrite(&mut self, bytes: &[u8]) -> Result<Vec<u8>> {
        let mut doc = Document::parse(bytes).context("parse data set")?;
        self.rewrite_tree(doc.root_mut())?;
        doc.to_bytes().context("serialize data set")
    }

    /// Rewrite every reference site below `root`. Returns the number of sites.
    pub fn rewrite_tree<N: TreeNode>(&mut self, root: &mut N) -> Result<usize> {
        let data_set = ReferencingDataSet::from_root(root.local_name()).ok_or_else(|| {
            anyhow!(
                "<{}> is not a process or LCIA method data set",
                root.local_name()
            )
        })?;
        let uuid = root
            .find(data_set.uuid_path())
            .map(|e| e.text().trim().to_string())
            .unwrap_or_default();

        let sites = root.find_all_mut(data_set.sites_path());
        let count = sites.len();
        debug!(kind = data_set.label(), uuid = %uuid, sites = count, "replace flow references");
        for site in sites {
            self.rewrite_site(site);
        }
        Ok(count)
    }

    fn rewrite_site<N: TreeNode>(&mut self, site: &mut N) {
        let id = site
            .find(FLOW_REF)
            .and_then(|r| r.attr(REF_OBJECT_ID))
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        let Some(id) = id else {
            debug!("reference site without flow reference skipped");
            return;
        };
        match self.direction {
            Direction::Apply => self.apply_site(site, &id),
            Direction::Reverse => self.reverse_site(site, &id),
        }
    }

    fn apply_site<N: TreeNode>(&mut self, site: &mut N, id: &str) {
        let table = self.table;
        let location = site
            .find(LOCATION)
            .map(|e| e.text().trim().to_string())
            .unwrap_or_default();
        let key = mapping_key(&location, id);
        let Some(entry) = table.lookup_key(&key) else {
            self.stats.mark_untouched(id);
            return;
        };
        retarget(site, &entry.new_id);
        self.stats.mark_used(key);
    }

    fn reverse_site<N: TreeNode>(&mut self, site: &mut N, id: &str) {
        let table = self.table;
        let Some(entry) = table.lookup_reverse(id) else {
            self.stats.mark_untouched(id);
            return;
        };
        retarget(site, &entry.old_id);

        if site.find(LOCATION).is_none() && !entry.location.is_empty() {
            site.insert_child_after(LOCATION, FLOW_REF);
        }
        if let Some(location) = site.find_mut(LOCATION) {
            location.set_text(&entry.location);
        }

        if !entry.location.is_empty() {
            let suffix = format!(" - {}", entry.location);
            for name in site.find_all_mut(FLOW_REF_NAME) {
                let text = name.text();
                if let Some(stripped) = text.strip_suffix(&suffix) {
                    name.set_text(stripped);
                }
            }
        }

        self.stats.mark_used(entry.new_id.as_str());
    }
}

fn retarget<N: TreeNode>(site: &mut N, id: &str) {
    let Some(flow_ref) = site.find_mut(FLOW_REF) else {
        return;
    };
    flow_ref.set_attr(REF_OBJECT_ID, id);
    if flow_ref.attr(URI).is_some() {
        flow_ref.set_attr(URI, &flow_uri(id));
    }
}
