//! Path conventions of ILCD packages.

/// Data set types and their package folders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSetType {
    Process,
    Flow,
    FlowProperty,
    UnitGroup,
    Source,
    Contact,
    LciaMethod,
    ExternalDoc,
}

impl DataSetType {
    pub const ALL: [DataSetType; 8] = [
        DataSetType::Process,
        DataSetType::Flow,
        DataSetType::FlowProperty,
        DataSetType::UnitGroup,
        DataSetType::Source,
        DataSetType::Contact,
        DataSetType::LciaMethod,
        DataSetType::ExternalDoc,
    ];

    /// Folder name inside a package.
    pub fn folder(self) -> &'static str {
        match self {
            DataSetType::Process => "processes",
            DataSetType::Flow => "flows",
            DataSetType::FlowProperty => "flowproperties",
            DataSetType::UnitGroup => "unitgroups",
            DataSetType::Source => "sources",
            DataSetType::Contact => "contacts",
            DataSetType::LciaMethod => "lciamethods",
            DataSetType::ExternalDoc => "external_docs",
        }
    }

    fn from_folder(folder: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.folder().eq_ignore_ascii_case(folder))
    }
}

/// Classification of a package entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Flow,
    Process,
    LciaMethod,
    /// Any other XML data set (flow properties, unit groups, sources, contacts).
    DataSet(DataSetType),
    /// Anything below `external_docs`, regardless of extension.
    ExternalDoc,
    /// Files outside the data set folders (stylesheets, schemas, manifests).
    Asset,
    /// Non-XML files inside a data set folder.
    Unknown,
}

impl EntryKind {
    /// The data set type of XML data set entries.
    pub fn data_set_type(self) -> Option<DataSetType> {
        match self {
            EntryKind::Flow => Some(DataSetType::Flow),
            EntryKind::Process => Some(DataSetType::Process),
            EntryKind::LciaMethod => Some(DataSetType::LciaMethod),
            EntryKind::DataSet(t) => Some(t),
            EntryKind::ExternalDoc => Some(DataSetType::ExternalDoc),
            EntryKind::Asset | EntryKind::Unknown => None,
        }
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split(['/', '\\']).filter(|s| !s.is_empty()).collect()
}

/// Classify an entry by the closest data set folder in its path.
pub fn classify(path: &str) -> EntryKind {
    let segments = segments(path);
    let Some((_file, dirs)) = segments.split_last() else {
        return EntryKind::Unknown;
    };
    let is_xml = path.to_ascii_lowercase().ends_with(".xml");
    let folder = dirs.iter().rev().find_map(|dir| DataSetType::from_folder(dir));
    match folder {
        None => EntryKind::Asset,
        Some(DataSetType::ExternalDoc) => EntryKind::ExternalDoc,
        Some(_) if !is_xml => EntryKind::Unknown,
        Some(DataSetType::Flow) => EntryKind::Flow,
        Some(DataSetType::Process) => EntryKind::Process,
        Some(DataSetType::LciaMethod) => EntryKind::LciaMethod,
        Some(other) => EntryKind::DataSet(other),
    }
}

/// The folder prefix of a flow entry, up to and including `flows/`.
///
/// `ILCD/flows/abc.xml` gives `ILCD/flows/`.
pub fn flow_folder_prefix(path: &str) -> Option<String> {
    let segments = segments(path);
    let (_file, dirs) = segments.split_last()?;
    let pos = dirs
        .iter()
        .rposition(|dir| dir.eq_ignore_ascii_case(DataSetType::Flow.folder()))?;
    let mut prefix = dirs[..=pos].join("/");
    prefix.push('/');
    Some(prefix)
}

/// Whether the file name of `path` is `<id>.xml` or `<id>_<version>.xml`.
pub fn data_set_file_matches(path: &str, id: &str) -> bool {
    let id = id.trim();
    if id.is_empty() {
        return false;
    }
    let Some(file) = segments(path).last().map(|s| s.to_ascii_lowercase()) else {
        return false;
    };
    let Some(stem) = file.strip_suffix(".xml") else {
        return false;
    };
    let id = id.to_ascii_lowercase();
    stem == id
        || stem
            .strip_prefix(id.as_str())
            .is_some_and(|rest| rest.starts_with('_'))
}
