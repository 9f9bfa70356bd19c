//! ILCD data set builders.
//!
//! The documents are minimal but keep the element layout, namespaces and
//! prefixes of real exports so that lossless round trips can be compared
//! byte for byte.

/// Mapping table used across the integration tests.
pub const MAPPING_CSV: &str = "\
old_id,location,new_id
F1,DE,F1-DE
F1,FR,F1-FR
F2,,F2-GLO
F7,DE,F7-DE
";

/// A flow data set with one English base name.
pub fn flow(uuid: &str, version: Option<&str>, name: &str) -> String {
    let admin = version
        .map(|v| {
            format!(
                "\n  <administrativeInformation>\n    <publicationAndOwnership>\n      \
                 <common:dataSetVersion>{}</common:dataSetVersion>\n    \
                 </publicationAndOwnership>\n  </administrativeInformation>",
                v
            )
        })
        .unwrap_or_default();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<flowDataSet xmlns="http://lca.jrc.it/ILCD/Flow" xmlns:common="http://lca.jrc.it/ILCD/Common" version="1.1">
  <flowInformation>
    <dataSetInformation>
      <common:UUID>{uuid}</common:UUID>
      <name>
        <baseName xml:lang="en">{name}</baseName>
      </name>
    </dataSetInformation>
  </flowInformation>{admin}
</flowDataSet>"#
    )
}

fn reference_site(tag: &str, id: &str, location: Option<&str>, name: &str, direction: &str) -> String {
    let location = location
        .map(|l| format!("\n      <location>{}</location>", l))
        .unwrap_or_default();
    format!(
        r#"
    <{tag}>
      <referenceToFlowDataSet type="flow data set" refObjectId="{id}" uri="../flows/{id}.xml">
        <common:shortDescription xml:lang="en">{name}</common:shortDescription>
      </referenceToFlowDataSet>{location}
      <exchangeDirection>{direction}</exchangeDirection>
    </{tag}>"#
    )
}

/// An exchange of a process data set.
pub fn exchange(id: &str, location: Option<&str>, name: &str) -> String {
    reference_site("exchange", id, location, name, "Input")
}

/// A characterisation factor of an LCIA method data set.
pub fn factor(id: &str, location: Option<&str>, name: &str) -> String {
    reference_site("factor", id, location, name, "Output")
}

pub fn process(uuid: &str, exchanges: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<processDataSet xmlns="http://lca.jrc.it/ILCD/Process" xmlns:common="http://lca.jrc.it/ILCD/Common" version="1.1">
  <processInformation>
    <dataSetInformation>
      <common:UUID>{uuid}</common:UUID>
    </dataSetInformation>
  </processInformation>
  <exchanges>{}
  </exchanges>
</processDataSet>"#,
        exchanges.concat()
    )
}

pub fn lcia_method(uuid: &str, factors: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<LCIAMethodDataSet xmlns="http://lca.jrc.it/ILCD/LCIAMethod" xmlns:common="http://lca.jrc.it/ILCD/Common" version="1.1">
  <LCIAMethodInformation>
    <dataSetInformation>
      <common:UUID>{uuid}</common:UUID>
    </dataSetInformation>
  </LCIAMethodInformation>
  <characterisationFactors>{}
  </characterisationFactors>
</LCIAMethodDataSet>"#,
        factors.concat()
    )
}
