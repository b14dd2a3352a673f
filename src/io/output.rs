//! Result serialization: text, CSV-like, and JSON renditions of a
//! hierarchy.
//!
//! All three writers are deterministic: clusters appear in allocation
//! order, node shares are sorted by id, and JSON objects keep insertion
//! order. Two runs over the same input with shuffling disabled therefore
//! serialize byte-identically.

use std::collections::BTreeMap;
use std::io::{self, Write};

use serde_json::{json, Map, Value};

use crate::error::{Error, Result};
use crate::graph::Id;
use crate::hierarchy::Hierarchy;
use crate::model::{Cluster, ItemRef};

/// Output format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Text-like representation for logs.
    Text,
    /// CSV-like representation for parsing.
    Csv,
    /// JSON representation.
    Json,
}

/// Amount of detail in the JSON rendition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Detail {
    /// Root, clusters, and the summary only.
    Basic,
    /// Plus root clusters unwrapped into node-share maps.
    Communities,
    /// Plus inter-cluster links at every level.
    Links,
}

/// Parsed output options: format plus detail level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputOptions {
    /// Selected format.
    pub format: OutputFormat,
    /// Detail level (meaningful for JSON).
    pub detail: Detail,
}

impl OutputOptions {
    /// Parse an option value like `t`, `c`, `j`, `je`, or `jd`.
    ///
    /// # Errors
    /// [`Error::InvalidInput`] on anything else.
    pub fn parse(value: &str) -> Result<Self> {
        let mut chars = value.chars();
        let format = match chars.next() {
            Some('t') => OutputFormat::Text,
            Some('c') => OutputFormat::Csv,
            Some('j') => OutputFormat::Json,
            _ => {
                return Err(Error::InvalidInput {
                    message: format!("unexpected output format: {value}"),
                })
            }
        };
        let detail = match chars.next() {
            None => Detail::Basic,
            Some('e') => Detail::Communities,
            Some('d') => Detail::Links,
            _ => {
                return Err(Error::InvalidInput {
                    message: format!("unexpected output format: {value}"),
                })
            }
        };
        if chars.next().is_some() {
            return Err(Error::InvalidInput {
                message: format!("unexpected output format: {value}"),
            });
        }
        Ok(Self { format, detail })
    }
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            detail: Detail::Basic,
        }
    }
}

/// Write the hierarchy in the selected format.
pub fn write_output<W: Write>(
    hierarchy: &mut Hierarchy,
    opts: &OutputOptions,
    out: &mut W,
) -> io::Result<()> {
    match opts.format {
        OutputFormat::Text => write_text(hierarchy, out),
        OutputFormat::Csv => write_csv(hierarchy, out),
        OutputFormat::Json => write_json(hierarchy, opts.detail, out),
    }
}

/// Text rendition: levels from the root down, then a summary line.
pub fn write_text<W: Write>(hierarchy: &Hierarchy, out: &mut W) -> io::Result<()> {
    writeln!(out, "-Clusters:")?;
    // Owner id -> sibling cluster indices; the root level has no owner.
    let mut level: BTreeMap<Option<Id>, Vec<usize>> =
        BTreeMap::from([(None, hierarchy.root().to_vec())]);
    let mut depth = 0usize;
    while !level.is_empty() {
        writeln!(
            out,
            "----- Clusters level #{depth} -----------------------------------------------"
        )?;
        let mut next: BTreeMap<Option<Id>, Vec<usize>> = BTreeMap::new();
        for (owner, siblings) in &level {
            match owner {
                Some(id) => writeln!(
                    out,
                    "-- Siblings under #{id} ----------------------------------------"
                )?,
                None => writeln!(
                    out,
                    "-- Root siblings -----------------------------------------------"
                )?,
            }
            for &ci in siblings {
                let cl = hierarchy.cluster(ci);
                writeln!(out, "-Cluster #{}  ownersNum: {}", cl.id, cl.owners.len())?;
                writeln!(
                    out,
                    "\towners: {}",
                    ids_to_str(cl.owners.iter().map(|&oc| hierarchy.cluster(oc).id))
                )?;
                let kind = if all_leaves(cl) { "nds" } else { "cls" };
                writeln!(
                    out,
                    "\tdes ({kind}): {}",
                    ids_to_str(cl.descs.iter().map(|&d| hierarchy.item_id(d)))
                )?;
                if let Some(core) = cl.core {
                    writeln!(out, "\tcore: {}", hierarchy.item_id(core))?;
                }
                let children: Vec<usize> =
                    cl.descs.iter().filter_map(ItemRef::as_inner).collect();
                if !children.is_empty() {
                    next.insert(Some(cl.id), children);
                }
            }
        }
        level = next;
        depth += 1;
    }
    writeln!(
        out,
        "-Nodes: {}, clusters (communities): {}, roots: {}, mod: {}",
        hierarchy.nodes().len(),
        hierarchy.clusters().len(),
        hierarchy.root().len(),
        hierarchy.score().modularity
    )
}

/// CSV-like rendition: one line per cluster.
pub fn write_csv<W: Write>(hierarchy: &Hierarchy, out: &mut W) -> io::Result<()> {
    writeln!(out, "# Clusters output format:")?;
    writeln!(
        out,
        "# <cluster_id>> [owners: <owner_id> ...; ]des: <des_id> ...[; leafs: true][; core: <id>]"
    )?;
    for cl in hierarchy.clusters() {
        write!(out, "{}> ", cl.id)?;
        if !cl.owners.is_empty() {
            write!(
                out,
                "owners: {}; ",
                ids_to_str(cl.owners.iter().map(|&oc| hierarchy.cluster(oc).id))
            )?;
        }
        write!(
            out,
            "des: {}",
            ids_to_str(cl.descs.iter().map(|&d| hierarchy.item_id(d)))
        )?;
        if all_leaves(cl) {
            write!(out, "; leafs: true")?;
        }
        if let Some(core) = cl.core {
            write!(out, "; core: {}", hierarchy.item_id(core))?;
        }
        writeln!(out)?;
    }
    writeln!(
        out,
        "# Nodes: {}, clusters: {}, roots: {}, mod: {}",
        hierarchy.nodes().len(),
        hierarchy.clusters().len(),
        hierarchy.root().len(),
        hierarchy.score().modularity
    )
}

/// JSON rendition.
pub fn write_json<W: Write>(
    hierarchy: &mut Hierarchy,
    detail: Detail,
    out: &mut W,
) -> io::Result<()> {
    let mut doc = Map::new();
    doc.insert(
        "root".into(),
        Value::Array(
            hierarchy
                .root_clusters()
                .map(|cl| json!(cl.id))
                .collect(),
        ),
    );

    let mut clusters = Map::new();
    for cl in hierarchy.clusters() {
        let mut entry = Map::new();
        if !cl.owners.is_empty() {
            entry.insert(
                "owners".into(),
                Value::Array(
                    cl.owners
                        .iter()
                        .map(|&oc| json!(hierarchy.cluster(oc).id))
                        .collect(),
                ),
            );
        }
        entry.insert(
            "des".into(),
            Value::Array(
                cl.descs
                    .iter()
                    .map(|&d| json!(hierarchy.item_id(d)))
                    .collect(),
            ),
        );
        if all_leaves(cl) {
            entry.insert("leafs".into(), Value::Bool(true));
        }
        if let Some(core) = cl.core {
            entry.insert("core".into(), json!(hierarchy.item_id(core)));
        }
        clusters.insert(cl.id.to_string(), Value::Object(entry));
    }
    doc.insert("clusters".into(), Value::Object(clusters));

    if detail >= Detail::Communities && !hierarchy.root().is_empty() {
        let mut communities = Map::new();
        let root = hierarchy.root().to_vec();
        for ci in root {
            let id = hierarchy.cluster(ci).id;
            let shares = hierarchy.unwrap(ItemRef::Inner(ci));
            let mut shares: Vec<(Id, f32)> = shares.into_iter().collect();
            shares.sort_unstable_by_key(|&(id, _)| id);
            let mut entry = Map::new();
            for (node_id, share) in shares {
                entry.insert(node_id.to_string(), float_value(share as f64));
            }
            communities.insert(id.to_string(), Value::Object(entry));
        }
        doc.insert("communities".into(), Value::Object(communities));

        if detail >= Detail::Links {
            let mut levels = Vec::new();
            hierarchy.reset_traversing();
            // Collect link maps level by level; borrow rules keep the
            // id resolution outside the traversal callback.
            let mut raw: Vec<(Id, f64, Vec<(ItemRef, f64)>)> = Vec::new();
            while hierarchy.traverse_next_level(|cl, _| {
                raw.push((
                    cl.id,
                    cl.self_weight,
                    cl.links.iter().map(|ln| (ln.dest, ln.weight)).collect(),
                ))
            }) {}
            for (id, self_weight, links) in raw {
                let mut entry = Map::new();
                if self_weight != 0.0 {
                    entry.insert(id.to_string(), float_value(self_weight));
                }
                for (dest, weight) in links {
                    entry.insert(
                        hierarchy.item_id(dest).to_string(),
                        float_value(weight),
                    );
                }
                let mut wrapper = Map::new();
                wrapper.insert(id.to_string(), Value::Object(entry));
                levels.push(Value::Object(wrapper));
            }
            doc.insert("levels".into(), Value::Array(levels));
        }
    }

    doc.insert("nodes".into(), json!(hierarchy.nodes().len()));
    doc.insert(
        "mod".into(),
        float_value(hierarchy.score().modularity as f64),
    );
    let rendered = Value::Object(doc);
    writeln!(out, "{rendered}")
}

/// Shortest decimal float representation as a JSON number.
fn float_value(value: f64) -> Value {
    let shortest: f64 = format!("{value}").parse().unwrap_or(value);
    serde_json::Number::from_f64(shortest)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn all_leaves(cl: &Cluster) -> bool {
    cl.descs.iter().all(|d| !d.is_inner())
}

fn ids_to_str<I: Iterator<Item = Id>>(ids: I) -> String {
    let parts: Vec<String> = ids.map(|id| id.to_string()).collect();
    if parts.is_empty() {
        "-".into()
    } else {
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fold::Folding;
    use crate::graph::GraphBuilder;

    fn triangle_hierarchy() -> Hierarchy {
        let mut builder = GraphBuilder::new(3);
        builder.add_nodes(&[0, 1, 2]).unwrap();
        builder.add_node_links(0, [1.into(), 2.into()], false).unwrap();
        builder.add_node_links(1, [2.into()], false).unwrap();
        Folding::new().fold(builder.finalize()).unwrap()
    }

    #[test]
    fn test_parse_output_options() {
        let opts = OutputOptions::parse("jd").unwrap();
        assert_eq!(opts.format, OutputFormat::Json);
        assert_eq!(opts.detail, Detail::Links);
        assert_eq!(
            OutputOptions::parse("t").unwrap().format,
            OutputFormat::Text
        );
        assert!(OutputOptions::parse("x").is_err());
        assert!(OutputOptions::parse("jq").is_err());
        assert!(OutputOptions::parse("jee").is_err());
    }

    #[test]
    fn test_text_output_shape() {
        let hierarchy = triangle_hierarchy();
        let mut buf = Vec::new();
        write_text(&hierarchy, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("-Clusters:"));
        assert!(text.contains("Clusters level #0"));
        assert!(text.contains("ownersNum: 0"));
        assert!(text.contains("des (nds): 0 1 2"));
        assert!(text.contains("-Nodes: 3, clusters (communities): 1, roots: 1, mod: 0"));
    }

    #[test]
    fn test_csv_output_shape() {
        let hierarchy = triangle_hierarchy();
        let mut buf = Vec::new();
        write_csv(&hierarchy, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let line = text
            .lines()
            .find(|l| !l.starts_with('#'))
            .expect("cluster line");
        assert!(line.contains("> des: 0 1 2; leafs: true; core: "));
    }

    #[test]
    fn test_json_basic_shape() {
        let mut hierarchy = triangle_hierarchy();
        let mut buf = Vec::new();
        write_json(&mut hierarchy, Detail::Basic, &mut buf).unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        assert_eq!(doc["nodes"], json!(3));
        assert_eq!(doc["mod"], json!(0.0));
        assert_eq!(doc["root"].as_array().unwrap().len(), 1);
        let root_id = doc["root"][0].to_string();
        let entry = &doc["clusters"][&root_id];
        assert_eq!(entry["leafs"], json!(true));
        assert_eq!(entry["des"].as_array().unwrap().len(), 3);
        assert!(entry.get("owners").is_none());
        assert!(doc.get("communities").is_none());
    }

    #[test]
    fn test_json_expanded_has_communities() {
        let mut hierarchy = triangle_hierarchy();
        let mut buf = Vec::new();
        write_json(&mut hierarchy, Detail::Communities, &mut buf).unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        let root_id = doc["root"][0].to_string();
        let shares = &doc["communities"][&root_id];
        assert_eq!(shares["0"], json!(1.0));
        assert_eq!(shares["1"], json!(1.0));
        assert_eq!(shares["2"], json!(1.0));
        assert!(doc.get("levels").is_none());
    }

    #[test]
    fn test_json_detailed_has_levels() {
        let mut hierarchy = triangle_hierarchy();
        let mut buf = Vec::new();
        write_json(&mut hierarchy, Detail::Links, &mut buf).unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        let levels = doc["levels"].as_array().unwrap();
        assert_eq!(levels.len(), 1);
        let root_id = doc["root"][0].to_string();
        // The triangle cluster carries its whole weight as a self link.
        assert_eq!(levels[0][&root_id][&root_id], json!(3.0));
    }

    #[test]
    fn test_output_is_deterministic() {
        let render = || {
            let mut hierarchy = triangle_hierarchy();
            let mut buf = Vec::new();
            write_json(&mut hierarchy, Detail::Links, &mut buf).unwrap();
            String::from_utf8(buf).unwrap()
        };
        assert_eq!(render(), render());
    }
}
