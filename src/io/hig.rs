//! Parser for the line-oriented `.hig` graph format.
//!
//! ```text
//! # comment
//! /Graph weighted:1
//! /Nodes 5 0
//! /Edges
//! 0 > 1 2:0.5
//! /Arcs
//! 3 > 4:2
//! ```
//!
//! Sections are introduced by `/Name` (case-insensitive). `/Graph`, when
//! present, must come first; `weighted` defaults to 1. `/Nodes` declares
//! the node count and optionally the first id of a contiguous range:
//! with a start id the nodes are pre-declared and every link endpoint is
//! validated against them, without one nodes are created on demand.
//! `/Edges` hold undirected links, `/Arcs` directed ones, as lines
//! `src > dst[:weight] ...`; weight tokens are rejected on unweighted
//! graphs. A self reference sets the node's self weight exactly once.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{Error, Result};
use crate::graph::{GraphBuilder, Id, InputLink, Weight};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Graph,
    Nodes,
    Edges,
    Arcs,
}

/// Parse a `.hig` document from a reader into a graph builder.
///
/// # Errors
/// [`Error::InvalidInput`] with a line reference on malformed content,
/// [`Error::UnknownNode`] when a link escapes a declared node range,
/// [`Error::Io`] on read failures.
pub fn parse_hig<R: BufRead>(reader: R, shuffle: bool) -> Result<GraphBuilder> {
    let mut weighted = true;
    let mut nodes_num: usize = 0;
    let mut start_id: Option<Id> = None;
    let mut section = Section::None;
    let mut builder: Option<GraphBuilder> = None;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let lineno = lineno + 1;
        let text = line.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }

        if let Some(header) = text.strip_prefix('/') {
            // Drop a trailing comment from the header line.
            let header = header.split('#').next().unwrap_or("").trim();
            let mut tokens = header.split_whitespace();
            let name = tokens
                .next()
                .ok_or_else(|| invalid(lineno, "empty section header"))?
                .to_ascii_lowercase();
            match name.as_str() {
                "graph" => {
                    if section != Section::None {
                        return Err(invalid(lineno, "Graph section must be the first one"));
                    }
                    section = Section::Graph;
                    while let Some(attr) = tokens.next() {
                        if let Some(value) = attr.strip_prefix("weighted:") {
                            // The value may follow the colon after a space.
                            let value = if value.is_empty() {
                                tokens.next().unwrap_or("")
                            } else {
                                value
                            };
                            weighted = match value {
                                "0" => false,
                                "1" => true,
                                other => {
                                    return Err(invalid(
                                        lineno,
                                        &format!("invalid weighted attribute: {other}"),
                                    ))
                                }
                            };
                        } else {
                            return Err(invalid(
                                lineno,
                                &format!("unknown Graph attribute: {attr}"),
                            ));
                        }
                    }
                }
                "nodes" => {
                    if section != Section::None && section != Section::Graph {
                        return Err(invalid(
                            lineno,
                            "Nodes section must be first or follow the Graph section",
                        ));
                    }
                    section = Section::Nodes;
                    if let Some(num) = tokens.next() {
                        nodes_num = num
                            .parse()
                            .map_err(|_| invalid(lineno, &format!("invalid node count: {num}")))?;
                        if let Some(start) = tokens.next() {
                            let start: Id = start.parse().map_err(|_| {
                                invalid(lineno, &format!("invalid start id: {start}"))
                            })?;
                            start_id = Some(start);
                            let mut gb =
                                GraphBuilder::new(nodes_num).with_weighted(weighted);
                            gb = if shuffle { gb.with_shuffle(true) } else { gb };
                            gb.add_node_range(start, start + nodes_num as Id)?;
                            builder = Some(gb);
                        }
                    }
                }
                "edges" => section = Section::Edges,
                "arcs" => section = Section::Arcs,
                other => {
                    return Err(invalid(lineno, &format!("unknown section is used: {other}")))
                }
            }
            continue;
        }

        // Plain lines only matter inside link sections.
        if section != Section::Edges && section != Section::Arcs {
            continue;
        }
        let directed = section == Section::Arcs;
        let (src, links) = parse_links(text, weighted, lineno)?;
        if links.is_empty() {
            continue;
        }
        let gb = builder.get_or_insert_with(|| {
            let gb = GraphBuilder::new(nodes_num).with_weighted(weighted);
            if shuffle {
                gb.with_shuffle(true)
            } else {
                gb
            }
        });
        if start_id.is_some() {
            gb.add_node_links(src, links, directed)?;
        } else {
            gb.add_node_and_links(src, links, directed)?;
        }
    }

    Ok(builder.unwrap_or_else(|| GraphBuilder::new(0).with_weighted(weighted)))
}

/// Parse a `.hig` file from disk.
///
/// # Errors
/// As [`parse_hig`], plus [`Error::Io`] when the file cannot be opened.
pub fn parse_hig_file<P: AsRef<Path>>(path: P, shuffle: bool) -> Result<GraphBuilder> {
    let file = File::open(path)?;
    parse_hig(BufReader::new(file), shuffle)
}

/// Parse one `src > dst[:w] ...` line.
fn parse_links(text: &str, weighted: bool, lineno: usize) -> Result<(Id, Vec<InputLink>)> {
    let (src, rest) = text
        .split_once('>')
        .ok_or_else(|| invalid(lineno, "link line misses '>'"))?;
    let src: Id = src
        .trim()
        .parse()
        .map_err(|_| invalid(lineno, &format!("invalid source id: {}", src.trim())))?;

    let mut links = Vec::new();
    for token in rest.split_whitespace() {
        let link = match token.split_once(':') {
            Some((id, weight)) => {
                if !weighted {
                    return Err(invalid(
                        lineno,
                        &format!("weight on an unweighted graph: {token}"),
                    ));
                }
                let id: Id = id
                    .parse()
                    .map_err(|_| invalid(lineno, &format!("invalid dest id: {id}")))?;
                let weight: Weight = weight
                    .parse()
                    .map_err(|_| invalid(lineno, &format!("invalid weight: {weight}")))?;
                InputLink::weighted(id, weight)
            }
            None => {
                let id: Id = token
                    .parse()
                    .map_err(|_| invalid(lineno, &format!("invalid dest id: {token}")))?;
                InputLink::unweighted(id)
            }
        };
        links.push(link);
    }
    Ok((src, links))
}

fn invalid(lineno: usize, message: &str) -> Error {
    Error::InvalidInput {
        message: format!("line {lineno}: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(text: &str) -> Result<GraphBuilder> {
        parse_hig(Cursor::new(text), false)
    }

    #[test]
    fn test_comments_and_blanks_ignored() {
        let builder = parse(
            "# heading\n\n/Graph weighted:1\n# another\n/Edges\n0 > 1 2\n1 > 2\n",
        )
        .unwrap();
        assert_eq!(builder.len(), 3);
        assert!(!builder.is_directed());
    }

    #[test]
    fn test_declared_range_validates_endpoints() {
        let err = parse("/Nodes 3 0\n/Edges\n0 > 5\n").unwrap_err();
        assert_eq!(err, Error::UnknownNode { id: 5 });
    }

    #[test]
    fn test_nodes_without_start_creates_on_demand() {
        let builder = parse("/Nodes 4\n/Edges\n7 > 9\n").unwrap();
        assert_eq!(builder.len(), 2);
    }

    #[test]
    fn test_nodes_with_start_and_no_links() {
        let builder = parse("/Nodes 1 0\n").unwrap();
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn test_arcs_are_directed() {
        let builder = parse("/Arcs\n0 > 1:2.5\n").unwrap();
        assert!(builder.is_directed());
    }

    #[test]
    fn test_unweighted_rejects_weight_tokens() {
        let err = parse("/Graph weighted:0\n/Edges\n0 > 1:2\n").unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_graph_must_be_first() {
        let err = parse("/Nodes 2 0\n/Graph weighted:1\n").unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }

    #[test]
    fn test_unknown_section_rejected() {
        let err = parse("/Bogus\n").unwrap_err();
        assert!(err.to_string().contains("unknown section"));
    }

    #[test]
    fn test_header_tail_comment_stripped() {
        let builder = parse("/Nodes 2 0  # two nodes\n/Edges\n0 > 1\n").unwrap();
        assert_eq!(builder.len(), 2);
    }

    #[test]
    fn test_self_reference_sets_self_weight() {
        let builder = parse("/Edges\n0 > 0:6 1\n").unwrap();
        let nodes = builder.finalize();
        let node0 = nodes.iter().find(|n| n.id == 0).unwrap();
        assert_eq!(node0.self_weight, 6.0);
    }

    #[test]
    fn test_duplicate_self_reference_rejected() {
        let err = parse("/Edges\n0 > 0:6\n/Arcs\n0 > 0:6\n").unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }

    #[test]
    fn test_malformed_link_line() {
        let err = parse("/Edges\n0 1 2\n").unwrap_err();
        assert!(err.to_string().contains("'>'"));
        let err = parse("/Edges\n0 > x\n").unwrap_err();
        assert!(err.to_string().contains("invalid dest id"));
    }
}
