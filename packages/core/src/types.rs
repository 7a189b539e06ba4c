//! Core vocabulary of the GXL document model.
//!
//! This module defines the element kinds that make up a document
//! ([`ElementKind`]), the handle used to address elements ([`ElementId`]),
//! and the small enumerations carried by graph and connection attributes
//! ([`EdgeMode`], [`Direction`]). Every enum formats to and parses from its
//! exact wire-format spelling.

use serde::{Deserialize, Serialize};

/// Stable handle of an element inside a [`Document`](crate::Document) arena.
///
/// Handles are never reused: an element that is detached from the tree keeps
/// its handle so that it can be re-attached by an undo or a later insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementId(pub(crate) u32);

impl ElementId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of an element. Determines its wire tag, the attributes it may
/// carry, and the children it may contain (see [`rules`](crate::rules)).
///
/// Serialises as the lowercase wire tag (e.g. `"relend"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// The document root container.
    Gxl,
    /// A graph: a container of nodes, edges, and relations.
    Graph,
    /// A vertex.
    Node,
    /// A binary connection between two graph elements.
    Edge,
    /// An n-ary relation; its ends are [`ElementKind::Relend`] children.
    Rel,
    /// One end of a relation.
    Relend,
    /// A named, typed attribute holding exactly one value.
    Attr,
    /// A link to the schema type of its parent.
    Type,
    /// A value holding a URI.
    Locator,
    Bool,
    Int,
    Float,
    String,
    Enum,
    /// Unordered collection with multiplicity.
    Bag,
    /// Unordered collection without duplicates.
    Set,
    /// Ordered collection.
    Seq,
    /// Ordered, heterogeneous tuple.
    Tup,
}

impl ElementKind {
    /// Every kind, in wire-vocabulary order.
    pub const ALL: [ElementKind; 18] = [
        ElementKind::Gxl,
        ElementKind::Graph,
        ElementKind::Node,
        ElementKind::Edge,
        ElementKind::Rel,
        ElementKind::Relend,
        ElementKind::Attr,
        ElementKind::Type,
        ElementKind::Locator,
        ElementKind::Bool,
        ElementKind::Int,
        ElementKind::Float,
        ElementKind::String,
        ElementKind::Enum,
        ElementKind::Bag,
        ElementKind::Set,
        ElementKind::Seq,
        ElementKind::Tup,
    ];

    /// The element's tag in the exchange syntax.
    pub fn tag(self) -> &'static str {
        match self {
            ElementKind::Gxl => "gxl",
            ElementKind::Graph => "graph",
            ElementKind::Node => "node",
            ElementKind::Edge => "edge",
            ElementKind::Rel => "rel",
            ElementKind::Relend => "relend",
            ElementKind::Attr => "attr",
            ElementKind::Type => "type",
            ElementKind::Locator => "locator",
            ElementKind::Bool => "bool",
            ElementKind::Int => "int",
            ElementKind::Float => "float",
            ElementKind::String => "string",
            ElementKind::Enum => "enum",
            ElementKind::Bag => "bag",
            ElementKind::Set => "set",
            ElementKind::Seq => "seq",
            ElementKind::Tup => "tup",
        }
    }

    /// Node, edge, or relation: something a tentacle may point at.
    pub fn is_graph_element(self) -> bool {
        matches!(self, ElementKind::Node | ElementKind::Edge | ElementKind::Rel)
    }

    /// Edge or relation: something that owns tentacles.
    pub fn is_local_connection(self) -> bool {
        matches!(self, ElementKind::Edge | ElementKind::Rel)
    }

    /// Any member of the value algebra, including locators.
    pub fn is_value(self) -> bool {
        self.is_atomic() || self.is_composite() || self == ElementKind::Locator
    }

    /// Scalar kinds whose payload is text.
    pub fn is_atomic(self) -> bool {
        matches!(
            self,
            ElementKind::Bool
                | ElementKind::Int
                | ElementKind::Float
                | ElementKind::String
                | ElementKind::Enum
        )
    }

    /// Container kinds whose payload is a sequence of values.
    pub fn is_composite(self) -> bool {
        matches!(
            self,
            ElementKind::Bag | ElementKind::Set | ElementKind::Seq | ElementKind::Tup
        )
    }

    /// Kinds that may carry named `attr` children.
    pub fn is_attributed(self) -> bool {
        matches!(
            self,
            ElementKind::Graph
                | ElementKind::Node
                | ElementKind::Edge
                | ElementKind::Rel
                | ElementKind::Relend
                | ElementKind::Attr
        )
    }
}

/// Formats the kind as its wire tag (e.g. `"relend"`).
impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Parses an [`ElementKind`] from its wire tag.
impl std::str::FromStr for ElementKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ElementKind::ALL
            .iter()
            .copied()
            .find(|k| k.tag() == s)
            .ok_or_else(|| format!("unknown element {:?}", s))
    }
}

/// How the connections of a graph are directed.
///
/// The `default*` modes only supply a default that individual connections
/// may override with `isdirected`; the plain modes are fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeMode {
    #[default]
    Directed,
    Undirected,
    DefaultDirected,
    DefaultUndirected,
}

impl EdgeMode {
    /// Direction a connection has when it does not say otherwise.
    pub fn directed_by_default(self) -> bool {
        matches!(self, EdgeMode::Directed | EdgeMode::DefaultDirected)
    }

    /// Whether a connection's explicit `isdirected` value is compatible.
    pub fn permits(self, isdirected: bool) -> bool {
        match self {
            EdgeMode::Directed => isdirected,
            EdgeMode::Undirected => !isdirected,
            EdgeMode::DefaultDirected | EdgeMode::DefaultUndirected => true,
        }
    }
}

impl std::fmt::Display for EdgeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeMode::Directed => write!(f, "directed"),
            EdgeMode::Undirected => write!(f, "undirected"),
            EdgeMode::DefaultDirected => write!(f, "defaultdirected"),
            EdgeMode::DefaultUndirected => write!(f, "defaultundirected"),
        }
    }
}

impl std::str::FromStr for EdgeMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "directed" => Ok(EdgeMode::Directed),
            "undirected" => Ok(EdgeMode::Undirected),
            "defaultdirected" => Ok(EdgeMode::DefaultDirected),
            "defaultundirected" => Ok(EdgeMode::DefaultUndirected),
            _ => Err(format!(
                "unknown edge mode {:?}; expected one of: \
                 directed, undirected, defaultdirected, defaultundirected",
                s
            )),
        }
    }
}

/// Direction of a tentacle relative to its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
    #[default]
    None,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::In => write!(f, "in"),
            Direction::Out => write!(f, "out"),
            Direction::None => write!(f, "none"),
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(Direction::In),
            "out" => Ok(Direction::Out),
            "none" => Ok(Direction::None),
            _ => Err(format!(
                "unknown direction {:?}; expected one of: in, out, none",
                s
            )),
        }
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_roundtrip() {
        for kind in ElementKind::ALL {
            assert_eq!(kind.tag().parse::<ElementKind>(), Ok(kind));
        }
        assert!("hyperedge".parse::<ElementKind>().is_err());
    }

    #[test]
    fn kind_classification() {
        assert!(ElementKind::Rel.is_graph_element());
        assert!(ElementKind::Rel.is_local_connection());
        assert!(!ElementKind::Node.is_local_connection());
        assert!(!ElementKind::Graph.is_graph_element());
        assert!(ElementKind::Locator.is_value());
        assert!(!ElementKind::Locator.is_atomic());
        assert!(ElementKind::Tup.is_composite());
        assert!(ElementKind::Relend.is_attributed());
        assert!(!ElementKind::Type.is_attributed());
    }

    #[test]
    fn edge_mode_rules() {
        assert_eq!(EdgeMode::default(), EdgeMode::Directed);
        assert!(!EdgeMode::Directed.permits(false));
        assert!(!EdgeMode::Undirected.permits(true));
        assert!(EdgeMode::DefaultUndirected.permits(true));
        assert!(EdgeMode::DefaultDirected.directed_by_default());
        assert!(!EdgeMode::DefaultUndirected.directed_by_default());
        assert_eq!(
            "defaultundirected".parse::<EdgeMode>(),
            Ok(EdgeMode::DefaultUndirected)
        );
    }

    #[test]
    fn direction_parse() {
        assert_eq!("out".parse::<Direction>(), Ok(Direction::Out));
        assert_eq!(Direction::In.to_string(), "in");
        assert!("sideways".parse::<Direction>().is_err());
    }
}
