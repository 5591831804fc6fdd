//! Object graph reachable from the pages of one or more documents.

use crate::decoders::{flate_encode, Filter};
use crate::document::PdfDocument;
use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef};
use std::collections::HashMap;

/// Identifies an object across several input documents.
pub type NodeKey = (usize, ObjectRef);

/// One reachable object.
#[derive(Debug, Clone)]
pub struct Node {
    /// Source document and object
    pub key: NodeKey,
    /// Object value; references still point into the source document
    pub object: Object,
    /// True for page leaves, which are never merged
    pub is_page: bool,
}

/// Every object reachable from the pages of the inputs, in first-seen order.
#[derive(Debug, Default)]
pub struct ObjectGraph {
    /// Nodes in discovery order
    pub nodes: Vec<Node>,
    /// Indices of page nodes in output page order
    pub pages: Vec<usize>,
    index: HashMap<NodeKey, usize>,
    /// Outgoing edges per node, parallel to each object's `collect_references` order
    pub edges: Vec<Vec<Option<usize>>>,
}

impl ObjectGraph {
    /// Walk the page trees of `documents` in order.
    ///
    /// Each page's `/Parent` is dropped; page-tree nodes and catalogs reached
    /// through other references read as `Null`, as do references that do not
    /// resolve.
    ///
    /// # Errors
    ///
    /// `WrongPassword` for an encrypted input that was not authenticated, and
    /// any error from walking a page tree (including `CorruptXRef` cycles).
    pub fn collect(documents: &mut [PdfDocument]) -> Result<Self> {
        let mut graph = Self::default();

        for (doc_index, doc) in documents.iter_mut().enumerate() {
            if !doc.is_authenticated() {
                return Err(Error::WrongPassword);
            }

            let pages = doc.pages()?;
            log::debug!("Document {} has {} pages", doc_index, pages.len());

            // Pages are registered before any walk so links between pages
            // land on the page nodes themselves.
            let first = graph.pages.len();
            for page in pages {
                let mut dict = page.dict;
                dict.remove("Parent");
                let key = (doc_index, page.id);
                if graph.index.contains_key(&key) {
                    return Err(Error::CorruptXRef(format!("page {} appears twice in the page tree", page.id)));
                }
                let idx = graph.push(key, Object::Dictionary(dict), true);
                graph.pages.push(idx);
            }
            for i in first..graph.pages.len() {
                let idx = graph.pages[i];
                graph.walk_from(doc, doc_index, idx)?;
            }
        }

        graph.build_edges();
        Ok(graph)
    }

    /// Number of reachable objects.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if nothing is reachable.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node index for a source object.
    pub fn lookup(&self, key: &NodeKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    fn push(&mut self, key: NodeKey, object: Object, is_page: bool) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(Node { key, object, is_page });
        self.index.insert(key, idx);
        idx
    }

    /// Depth-first discovery of everything `start` references.
    fn walk_from(&mut self, doc: &mut PdfDocument, doc_index: usize, start: usize) -> Result<()> {
        let mut stack = vec![start];

        while let Some(idx) = stack.pop() {
            let mut refs = Vec::new();
            self.nodes[idx].object.collect_references(&mut refs);

            for r in refs.into_iter().rev() {
                let key = (doc_index, r);
                if self.index.contains_key(&key) {
                    continue;
                }
                let Some(object) = load_reachable(doc, r)? else {
                    continue;
                };
                let child = self.push(key, object, false);
                stack.push(child);
            }
        }
        Ok(())
    }

    fn build_edges(&mut self) {
        self.edges = self
            .nodes
            .iter()
            .map(|node| {
                let mut refs = Vec::new();
                node.object.collect_references(&mut refs);
                refs.into_iter()
                    .map(|r| self.index.get(&(node.key.0, r)).copied())
                    .collect()
            })
            .collect();
    }
}

/// Load an object to copy, or `None` if it must become `Null`.
fn load_reachable(doc: &mut PdfDocument, r: ObjectRef) -> Result<Option<Object>> {
    let object = match doc.get_object(r) {
        Ok(object) => object,
        Err(e @ (Error::ObjectNotFound(..) | Error::ParseError { .. } | Error::CircularReference(_))) => {
            log::debug!("Dropping unresolvable reference {}: {}", r, e);
            return Ok(None);
        },
        Err(e) => return Err(e),
    };

    match object.dict_type() {
        Some("Pages") | Some("Catalog") => {
            log::debug!("Dropping reference {} into the old document structure", r);
            Ok(None)
        },
        _ => {
            let mut object = recode_ascii_stream(object, doc)?;
            // Rewritten by the serializer; keeps indirect lengths out of the graph.
            if let Object::Stream { dict, .. } = &mut object {
                dict.remove("Length");
            }
            Ok(Some(object))
        },
    }
}

/// Re-encode a stream whose whole filter chain is ASCII armour with Flate.
fn recode_ascii_stream(object: Object, doc: &PdfDocument) -> Result<Object> {
    let filters = object.filters();
    let ascii_only = object.is_stream()
        && !filters.is_empty()
        && filters.iter().all(|f| Filter::from_name(f).is_some_and(|f| f.is_ascii()));
    if !ascii_only {
        return Ok(object);
    }

    let decoded = object.decode_stream_with_options(doc.options())?.into_result()?;
    match object {
        Object::Stream { mut dict, .. } => {
            dict.insert("Filter".to_string(), Object::name("FlateDecode"));
            dict.remove("DecodeParms");
            Ok(Object::stream(dict, flate_encode(&decoded)?))
        },
        other => Ok(other),
    }
}
