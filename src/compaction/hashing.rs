//! Content hashing of the object graph.
//!
//! Each object gets a shallow digest of its own canonical bytes, computed in
//! parallel, then a deep hash that folds in the deep hashes of everything it
//! references. Objects on a reference cycle, and pages, hash by identity.

use super::graph::ObjectGraph;
use crate::writer::ObjectSerializer;
use rayon::prelude::*;
use sha2::{Digest, Sha256};

/// SHA-256 output.
pub type Hash = [u8; 32];

const NULL_EDGE: &[u8] = b"null";
const IDENTITY: &[u8] = b"identity";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Open(usize),
    Done,
}

/// Digest of each node's canonical serialization, references written bare.
pub fn shallow_digests(graph: &ObjectGraph) -> Vec<Hash> {
    graph
        .nodes
        .par_iter()
        .map(|node| {
            let bytes = ObjectSerializer::canonical().serialize(&node.object);
            let mut hasher = Sha256::new();
            hasher.update(&bytes);
            finish(hasher)
        })
        .collect()
}

/// Deep content hash of every node.
///
/// Two nodes share a hash only if their canonical bytes match and so do the
/// deep hashes of their referenced objects, edge by edge.
pub fn deep_hashes(graph: &ObjectGraph, shallow: &[Hash]) -> Vec<Hash> {
    let n = graph.len();
    let mut visit = vec![Visit::New; n];
    let mut identity: Vec<bool> = graph.nodes.iter().map(|node| node.is_page).collect();
    let mut hashes = vec![[0u8; 32]; n];
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..n {
        if visit[root] != Visit::New {
            continue;
        }
        visit[root] = Visit::Open(0);
        stack.push((root, 0));

        while let Some(top) = stack.last_mut() {
            let (node, next) = *top;

            if let Some(edge) = graph.edges[node].get(next) {
                top.1 += 1;
                let Some(child) = *edge else { continue };

                match visit[child] {
                    Visit::New => {
                        visit[child] = Visit::Open(stack.len());
                        stack.push((child, 0));
                    },
                    Visit::Open(depth) => {
                        for &(member, _) in &stack[depth..] {
                            identity[member] = true;
                        }
                    },
                    Visit::Done => {},
                }
                continue;
            }

            stack.pop();
            hashes[node] = if identity[node] {
                identity_hash(graph, node)
            } else {
                let mut hasher = Sha256::new();
                hasher.update(shallow[node]);
                for edge in &graph.edges[node] {
                    match edge {
                        Some(child) => hasher.update(hashes[*child]),
                        None => hasher.update(NULL_EDGE),
                    }
                }
                finish(hasher)
            };
            visit[node] = Visit::Done;
        }
    }

    let cyclic = identity
        .iter()
        .zip(&graph.nodes)
        .filter(|(id, node)| **id && !node.is_page)
        .count();
    if cyclic > 0 {
        log::debug!("{} objects on reference cycles hashed by identity", cyclic);
    }

    hashes
}

fn identity_hash(graph: &ObjectGraph, node: usize) -> Hash {
    let (doc, obj_ref) = graph.nodes[node].key;
    let mut hasher = Sha256::new();
    hasher.update(IDENTITY);
    hasher.update((doc as u64).to_be_bytes());
    hasher.update(obj_ref.id.to_be_bytes());
    hasher.update(obj_ref.gen.to_be_bytes());
    finish(hasher)
}

fn finish(hasher: Sha256) -> Hash {
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}
