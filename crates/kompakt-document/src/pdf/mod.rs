// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — page document decomposition and reassembly using `lopdf`.

pub mod decompose;
pub mod reassemble;

pub use decompose::decompose;
pub use reassemble::reassemble;

use lopdf::{Dictionary, Document, Object, ObjectId};

/// Page attributes a page may inherit from its ancestors in the page tree.
pub(crate) const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guards page-tree walks against malformed parent cycles.
const MAX_TREE_DEPTH: usize = 64;

/// Follow a reference (if any) to the object it names.
pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Look up `key` on the page or the nearest ancestor that defines it.
pub(crate) fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut node_id = page_id;
    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.get_dictionary(node_id).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        node_id = node.get(b"Parent").and_then(Object::as_reference).ok()?;
    }
    None
}

/// Filter names applied to a stream, outermost first.
pub(crate) fn filter_names(doc: &Document, dict: &Dictionary) -> Vec<Vec<u8>> {
    let Some(filter) = dict.get(b"Filter").ok().and_then(|f| resolve(doc, f)) else {
        return Vec::new();
    };
    match filter {
        Object::Name(name) => vec![name.clone()],
        Object::Array(items) => items
            .iter()
            .filter_map(|item| match resolve(doc, item) {
                Some(Object::Name(name)) => Some(name.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Whether `DecodeParms` asks for a PNG/TIFF predictor.
pub(crate) fn has_predictor(doc: &Document, dict: &Dictionary) -> bool {
    let Some(parms) = dict.get(b"DecodeParms").ok().and_then(|p| resolve(doc, p)) else {
        return false;
    };
    let predictor_in = |parms: &Dictionary| {
        parms
            .get(b"Predictor")
            .and_then(Object::as_i64)
            .map(|p| p > 1)
            .unwrap_or(false)
    };
    match parms {
        Object::Dictionary(parms) => predictor_in(parms),
        Object::Array(items) => items.iter().any(|item| match resolve(doc, item) {
            Some(Object::Dictionary(parms)) => predictor_in(parms),
            _ => false,
        }),
        _ => false,
    }
}

pub(crate) fn name_of(object: &Object) -> Option<&[u8]> {
    match object {
        Object::Name(name) => Some(name.as_slice()),
        _ => None,
    }
}
