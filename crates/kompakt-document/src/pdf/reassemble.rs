// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reassembly — patch transcoded payloads into the source objects, then copy
// every page in order into a fresh document and serialise it.

use std::collections::{BTreeMap, HashMap};

use kompakt_core::error::{CompressionError, Result};
use kompakt_core::{AssetKind, ColorMode, CompressionProfile};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::{debug, info, instrument, warn};

use super::{INHERITABLE_KEYS, inherited_attribute, name_of};
use crate::asset::{Asset, AssetId, AssetMeta, ImageMeta};
use crate::skeleton::PageSkeleton;

/// Document information fields cleared when metadata is stripped.
const INFO_FIELDS: [&str; 6] = ["Title", "Author", "Subject", "Keywords", "Producer", "Creator"];

/// Rebuild a PDF from its skeleton and (possibly replaced) assets.
#[instrument(skip_all, fields(pages = skeleton.pages.len(), assets = assets.len()))]
pub fn reassemble(
    skeleton: PageSkeleton,
    assets: &[Asset],
    profile: &CompressionProfile,
) -> Result<Vec<u8>> {
    let PageSkeleton {
        mut source,
        pages,
        asset_objects,
    } = skeleton;

    let patched = patch_replaced(&mut source, assets, &asset_objects)?;
    info!(patched, "Replaced payloads patched");

    let mut target = Document::with_version(source.version.clone());
    let pages_id = target.new_object_id();
    let mut kids = Vec::with_capacity(pages.len());

    let mut cloner = ObjectCloner::new(&source, &mut target);
    for page in &pages {
        kids.push(Object::Reference(cloner.clone_page(page.object_id, pages_id)?));
    }
    let info = if profile.strip_metadata {
        None
    } else {
        source
            .trailer
            .get(b"Info")
            .ok()
            .map(|info| cloner.clone_object(info))
    };
    cloner.drain();

    let page_count = kids.len() as i64;
    let mut pages_dict = Dictionary::new();
    pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
    pages_dict.set("Kids", Object::Array(kids));
    pages_dict.set("Count", Object::Integer(page_count));
    target.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = target.add_object(catalog);
    target.trailer.set("Root", Object::Reference(catalog_id));

    match info {
        Some(info) => target.trailer.set("Info", info),
        None => {
            let mut cleared = Dictionary::new();
            for field in INFO_FIELDS {
                cleared.set(field, Object::String(Vec::new(), StringFormat::Literal));
            }
            let info_id = target.add_object(cleared);
            target.trailer.set("Info", Object::Reference(info_id));
            debug!("Document metadata cleared");
        }
    }

    let mut output = Vec::new();
    target.save_to(&mut output).map_err(|err| {
        CompressionError::Reassembly(format!("failed to serialise PDF: {}", err))
    })?;

    debug!(output_bytes = output.len(), "PDF reassembled");
    Ok(output)
}

/// Write every replaced asset's bytes into its source stream object.
fn patch_replaced(
    source: &mut Document,
    assets: &[Asset],
    asset_objects: &BTreeMap<AssetId, ObjectId>,
) -> Result<usize> {
    let mut patched = 0;
    for asset in assets.iter().filter(|asset| asset.is_replaced()) {
        let object_id = asset_objects.get(&asset.id).ok_or_else(|| {
            CompressionError::Reassembly(format!("{} has no slot in the page skeleton", asset.id))
        })?;
        let stream = match source.get_object_mut(*object_id) {
            Ok(Object::Stream(stream)) => stream,
            _ => {
                return Err(CompressionError::Reassembly(format!(
                    "object {:?} for {} is not a stream",
                    object_id, asset.id
                )));
            }
        };

        match (&asset.kind, &asset.meta) {
            (AssetKind::Image, AssetMeta::Image(meta)) => patch_image(stream, meta),
            (AssetKind::GenericStream, _) => {
                stream.dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
                stream.dict.remove(b"DecodeParms");
            }
            (kind, _) => {
                warn!(id = %asset.id, ?kind, "Replaced asset of unexpected kind left as-is");
                continue;
            }
        }
        stream.set_content(asset.bytes.clone());
        patched += 1;
    }
    Ok(patched)
}

/// Re-describe an image XObject as a baseline JPEG.
fn patch_image(stream: &mut Stream, meta: &ImageMeta) {
    let color_space: &[u8] = match meta.color {
        ColorMode::Grayscale => b"DeviceGray",
        ColorMode::Color => b"DeviceRGB",
    };
    let dict = &mut stream.dict;
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
    dict.set("Width", Object::Integer(i64::from(meta.width)));
    dict.set("Height", Object::Integer(i64::from(meta.height)));
    dict.set("ColorSpace", Object::Name(color_space.to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict.remove(b"DecodeParms");
}

/// Copies objects from one document into another, following references.
///
/// Each source object is copied at most once, so shared resources stay shared
/// and reference cycles terminate. Referenced objects are queued rather than
/// copied recursively; `drain` empties the queue.
struct ObjectCloner<'a> {
    source: &'a Document,
    target: &'a mut Document,
    copied: HashMap<ObjectId, ObjectId>,
    pending: Vec<(ObjectId, ObjectId)>,
}

impl<'a> ObjectCloner<'a> {
    fn new(source: &'a Document, target: &'a mut Document) -> Self {
        Self {
            source,
            target,
            copied: HashMap::new(),
            pending: Vec::new(),
        }
    }

    /// Copy a page, flattening inherited attributes onto it and re-parenting
    /// it under `parent`.
    fn clone_page(&mut self, page_id: ObjectId, parent: ObjectId) -> Result<ObjectId> {
        let source = self.source;
        let Object::Reference(new_id) = self.clone_reference(page_id) else {
            return Err(CompressionError::Reassembly(format!(
                "page object {:?} cannot be read",
                page_id
            )));
        };

        let mut inherited = Vec::new();
        for key in INHERITABLE_KEYS {
            if let Some(value) = inherited_attribute(source, page_id, key) {
                inherited.push((key, self.clone_object(value)));
            }
        }
        self.drain();

        let Ok(Object::Dictionary(page)) = self.target.get_object_mut(new_id) else {
            return Err(CompressionError::Reassembly(format!(
                "page object {:?} is not a dictionary",
                page_id
            )));
        };
        for (key, value) in inherited {
            if !page.has(key) {
                page.set(key.to_vec(), value);
            }
        }
        page.set("Parent", Object::Reference(parent));
        Ok(new_id)
    }

    /// Map a source reference to its target id, queueing the object for
    /// copying on first sight.
    fn clone_reference(&mut self, id: ObjectId) -> Object {
        if let Some(existing) = self.copied.get(&id) {
            return Object::Reference(*existing);
        }
        if let Err(err) = self.source.get_object(id) {
            warn!(?id, %err, "Cannot resolve reference, using Null");
            return Object::Null;
        }
        let new_id = self.target.new_object_id();
        self.copied.insert(id, new_id);
        self.pending.push((id, new_id));
        Object::Reference(new_id)
    }

    /// Copy every queued object, including those discovered along the way.
    fn drain(&mut self) {
        let source = self.source;
        while let Some((id, new_id)) = self.pending.pop() {
            let cloned = match source.get_object(id) {
                Ok(object) => self.clone_object(object),
                Err(_) => Object::Null,
            };
            self.target.objects.insert(new_id, cloned);
        }
    }

    fn clone_object(&mut self, object: &Object) -> Object {
        match object {
            Object::Reference(id) => self.clone_reference(*id),
            Object::Array(items) => {
                Object::Array(items.iter().map(|item| self.clone_object(item)).collect())
            }
            Object::Dictionary(dict) => Object::Dictionary(self.clone_dictionary(dict)),
            Object::Stream(stream) => {
                let mut cloned = stream.clone();
                cloned.dict = self.clone_dictionary(&stream.dict);
                Object::Stream(cloned)
            }
            other => other.clone(),
        }
    }

    /// Page-tree back-references are dropped; `clone_page` re-parents pages.
    fn clone_dictionary(&mut self, dict: &Dictionary) -> Dictionary {
        let is_tree_node = matches!(
            dict.get(b"Type").ok().and_then(name_of),
            Some(b"Page") | Some(b"Pages")
        );
        let mut cloned = Dictionary::new();
        for (key, value) in dict.iter() {
            if is_tree_node && key.as_slice() == b"Parent" {
                continue;
            }
            cloned.set(key.clone(), self.clone_object(value));
        }
        cloned
    }
}
