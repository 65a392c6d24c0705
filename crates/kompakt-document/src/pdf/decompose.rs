// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF decomposition — walk pages in order, classify every named resource and
// content stream, and lift their payloads out as assets.

use std::collections::BTreeMap;

use kompakt_core::error::{CompressionError, Result};
use kompakt_core::{AssetKind, ColorMode};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info, instrument, warn};

use super::{filter_names, has_predictor, inherited_attribute, name_of, resolve};
use crate::asset::{
    Asset, AssetId, AssetIdAllocator, AssetMeta, AssetOrigin, ImageEncoding, ImageMeta,
    StreamEncoding,
};
use crate::container::Decomposition;
use crate::skeleton::{PageSkeleton, PageSlot, ResourceSlot, Skeleton};

/// How deeply form XObjects nested inside other forms are searched.
const MAX_FORM_DEPTH: usize = 16;

const DEVICE_GRAY: &[u8] = b"DeviceGray";
const DEVICE_RGB: &[u8] = b"DeviceRGB";

/// Parse PDF bytes into a page skeleton and its assets.
#[instrument(skip_all, fields(bytes_len = bytes.len()))]
pub fn decompose(bytes: &[u8]) -> Result<Decomposition> {
    let document = Document::load_mem(bytes)
        .map_err(|err| CompressionError::Decode(format!("failed to parse PDF: {}", err)))?;

    if document.is_encrypted() {
        return Err(CompressionError::Decode(
            "encrypted PDF documents are not supported".into(),
        ));
    }

    let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();
    info!(pages = page_ids.len(), "Decomposing PDF");

    let mut walker = PageWalker {
        doc: &document,
        ids: AssetIdAllocator::default(),
        seen: BTreeMap::new(),
        assets: Vec::new(),
    };

    let mut pages = Vec::with_capacity(page_ids.len());
    for (page_index, page_id) in page_ids.into_iter().enumerate() {
        pages.push(walker.visit_page(page_index, page_id));
    }

    let PageWalker { seen, assets, .. } = walker;
    let asset_objects = seen
        .into_iter()
        .map(|(object_id, asset)| (asset, object_id))
        .collect();

    debug!(assets = assets.len(), "PDF decomposed");

    Ok(Decomposition {
        skeleton: Skeleton::Pages(PageSkeleton {
            source: document,
            pages,
            asset_objects,
        }),
        assets,
    })
}

struct PageWalker<'a> {
    doc: &'a Document,
    ids: AssetIdAllocator,
    /// Object already lifted as an asset, so shared resources map to one id.
    seen: BTreeMap<ObjectId, AssetId>,
    assets: Vec<Asset>,
}

impl PageWalker<'_> {
    fn visit_page(&mut self, page_index: usize, page_id: ObjectId) -> PageSlot {
        let doc = self.doc;
        let mut resources = Vec::new();

        let resource_dict = inherited_attribute(doc, page_id, b"Resources")
            .and_then(|object| resolve(doc, object))
            .and_then(|object| object.as_dict().ok());

        if let Some(resource_dict) = resource_dict {
            self.visit_resources(page_index, resource_dict, "", 0, &mut resources);
        }

        let content_ids = doc.get_page_contents(page_id);
        let mut contents = Vec::with_capacity(content_ids.len());
        for (index, object_id) in content_ids.into_iter().enumerate() {
            let name = if index == 0 {
                "Contents".to_string()
            } else {
                format!("Contents[{}]", index)
            };
            let Ok(Object::Stream(stream)) = doc.get_object(object_id) else {
                continue;
            };
            let asset = self.lift(object_id, page_index, &name, || {
                (
                    AssetKind::GenericStream,
                    AssetMeta::Stream(stream_encoding(doc, stream)),
                    stream.content.clone(),
                )
            });
            contents.push(ResourceSlot {
                category: "Contents".into(),
                name,
                object_id,
                asset,
            });
        }

        PageSlot {
            object_id: page_id,
            resources,
            contents,
        }
    }

    /// Visit every category of a resource dictionary. Resources of form
    /// XObjects are visited too, with slot names prefixed by the form's name.
    fn visit_resources(
        &mut self,
        page_index: usize,
        resource_dict: &Dictionary,
        prefix: &str,
        depth: usize,
        slots: &mut Vec<ResourceSlot>,
    ) {
        let doc = self.doc;
        for (category, entries) in resource_dict.iter() {
            let Some(Object::Dictionary(entries)) = resolve(doc, entries) else {
                continue;
            };
            let category = String::from_utf8_lossy(category).into_owned();
            self.visit_category(page_index, &category, entries, prefix, depth, slots);
        }
    }

    fn visit_category(
        &mut self,
        page_index: usize,
        category: &str,
        entries: &Dictionary,
        prefix: &str,
        depth: usize,
        slots: &mut Vec<ResourceSlot>,
    ) {
        let doc = self.doc;
        for (name, value) in entries.iter() {
            // Only indirect objects can be patched back independently.
            let Object::Reference(object_id) = value else {
                continue;
            };
            let Ok(object) = doc.get_object(*object_id) else {
                continue;
            };

            let name = format!("{}{}", prefix, String::from_utf8_lossy(name));
            let label = format!("{}/{}", category, name);
            let first_sight = !self.seen.contains_key(object_id);
            let asset = self.lift(*object_id, page_index, &label, || {
                classify_resource(doc, category, object)
            });
            let nested = first_sight
                .then(|| form_resources(doc, category, object))
                .flatten();
            let nested_prefix = format!("{}/", name);
            slots.push(ResourceSlot {
                category: category.to_string(),
                name,
                object_id: *object_id,
                asset,
            });

            // Each form is searched once; `seen` also breaks self-referencing forms.
            if let Some(form_dict) = nested {
                if depth < MAX_FORM_DEPTH {
                    self.visit_resources(page_index, form_dict, &nested_prefix, depth + 1, slots);
                } else {
                    warn!(
                        page = page_index + 1,
                        form = %nested_prefix,
                        "Form nesting too deep, not searched"
                    );
                }
            }
        }
    }

    /// Return the asset for `object_id`, creating it on first sight.
    fn lift(
        &mut self,
        object_id: ObjectId,
        page_index: usize,
        name: &str,
        classify: impl FnOnce() -> (AssetKind, AssetMeta, Vec<u8>),
    ) -> AssetId {
        if let Some(existing) = self.seen.get(&object_id) {
            return *existing;
        }

        let (kind, meta, bytes) = classify();
        let id = self.ids.allocate();
        debug!(%id, ?kind, page = page_index + 1, name, "Asset found");
        self.seen.insert(object_id, id);
        self.assets.push(Asset::new(
            id,
            kind,
            AssetOrigin::Page {
                page_index,
                name: name.to_string(),
            },
            bytes,
            meta,
        ));
        id
    }
}

/// The resource dictionary of a form XObject, if `object` is one.
fn form_resources<'a>(
    doc: &'a Document,
    category: &str,
    object: &'a Object,
) -> Option<&'a Dictionary> {
    let Object::Stream(stream) = object else {
        return None;
    };
    let is_form = matches!(stream.dict.get(b"Subtype").ok().and_then(name_of), Some(b"Form"));
    if category != "XObject" || !is_form {
        return None;
    }
    let resources = stream.dict.get(b"Resources").ok()?;
    match resolve(doc, resources)? {
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// Assign the asset kind for one named resource.
fn classify_resource(
    doc: &Document,
    category: &str,
    object: &Object,
) -> (AssetKind, AssetMeta, Vec<u8>) {
    let Object::Stream(stream) = object else {
        return (AssetKind::Other, AssetMeta::None, Vec::new());
    };

    if category != "XObject" {
        return (AssetKind::Other, AssetMeta::None, stream.content.clone());
    }

    match stream.dict.get(b"Subtype").ok().and_then(name_of) {
        Some(b"Image") => (
            AssetKind::Image,
            AssetMeta::Image(image_meta(doc, stream)),
            stream.content.clone(),
        ),
        Some(b"Form") => (
            AssetKind::GenericStream,
            AssetMeta::Stream(stream_encoding(doc, stream)),
            stream.content.clone(),
        ),
        _ => (AssetKind::Other, AssetMeta::None, stream.content.clone()),
    }
}

fn stream_encoding(doc: &Document, stream: &Stream) -> StreamEncoding {
    let filters = filter_names(doc, &stream.dict);
    match filters.as_slice() {
        [] => StreamEncoding::Plain,
        [only] if only == b"FlateDecode" && !has_predictor(doc, &stream.dict) => {
            StreamEncoding::Deflated
        }
        _ => StreamEncoding::Unsupported(format!("filters {}", describe_filters(&filters))),
    }
}

/// Work out how an image XObject's samples are stored.
fn image_meta(doc: &Document, stream: &Stream) -> ImageMeta {
    let dict = &stream.dict;
    let dimension = |key: &[u8]| {
        dict.get(key)
            .ok()
            .and_then(|value| resolve(doc, value))
            .and_then(|value| value.as_i64().ok())
            .and_then(|value| u32::try_from(value).ok())
            .unwrap_or(0)
    };
    let width = dimension(b"Width");
    let height = dimension(b"Height");

    let color_space = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|value| resolve(doc, value));
    let device = color_space.and_then(|space| device_space(doc, space));
    let color = match device {
        Some(DEVICE_GRAY) => ColorMode::Grayscale,
        _ => ColorMode::Color,
    };

    ImageMeta {
        width,
        height,
        original_len: stream.content.len(),
        encoding: image_encoding(doc, dict, color_space.is_some(), device),
        color,
    }
}

/// The device space whose sample layout matches `space`: the device spaces
/// themselves, or an ICC profile with one or three components.
fn device_space(doc: &Document, space: &Object) -> Option<&'static [u8]> {
    match space {
        Object::Name(name) => match name.as_slice() {
            DEVICE_GRAY => Some(DEVICE_GRAY),
            DEVICE_RGB => Some(DEVICE_RGB),
            _ => None,
        },
        Object::Array(items) => {
            let [family, profile] = items.as_slice() else {
                return None;
            };
            if !matches!(resolve(doc, family).and_then(name_of), Some(b"ICCBased")) {
                return None;
            }
            let Some(Object::Stream(profile)) = resolve(doc, profile) else {
                return None;
            };
            let components = profile
                .dict
                .get(b"N")
                .ok()
                .and_then(|value| resolve(doc, value))
                .and_then(|value| value.as_i64().ok());
            match components {
                Some(1) => Some(DEVICE_GRAY),
                Some(3) => Some(DEVICE_RGB),
                _ => None,
            }
        }
        _ => None,
    }
}

fn image_encoding(
    doc: &Document,
    dict: &Dictionary,
    has_color_space: bool,
    device: Option<&[u8]>,
) -> ImageEncoding {
    let unsupported = |reason: &str| ImageEncoding::Unsupported(reason.to_string());

    let is_true = |key: &[u8]| {
        dict.get(key)
            .and_then(Object::as_bool)
            .unwrap_or(false)
    };
    if is_true(b"ImageMask") {
        return unsupported("stencil image mask");
    }
    if dict.has(b"Decode") {
        return unsupported("custom Decode array");
    }
    if let Ok(Object::Array(_)) = dict.get(b"Mask") {
        return unsupported("colour-key mask");
    }

    let filters = filter_names(doc, dict);
    match filters.as_slice() {
        // Without a ColorSpace entry the JPEG's own component count applies.
        [only] if only == b"DCTDecode" => {
            if has_color_space && device.is_none() {
                unsupported("JPEG in a colour space other than RGB or Gray")
            } else {
                ImageEncoding::Jpeg
            }
        }
        [] => raw_samples(doc, dict, device, false),
        [only] if only == b"FlateDecode" => {
            if has_predictor(doc, dict) {
                unsupported("Flate predictor")
            } else {
                raw_samples(doc, dict, device, true)
            }
        }
        _ => ImageEncoding::Unsupported(format!("filters {}", describe_filters(&filters))),
    }
}

fn raw_samples(
    doc: &Document,
    dict: &Dictionary,
    device: Option<&[u8]>,
    deflated: bool,
) -> ImageEncoding {
    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|value| resolve(doc, value))
        .and_then(|value| value.as_i64().ok());
    if bits != Some(8) {
        return ImageEncoding::Unsupported(format!("{:?} bits per component", bits));
    }
    let components = match device {
        Some(DEVICE_GRAY) => 1,
        Some(DEVICE_RGB) => 3,
        _ => return ImageEncoding::Unsupported("colour space is not RGB or Gray".into()),
    };
    ImageEncoding::RawSamples {
        components,
        deflated,
    }
}

fn describe_filters(filters: &[Vec<u8>]) -> String {
    filters
        .iter()
        .map(|name| String::from_utf8_lossy(name).into_owned())
        .collect::<Vec<_>>()
        .join(", ")
}
