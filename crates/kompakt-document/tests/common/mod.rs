// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared fixtures for the integration tests. Every document is built in
// memory with lopdf or zip.

#![allow(dead_code)]

use std::io::{Cursor, Read, Write};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use kompakt_document::transcode::RasterTranscoder;
use kompakt_document::transcode::image::encode_to_format;
use lopdf::{Document, Object, Stream, dictionary};
use tracing_subscriber::EnvFilter;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const MIMETYPE: &[u8] = b"application/epub+zip";

/// Install a log subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

// ---------------------------------------------------------------------------
// Rasters
// ---------------------------------------------------------------------------

pub fn gradient(width: u32, height: u32, seed: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            ((x + seed) % 256) as u8,
            ((y + seed * 3) % 256) as u8,
            ((x + y) % 256) as u8,
        ])
    }))
}

/// Deterministic noise; compresses badly at any quality.
pub fn noise(width: u32, height: u32) -> DynamicImage {
    let mut state: u32 = 0x9e37_79b9;
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |_, _| {
        let mut next = || {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 24) as u8
        };
        Rgb([next(), next(), next()])
    }))
}

pub fn jpeg(image: &DynamicImage, quality: u8) -> Vec<u8> {
    RasterTranscoder::from_dynamic(image.clone())
        .to_jpeg_bytes(quality)
        .expect("encode jpeg fixture")
}

pub fn png(image: &DynamicImage) -> Vec<u8> {
    encode_to_format(image, ImageFormat::Png).expect("encode png fixture")
}

pub fn gif(image: &DynamicImage) -> Vec<u8> {
    encode_to_format(&DynamicImage::ImageRgba8(image.to_rgba8()), ImageFormat::Gif)
        .expect("encode gif fixture")
}

// ---------------------------------------------------------------------------
// Page documents
// ---------------------------------------------------------------------------

/// `pages` pages, each drawing its own JPEG image and a line of text naming
/// the page. Image `n` is `(base_width + n) x 200` pixels.
pub fn pdf_with_images(pages: u32, base_width: u32) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::new();
    for index in 0..pages {
        let width = base_width + index;
        let image = jpeg(&gradient(width, 200, index), 92);
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => 200,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            image,
        ));
        let content = format!(
            "q 500 0 0 80 50 600 cm /Im0 Do Q\nBT /F1 18 Tf 50 500 Td (page {}) Tj ET\n",
            index + 1
        );
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("Fixture"),
        "Author" => Object::string_literal("Kompakt tests"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("save pdf fixture");
    bytes
}

// ---------------------------------------------------------------------------
// Packages
// ---------------------------------------------------------------------------

/// A package whose first entry is a stored `mimetype`, followed by `entries`
/// in order, all stored.
pub fn package(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let stored = FileOptions::default().compression_method(CompressionMethod::Stored);
    writer.start_file("mimetype", stored).expect("mimetype");
    writer.write_all(MIMETYPE).expect("write mimetype");
    for (name, data) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, stored).expect("directory");
            continue;
        }
        writer.start_file(*name, stored).expect("entry");
        writer.write_all(data).expect("write entry");
    }
    writer.finish().expect("finish package").into_inner()
}

/// One entry read back from a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub method: CompressionMethod,
    pub data: Vec<u8>,
}

pub fn read_package(bytes: &[u8]) -> Vec<Entry> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("open package");
    (0..archive.len())
        .map(|index| {
            let mut file = archive.by_index(index).expect("entry");
            let mut data = Vec::new();
            file.read_to_end(&mut data).expect("read entry");
            Entry {
                name: file.name().to_string(),
                method: file.compression(),
                data,
            }
        })
        .collect()
}

pub fn entry<'a>(entries: &'a [Entry], name: &str) -> &'a Entry {
    entries
        .iter()
        .find(|entry| entry.name == name)
        .unwrap_or_else(|| panic!("missing entry {name}"))
}

pub const CHAPTER: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
<html xmlns=\"http://www.w3.org/1999/xhtml\">\n\
  <head>\n    <title>Chapter</title>\n    <!-- generated -->\n  </head>\n\
  <body>\n    <h1>One</h1>\n    <p>It   was a\n      dark night.</p>\n  </body>\n</html>\n";

pub const STYLE: &str = "/* book */\nbody {\n  margin: 0 ;\n  font-family: \"Iowan Old Style\", serif;\n}\n\nh1 , h2 {\n  color: #333;\n}\n";

pub const PACKAGE_DOCUMENT: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
<package xmlns=\"http://www.idpf.org/2007/opf\" version=\"3.0\">\n\
  <!-- generated -->\n\
  <metadata>\n    <dc:title>One</dc:title>\n  </metadata>\n\
  <manifest>\n    <item id=\"ch1\" href=\"ch1.xhtml\" media-type=\"application/xhtml+xml\"/>\n  </manifest>\n\
</package>\n";

/// A one-page document whose only image is drawn by a form XObject.
pub fn pdf_with_form_image(width: u32) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => 300,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        jpeg(&gradient(width, 300, 3), 92),
    ));
    let form_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![0.into(), 0.into(), 1.into(), 1.into()],
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
        },
        b"q 1 0 0 1 0 0 cm /Im0 Do Q".to_vec(),
    ));
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        b"q 500 0 0 80 50 600 cm /Fm0 Do Q".to_vec(),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Fm0" => form_id },
        },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("save pdf fixture");
    bytes
}
