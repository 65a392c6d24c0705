// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Archive decomposition — iterate entries in stored order and classify each by
// filename suffix.

use std::io::{Cursor, Read};

use image::ImageReader;
use kompakt_core::error::{CompressionError, Result};
use kompakt_core::{AssetKind, ColorMode};
use tracing::{debug, info, instrument, warn};
use zip::ZipArchive;

use super::{DESIGNATED_ENTRY, MAX_ENTRY_BYTES};
use crate::asset::{Asset, AssetIdAllocator, AssetMeta, AssetOrigin, ImageEncoding, ImageMeta};
use crate::container::Decomposition;
use crate::skeleton::{ArchiveEntry, ArchiveSkeleton, EntryPayload, Skeleton};

/// Parse ZIP bytes into an archive skeleton and its assets.
#[instrument(skip_all, fields(bytes_len = bytes.len()))]
pub fn decompose(bytes: &[u8]) -> Result<Decomposition> {
    decompose_with_limit(bytes, MAX_ENTRY_BYTES)
}

/// As [`decompose`], rejecting any entry that inflates past `entry_limit`.
///
/// Sizes declared in the ZIP directory are not trusted; buffers grow only
/// with the bytes actually read.
pub(crate) fn decompose_with_limit(bytes: &[u8], entry_limit: u64) -> Result<Decomposition> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|err| CompressionError::Decode(format!("failed to read ZIP package: {}", err)))?;

    info!(entries = archive.len(), "Decomposing package");

    let mut ids = AssetIdAllocator::default();
    let mut skeleton = ArchiveSkeleton::default();
    let mut assets = Vec::new();

    for index in 0..archive.len() {
        let mut file = archive.by_index(index).map_err(|err| {
            CompressionError::Decode(format!("failed to read entry #{}: {}", index, err))
        })?;
        let path = file.name().to_owned();

        if file.is_dir() {
            skeleton.entries.push(ArchiveEntry {
                path,
                payload: EntryPayload::Directory,
            });
            continue;
        }

        let mut data = Vec::new();
        file.by_ref()
            .take(entry_limit + 1)
            .read_to_end(&mut data)
            .map_err(|err| {
                CompressionError::Decode(format!("failed to inflate {}: {}", path, err))
            })?;
        if data.len() as u64 > entry_limit {
            warn!(path, entry_limit, "Entry inflates past the limit");
            return Err(CompressionError::Decode(format!(
                "{} inflates past {} bytes",
                path, entry_limit
            )));
        }

        if path == DESIGNATED_ENTRY && skeleton.designated().is_none() {
            debug!(path, "Designated first entry found");
            skeleton.entries.push(ArchiveEntry {
                path,
                payload: EntryPayload::Designated(data),
            });
            continue;
        }

        let kind = classify_path(&path);
        let meta = match kind {
            AssetKind::Image => AssetMeta::Image(probe_image(&path, &data)),
            _ => AssetMeta::None,
        };
        let id = ids.allocate();
        debug!(%id, ?kind, path, "Asset found");

        skeleton.entries.push(ArchiveEntry {
            path: path.clone(),
            payload: EntryPayload::Asset(id),
        });
        assets.push(Asset::new(id, kind, AssetOrigin::Entry { path }, data, meta));
    }

    debug!(assets = assets.len(), "Package decomposed");

    Ok(Decomposition {
        skeleton: Skeleton::Archive(skeleton),
        assets,
    })
}

/// Suffix-based classification, case-insensitive.
pub fn classify_path(path: &str) -> AssetKind {
    let extension = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" | "png" | "gif" | "webp" | "bmp" => AssetKind::Image,
        "html" | "htm" | "xhtml" | "xml" | "opf" | "ncx" => AssetKind::Markup,
        "css" => AssetKind::Style,
        _ => AssetKind::Other,
    }
}

/// Read dimensions without decoding pixels.
fn probe_image(path: &str, data: &[u8]) -> ImageMeta {
    let extension = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    let encoding = match extension.as_str() {
        "jpg" | "jpeg" => ImageEncoding::Jpeg,
        "png" => ImageEncoding::Png,
        "gif" => ImageEncoding::Gif,
        "webp" => ImageEncoding::WebP,
        "bmp" => ImageEncoding::Bmp,
        other => ImageEncoding::Unsupported(format!(".{} image", other)),
    };

    let dimensions = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()
        .and_then(|reader| reader.into_dimensions().ok());
    let (width, height) = dimensions.unwrap_or_else(|| {
        warn!(path, "Image header unreadable");
        (0, 0)
    });

    ImageMeta {
        width,
        height,
        original_len: data.len(),
        encoding,
        color: ColorMode::Color,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::ZipWriter;
    use zip::write::FileOptions;

    fn package(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            if name.ends_with('/') {
                writer
                    .add_directory(*name, FileOptions::default())
                    .expect("directory");
                continue;
            }
            writer.start_file(*name, FileOptions::default()).expect("start");
            writer.write_all(data).expect("write");
        }
        writer.finish().expect("finish").into_inner()
    }

    #[test]
    fn classification_by_suffix() {
        assert_eq!(classify_path("OEBPS/images/Cover.JPG"), AssetKind::Image);
        assert_eq!(classify_path("OEBPS/text/ch01.xhtml"), AssetKind::Markup);
        assert_eq!(classify_path("OEBPS/styles/main.css"), AssetKind::Style);
        assert_eq!(classify_path("README"), AssetKind::Other);
        assert_eq!(classify_path("OEBPS/fonts/serif.otf"), AssetKind::Other);
    }

    #[test]
    fn package_documents_are_markup() {
        assert_eq!(classify_path("OEBPS/content.opf"), AssetKind::Markup);
        assert_eq!(classify_path("OEBPS/toc.NCX"), AssetKind::Markup);
        assert_eq!(classify_path("META-INF/container.xml"), AssetKind::Markup);
    }

    #[test]
    fn entries_keep_stored_order() {
        let bytes = package(&[
            ("mimetype", b"application/epub+zip"),
            ("META-INF/", b""),
            ("META-INF/container.xml", b"<container/>"),
            ("OEBPS/b.xhtml", b"<p>b</p>"),
            ("OEBPS/a.css", b"p{}"),
        ]);
        let decomposition = decompose(&bytes).expect("decompose");
        let Skeleton::Archive(skeleton) = &decomposition.skeleton else {
            panic!("expected archive skeleton");
        };
        let paths: Vec<&str> = skeleton.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            [
                "mimetype",
                "META-INF/",
                "META-INF/container.xml",
                "OEBPS/b.xhtml",
                "OEBPS/a.css"
            ]
        );
        assert_eq!(skeleton.entries[1].payload, EntryPayload::Directory);
    }

    #[test]
    fn designated_entry_is_not_an_asset() {
        let bytes = package(&[
            ("OEBPS/a.xhtml", b"<p/>"),
            ("mimetype", b"application/epub+zip"),
        ]);
        let decomposition = decompose(&bytes).expect("decompose");
        let Skeleton::Archive(skeleton) = &decomposition.skeleton else {
            panic!("expected archive skeleton");
        };
        let designated = skeleton.designated().expect("designated entry");
        assert_eq!(
            designated.payload,
            EntryPayload::Designated(b"application/epub+zip".to_vec())
        );
        assert_eq!(decomposition.assets.len(), 1);
    }

    #[test]
    fn unreadable_image_header_still_yields_image_asset() {
        let bytes = package(&[("OEBPS/broken.png", b"not a png")]);
        let decomposition = decompose(&bytes).expect("decompose");
        let asset = &decomposition.assets[0];
        assert_eq!(asset.kind, AssetKind::Image);
        let meta = asset.image_meta().expect("image meta");
        assert_eq!((meta.width, meta.height), (0, 0));
        assert_eq!(meta.original_len, 9);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = decompose(b"PK\x03\x04 definitely not a zip").expect_err("garbage");
        assert!(matches!(err, CompressionError::Decode(_)));
    }

    #[test]
    fn entry_inflating_past_the_limit_is_a_decode_error() {
        let chapter = vec![b' '; 4096];
        let bytes = package(&[("OEBPS/big.xhtml", &chapter)]);
        let err = decompose_with_limit(&bytes, 1024).expect_err("over limit");
        assert!(matches!(err, CompressionError::Decode(_)));

        let decomposition = decompose_with_limit(&bytes, 4096).expect("at limit");
        assert_eq!(decomposition.assets[0].bytes.len(), 4096);
    }

    /// One stored entry holding `hi` whose central directory record claims a
    /// ZIP64 uncompressed size of 2^62 bytes.
    fn oversized_claim() -> Vec<u8> {
        let name = b"a";
        let data = b"hi";
        let mut crc = flate2::Crc::new();
        crc.update(data);
        let crc = crc.sum();

        let mut zip = Vec::new();
        zip.extend(0x0403_4b50u32.to_le_bytes());
        for field in [20u16, 0, 0, 0, 0] {
            zip.extend(field.to_le_bytes());
        }
        zip.extend(crc.to_le_bytes());
        zip.extend(2u32.to_le_bytes());
        zip.extend(2u32.to_le_bytes());
        zip.extend(1u16.to_le_bytes());
        zip.extend(0u16.to_le_bytes());
        zip.extend(name);
        zip.extend(data);

        let central_offset = zip.len() as u32;
        zip.extend(0x0201_4b50u32.to_le_bytes());
        for field in [45u16, 45, 0, 0, 0, 0] {
            zip.extend(field.to_le_bytes());
        }
        zip.extend(crc.to_le_bytes());
        zip.extend(2u32.to_le_bytes());
        zip.extend(u32::MAX.to_le_bytes());
        for field in [1u16, 12, 0, 0, 0] {
            zip.extend(field.to_le_bytes());
        }
        zip.extend(0u32.to_le_bytes());
        zip.extend(0u32.to_le_bytes());
        zip.extend(name);
        zip.extend(1u16.to_le_bytes());
        zip.extend(8u16.to_le_bytes());
        zip.extend((1u64 << 62).to_le_bytes());
        let central_size = zip.len() as u32 - central_offset;

        zip.extend(0x0605_4b50u32.to_le_bytes());
        for field in [0u16, 0, 1, 1] {
            zip.extend(field.to_le_bytes());
        }
        zip.extend(central_size.to_le_bytes());
        zip.extend(central_offset.to_le_bytes());
        zip.extend(0u16.to_le_bytes());
        zip
    }

    #[test]
    fn declared_entry_size_is_not_preallocated() {
        match decompose(&oversized_claim()) {
            Ok(decomposition) => assert_eq!(decomposition.assets[0].bytes, b"hi"),
            Err(err) => assert!(matches!(err, CompressionError::Decode(_))),
        }
    }
}
