// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Archive reassembly — designated entry first and stored, everything else in
// original order and deflated at the profile's level.

use std::collections::HashMap;
use std::io::{Cursor, Write};

use kompakt_core::CompressionProfile;
use kompakt_core::error::{CompressionError, Result};
use tracing::{debug, instrument};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::asset::{Asset, AssetId};
use crate::skeleton::{ArchiveEntry, ArchiveSkeleton, EntryPayload};

/// Serialise a package from its skeleton and (possibly replaced) assets.
#[instrument(skip_all, fields(entries = skeleton.entries.len(), assets = assets.len()))]
pub fn reassemble(
    skeleton: ArchiveSkeleton,
    assets: &[Asset],
    profile: &CompressionProfile,
) -> Result<Vec<u8>> {
    let by_id: HashMap<AssetId, &Asset> = assets.iter().map(|asset| (asset.id, asset)).collect();

    let stored = FileOptions::default().compression_method(CompressionMethod::Stored);
    // The writer rejects a deflate level of 0; storing is the equivalent.
    let compressed = match profile.stream_deflate_level {
        0 => stored,
        level => FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(level as i32)),
    };

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    let (designated, rest): (Vec<&ArchiveEntry>, Vec<&ArchiveEntry>) = skeleton
        .entries
        .iter()
        .partition(|entry| entry.is_designated());

    for entry in designated.into_iter().chain(rest) {
        match &entry.payload {
            EntryPayload::Directory => {
                writer
                    .add_directory(entry.path.as_str(), compressed)
                    .map_err(|err| zip_error(&entry.path, err))?;
            }
            EntryPayload::Designated(data) => {
                debug!(path = %entry.path, "Writing designated entry stored");
                write_entry(&mut writer, &entry.path, data, stored)?;
            }
            EntryPayload::Asset(id) => {
                let asset = by_id.get(id).ok_or_else(|| {
                    CompressionError::Reassembly(format!(
                        "{} for {} is missing",
                        id, entry.path
                    ))
                })?;
                write_entry(&mut writer, &entry.path, &asset.bytes, compressed)?;
            }
        }
    }

    let output = writer
        .finish()
        .map_err(|err| CompressionError::Reassembly(format!("failed to finish ZIP: {}", err)))?
        .into_inner();

    debug!(output_bytes = output.len(), "Package reassembled");
    Ok(output)
}

fn write_entry(
    writer: &mut ZipWriter<Cursor<Vec<u8>>>,
    path: &str,
    data: &[u8],
    options: FileOptions,
) -> Result<()> {
    writer
        .start_file(path, options)
        .map_err(|err| zip_error(path, err))?;
    writer.write_all(data).map_err(|err| {
        CompressionError::Reassembly(format!("failed to write {}: {}", path, err))
    })
}

fn zip_error(path: &str, err: zip::result::ZipError) -> CompressionError {
    CompressionError::Reassembly(format!("failed to add {}: {}", path, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::decompose;
    use crate::container::Decomposition;
    use crate::skeleton::Skeleton;
    use kompakt_core::{CompressionLevel, StrategyResolver};
    use std::io::Read;
    use zip::ZipArchive;

    fn package() -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let deflated = FileOptions::default();
        writer.start_file("OEBPS/ch1.xhtml", deflated).expect("start");
        writer.write_all(b"<p>one</p>").expect("write");
        writer.add_directory("OEBPS/img/", deflated).expect("dir");
        // Deliberately not first, and deflated.
        writer.start_file("mimetype", deflated).expect("start");
        writer.write_all(b"application/epub+zip").expect("write");
        writer.start_file("OEBPS/ch2.xhtml", deflated).expect("start");
        writer.write_all(b"<p>two</p>").expect("write");
        writer.finish().expect("finish").into_inner()
    }

    fn rebuilt(level: CompressionLevel) -> Vec<u8> {
        let Decomposition { skeleton, assets } = decompose(&package()).expect("decompose");
        let Skeleton::Archive(skeleton) = skeleton else {
            panic!("expected archive skeleton");
        };
        let profile = StrategyResolver::default().resolve(level);
        reassemble(skeleton, &assets, &profile).expect("reassemble")
    }

    #[test]
    fn designated_entry_moves_first_and_is_stored() {
        let bytes = rebuilt(CompressionLevel::Medium);
        let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("output parses");

        let mut first = archive.by_index(0).expect("first entry");
        assert_eq!(first.name(), "mimetype");
        assert_eq!(first.compression(), CompressionMethod::Stored);
        let mut data = Vec::new();
        first.read_to_end(&mut data).expect("read");
        assert_eq!(data, b"application/epub+zip");
    }

    #[test]
    fn remaining_entries_keep_order_and_are_deflated() {
        let bytes = rebuilt(CompressionLevel::High);
        let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("output parses");
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).expect("entry").name().to_owned())
            .collect();
        assert_eq!(
            names,
            ["mimetype", "OEBPS/ch1.xhtml", "OEBPS/img/", "OEBPS/ch2.xhtml"]
        );

        let chapter = archive.by_name("OEBPS/ch2.xhtml").expect("chapter");
        assert_eq!(chapter.compression(), CompressionMethod::Deflated);
    }

    #[test]
    fn missing_asset_is_a_reassembly_error() {
        let skeleton = ArchiveSkeleton {
            entries: vec![ArchiveEntry {
                path: "OEBPS/gone.xhtml".into(),
                payload: EntryPayload::Asset(AssetId(7)),
            }],
        };
        let profile = StrategyResolver::default().resolve(CompressionLevel::Low);
        let err = reassemble(skeleton, &[], &profile).expect_err("missing asset");
        assert!(matches!(err, CompressionError::Reassembly(_)));
    }
}
