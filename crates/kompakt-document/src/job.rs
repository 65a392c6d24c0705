// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Compression jobs — detect, decompose, transcode each asset, reassemble.
//
// A job runs on the calling thread and processes assets one at a time, so at
// most one decoded raster is alive and progress is reported in order. Asset
// failures are recorded in the report; only container-level failures and
// cancellation fail the job.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use kompakt_core::error::{CompressionError, Result};
use kompakt_core::{
    CompressionLevel, CompressionProfile, JobId, JobStatus, PipelineConfig, ProgressEvent,
    StrategyResolver,
};
use tracing::{debug, info, instrument, warn};

use crate::container::{self, Decomposition};
use crate::detect::detect_container;
use crate::report::{AssetSkip, CompressionReport, sha256_hex};
use crate::transcode::{self, TranscodeOutcome};

/// Percent reached when decomposition finishes.
const DECOMPOSED: u8 = 20;
/// Percent reached when every asset has been visited.
const TRANSCODED: u8 = 80;
const DONE: u8 = 100;

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Shared cancel flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(CompressionError::Cancelled);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Clamps reported percentages so they never decrease.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressTracker {
    last: u8,
}

impl ProgressTracker {
    /// Record `percent` and return the value to report.
    pub fn advance(&mut self, percent: u8) -> u8 {
        self.last = percent.min(DONE).max(self.last);
        self.last
    }

    pub fn last(&self) -> u8 {
        self.last
    }
}

/// Percent reached after `done` of `total` assets have been visited.
pub fn transcode_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return TRANSCODED;
    }
    let span = usize::from(TRANSCODED - DECOMPOSED);
    DECOMPOSED + (span * done.min(total) / total) as u8
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// One compression run over one input. A job runs at most once.
#[derive(Debug)]
pub struct Job {
    id: JobId,
    level: CompressionLevel,
    profile: CompressionProfile,
    max_input_bytes: u64,
    status: JobStatus,
    progress: ProgressTracker,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(level: CompressionLevel, profile: CompressionProfile) -> Self {
        Self {
            id: JobId::new(),
            level,
            profile,
            max_input_bytes: PipelineConfig::default().max_input_bytes,
            status: JobStatus::Pending,
            progress: ProgressTracker::default(),
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Reject inputs larger than `limit` bytes.
    pub fn with_input_limit(mut self, limit: u64) -> Self {
        self.max_input_bytes = limit;
        self
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn level(&self) -> CompressionLevel {
        self.level
    }

    pub fn profile(&self) -> &CompressionProfile {
        &self.profile
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Last percent reported.
    pub fn progress(&self) -> u8 {
        self.progress.last()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Run the job to completion.
    ///
    /// `on_progress` is called at every phase transition and after every
    /// asset. On error, including cancellation, the job ends `Failed` and no
    /// bytes are returned.
    #[instrument(skip_all, fields(job_id = %self.id, level = %self.level, input_len = input.len()))]
    pub fn run(
        &mut self,
        input: &[u8],
        cancel: &CancellationToken,
        on_progress: &mut dyn FnMut(ProgressEvent),
    ) -> Result<(Vec<u8>, CompressionReport)> {
        if self.status != JobStatus::Pending {
            return Err(CompressionError::Config(format!(
                "job {} has already run",
                self.id
            )));
        }

        let result = self.execute(input, cancel, on_progress);
        self.finished_at = Some(Utc::now());
        match &result {
            Ok((output, _)) => {
                self.status = JobStatus::Done;
                info!(before = input.len(), after = output.len(), "Job finished");
            }
            Err(err) => {
                self.status = JobStatus::Failed;
                warn!(%err, "Job failed");
            }
        }
        result
    }

    fn execute(
        &mut self,
        input: &[u8],
        cancel: &CancellationToken,
        on_progress: &mut dyn FnMut(ProgressEvent),
    ) -> Result<(Vec<u8>, CompressionReport)> {
        let started = Instant::now();
        let size = input.len() as u64;
        if size > self.max_input_bytes {
            return Err(CompressionError::InputTooLarge {
                size,
                limit: self.max_input_bytes,
            });
        }

        // -- Decompose --------------------------------------------------------
        self.status = JobStatus::Decomposing;
        self.emit(on_progress, 0, "Analysing document".into());
        let kind = detect_container(input)?;
        let Decomposition {
            skeleton,
            mut assets,
        } = container::decompose(input, kind)?;
        let total = assets.len();
        info!(?kind, assets = total, "Container decomposed");
        self.emit(on_progress, DECOMPOSED, format!("Found {} assets", total));
        cancel.check()?;

        // -- Transcode --------------------------------------------------------
        self.status = JobStatus::Transcoding { done: 0, total };
        let mut replaced = 0;
        let mut skipped = Vec::new();
        for (index, asset) in assets.iter_mut().enumerate() {
            cancel.check()?;
            match transcode::transcode(asset, &self.profile) {
                TranscodeOutcome::Replaced { bytes, meta } => {
                    asset.replace(bytes, meta);
                    replaced += 1;
                }
                TranscodeOutcome::Skipped(reason) => skipped.push(AssetSkip {
                    asset: asset.id,
                    label: asset.origin.to_string(),
                    reason,
                }),
            }
            let done = index + 1;
            self.status = JobStatus::Transcoding { done, total };
            self.emit(
                on_progress,
                transcode_percent(done, total),
                format!("Compressed asset {} of {}", done, total),
            );
        }
        debug!(replaced, skipped = skipped.len(), "Assets transcoded");
        cancel.check()?;

        // -- Reassemble -------------------------------------------------------
        self.status = JobStatus::Reassembling;
        self.emit(on_progress, TRANSCODED, "Rebuilding document".into());
        let output = container::reassemble(skeleton, &assets, &self.profile)?;
        drop(assets);
        cancel.check()?;

        let report = CompressionReport {
            job_id: self.id,
            level: self.level,
            container: kind,
            original_size: input.len(),
            compressed_size: output.len(),
            assets_total: total,
            assets_replaced: replaced,
            skipped,
            input_sha256: sha256_hex(input),
            output_sha256: sha256_hex(&output),
            finished_at: Utc::now(),
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        self.emit(on_progress, DONE, "Done".into());
        Ok((output, report))
    }

    fn emit(&mut self, on_progress: &mut dyn FnMut(ProgressEvent), percent: u8, message: String) {
        let percent = self.progress.advance(percent);
        debug!(percent, %message, "Progress");
        on_progress(ProgressEvent { percent, message });
    }
}

// ---------------------------------------------------------------------------
// Compressor
// ---------------------------------------------------------------------------

/// Entry point holding a validated configuration. Cheap to clone; every call
/// creates an independent job.
#[derive(Debug, Clone)]
pub struct Compressor {
    config: PipelineConfig,
    resolver: StrategyResolver,
}

impl Default for Compressor {
    fn default() -> Self {
        Self {
            config: PipelineConfig::default(),
            resolver: StrategyResolver::default(),
        }
    }
}

impl Compressor {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let resolver = StrategyResolver::from_config(&config)?;
        Ok(Self { config, resolver })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Level for a caller-supplied tag; missing or unknown tags use the
    /// configured default.
    pub fn level_for(&self, tag: Option<&str>) -> CompressionLevel {
        match tag.map(|tag| (tag, CompressionLevel::try_from_tag(tag))) {
            Some((_, Some(level))) => level,
            Some((tag, None)) => {
                warn!(tag, default = %self.config.default_level, "unknown compression level");
                self.config.default_level
            }
            None => self.config.default_level,
        }
    }

    /// A fresh job for `level`, with its profile resolved once.
    pub fn job(&self, level: CompressionLevel) -> Job {
        Job::new(level, self.resolver.resolve(level)).with_input_limit(self.config.max_input_bytes)
    }

    /// Compress `input` at the level named by `level_tag`.
    pub fn compress(
        &self,
        input: &[u8],
        level_tag: &str,
        mut on_progress: impl FnMut(ProgressEvent),
    ) -> Result<Vec<u8>> {
        let level = self.level_for(Some(level_tag));
        let (output, _) =
            self.compress_with_report(input, level, &CancellationToken::new(), &mut on_progress)?;
        Ok(output)
    }

    /// Compress `input` at `level`, returning the output and its report.
    pub fn compress_with_report(
        &self,
        input: &[u8],
        level: CompressionLevel,
        cancel: &CancellationToken,
        on_progress: &mut dyn FnMut(ProgressEvent),
    ) -> Result<(Vec<u8>, CompressionReport)> {
        self.job(level).run(input, cancel, on_progress)
    }
}

/// Compress a PDF or EPUB at the level named by `level_tag` (`"low"`,
/// `"medium"` or `"high"`; anything else is treated as medium).
pub fn compress(
    input: &[u8],
    level_tag: &str,
    on_progress: impl FnMut(ProgressEvent),
) -> Result<Vec<u8>> {
    Compressor::default().compress(input, level_tag, on_progress)
}
