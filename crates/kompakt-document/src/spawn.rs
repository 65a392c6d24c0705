// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Background jobs on the tokio blocking pool.

use kompakt_core::error::{CompressionError, Result};
use kompakt_core::{CompressionLevel, JobId, PipelineConfig, ProgressEvent};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::job::{CancellationToken, Compressor};
use crate::report::CompressionReport;

/// Handle to a job running in the background.
///
/// Progress events arrive on an unbounded channel that closes when the job
/// ends. Dropping the handle does not stop the job; call [`cancel`](Self::cancel).
#[derive(Debug)]
pub struct CompressionHandle {
    id: JobId,
    progress: UnboundedReceiver<ProgressEvent>,
    cancel: CancellationToken,
    task: JoinHandle<Result<(Vec<u8>, CompressionReport)>>,
}

impl CompressionHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Request cancellation; honoured at the next asset or phase boundary.
    pub fn cancel(&self) {
        debug!(job_id = %self.id, "Cancellation requested");
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Next progress event, or `None` once the job has finished.
    pub async fn next_progress(&mut self) -> Option<ProgressEvent> {
        self.progress.recv().await
    }

    /// Wait for the job and return its output and report.
    pub async fn finish(self) -> Result<(Vec<u8>, CompressionReport)> {
        self.task
            .await
            .map_err(|err| CompressionError::Worker(err.to_string()))?
    }
}

/// Start compressing `input` at `level` on the blocking pool.
///
/// Must be called from within a tokio runtime. Fails immediately only if
/// `config` is invalid.
pub fn spawn_compression(
    input: Vec<u8>,
    level: CompressionLevel,
    config: PipelineConfig,
) -> Result<CompressionHandle> {
    let compressor = Compressor::new(config)?;
    let mut job = compressor.job(level);
    let id = job.id();
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let (sender, progress) = mpsc::unbounded_channel();

    let task = tokio::task::spawn_blocking(move || {
        // A closed receiver only means nobody is listening.
        let mut forward = |event: ProgressEvent| {
            let _ = sender.send(event);
        };
        job.run(&input, &token, &mut forward)
    });
    info!(job_id = %id, %level, "Compression job spawned");

    Ok(CompressionHandle {
        id,
        progress,
        cancel,
        task,
    })
}
