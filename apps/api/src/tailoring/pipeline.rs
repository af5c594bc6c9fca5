//! Resume tailoring: orchestrates the full pipeline.
//!
//! Flow: unzip → parse document → snapshot → rewrite (LLM) →
//!       reinject into a clone → serialize → zip.
//!
//! The parsed upload is never mutated; reinjection always works on a clone,
//! so a failed or repeated rewrite never needs the bytes re-uploaded.
//! Zip and XML work runs on the blocking pool; only the rewrite call is async.

use anyhow::anyhow;
use bytes::Bytes;
use tracing::info;

use crate::docx::package::DEFAULT_MAX_PART_BYTES;
use crate::docx::DocxPackage;
use crate::errors::AppError;
use crate::llm_client::GenerationParams;
use crate::tailoring::prompts::REWRITE_SYSTEM;
use crate::tailoring::reinject::{reinject, ReinjectReport, SlotPolicy};
use crate::tailoring::rewriter::{RewriteRequest, TextRewriter};
use crate::tailoring::snapshot::Snapshot;

/// Default snapshot budget in characters.
pub const DEFAULT_SNAPSHOT_CHAR_LIMIT: usize = 12_000;

#[derive(Debug, Clone, Copy)]
pub struct TailorOptions {
    pub snapshot_char_limit: usize,
    /// Largest uncompressed size accepted for any part of the upload.
    pub max_part_bytes: u64,
    pub slot_policy: SlotPolicy,
    pub params: GenerationParams,
}

impl Default for TailorOptions {
    fn default() -> Self {
        Self {
            snapshot_char_limit: DEFAULT_SNAPSHOT_CHAR_LIMIT,
            max_part_bytes: DEFAULT_MAX_PART_BYTES,
            slot_policy: SlotPolicy::default(),
            params: GenerationParams::default(),
        }
    }
}

#[derive(Debug)]
pub struct TailoredResume {
    /// The rewritten `.docx`.
    pub document: Vec<u8>,
    pub snapshot: Snapshot,
    pub report: ReinjectReport,
}

async fn run_blocking<T, F>(job: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| AppError::Internal(anyhow!("Document task failed: {e}")))?
}

/// Parses an upload and builds its snapshot without calling the model.
pub async fn snapshot_resume(bytes: Bytes, options: &TailorOptions) -> Result<Snapshot, AppError> {
    let TailorOptions {
        snapshot_char_limit,
        max_part_bytes,
        ..
    } = *options;
    run_blocking(move || {
        let package = DocxPackage::from_bytes(&bytes, max_part_bytes)?;
        let document = package.document()?;
        Ok(Snapshot::build(&document, snapshot_char_limit))
    })
    .await
}

/// Runs the full tailoring pipeline on one uploaded resume.
pub async fn tailor_resume(
    bytes: Bytes,
    job_description: &str,
    rewriter: &dyn TextRewriter,
    options: &TailorOptions,
) -> Result<TailoredResume, AppError> {
    // Step 1: Parse the upload and snapshot it
    let TailorOptions {
        snapshot_char_limit,
        max_part_bytes,
        slot_policy,
        params,
    } = *options;
    let (package, original, snapshot) = run_blocking(move || {
        let package = DocxPackage::from_bytes(&bytes, max_part_bytes)?;
        let original = package.document()?;
        let snapshot = Snapshot::build(&original, snapshot_char_limit);
        Ok((package, original, snapshot))
    })
    .await?;

    if snapshot.lines.is_empty() {
        return Err(AppError::Validation(
            "The document contains no text to tailor.".to_string(),
        ));
    }
    info!(
        "Snapshot: {} lines, {} characters (truncated: {})",
        snapshot.lines.len(),
        snapshot.char_count,
        snapshot.truncated
    );

    // Step 2: Rewrite
    let revised = rewriter
        .rewrite(&RewriteRequest {
            system: REWRITE_SYSTEM,
            snapshot: &snapshot.text,
            job_description,
            params,
        })
        .await?;

    // Step 3: Reinject into a private copy and serialize
    let (document, report) = run_blocking(move || {
        let mut package = package;
        let mut copy = original.clone();
        let report = reinject(&mut copy, &revised, slot_policy);
        let document = package
            .write_with(&copy)
            .map_err(|e| AppError::Internal(anyhow!("Failed to write tailored document: {e}")))?;
        Ok((document, report))
    })
    .await?;

    info!(
        "Tailored resume written: {} bytes, {}/{} slots filled",
        document.len(),
        report.applied,
        report.slots
    );

    Ok(TailoredResume {
        document,
        snapshot,
        report,
    })
}
