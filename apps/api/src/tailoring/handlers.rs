//! Axum route handlers for the Tailoring API.

use axum::{
    extract::{Multipart, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::MODEL;
use crate::state::AppState;
use crate::tailoring::pipeline::{snapshot_resume, tailor_resume};

pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const OUTPUT_DISPOSITION: &str = "attachment; filename=\"tailored_resume.docx\"";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// Multipart fields accepted by the resume endpoints.
#[derive(Debug, Default)]
struct ResumeForm {
    resume: Option<Bytes>,
    job_description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    pub lines: Vec<String>,
    pub char_count: usize,
    pub truncated: bool,
}

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub ok: bool,
    pub model: &'static str,
    pub reply: String,
}

async fn read_form(mut multipart: Multipart) -> Result<ResumeForm, AppError> {
    let mut form = ResumeForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("resume") => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read resume upload: {e}")))?;
                form.resume = Some(data);
            }
            Some("job_description") => {
                let text = field.text().await.map_err(|e| {
                    AppError::Validation(format!("Could not read job_description: {e}"))
                })?;
                form.job_description = Some(text);
            }
            _ => {}
        }
    }
    Ok(form)
}

fn require_resume(form: &ResumeForm) -> Result<&Bytes, AppError> {
    match &form.resume {
        Some(bytes) if !bytes.is_empty() => Ok(bytes),
        _ => Err(AppError::Validation(
            "A .docx file must be uploaded in the 'resume' field".to_string(),
        )),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/resumes/snapshot
///
/// Returns the lines that would be sent to the model, without calling it.
pub async fn handle_snapshot(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SnapshotResponse>, AppError> {
    let form = read_form(multipart).await?;
    let resume = require_resume(&form)?;

    let snapshot = snapshot_resume(resume.clone(), &state.config.tailor_options()).await?;

    Ok(Json(SnapshotResponse {
        lines: snapshot.lines,
        char_count: snapshot.char_count,
        truncated: snapshot.truncated,
    }))
}

/// POST /api/v1/resumes/tailor
///
/// Rewrites the uploaded resume for the job description and returns the new
/// .docx. Slot/line alignment is reported in `x-tailor-*` headers.
pub async fn handle_tailor(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = read_form(multipart).await?;
    let resume = require_resume(&form)?;
    let job_description = form
        .job_description
        .as_deref()
        .map(str::trim)
        .filter(|jd| !jd.is_empty())
        .ok_or_else(|| AppError::Validation("job_description cannot be empty".to_string()))?;

    let request_id = Uuid::new_v4();
    let options = state.config.tailor_options();
    let tailored = tailor_resume(resume.clone(), job_description, state.rewriter.as_ref(), &options)
        .instrument(info_span!("tailor", %request_id))
        .await?;

    info!(
        "Request {request_id}: {} slots, {} lines, {} dropped, {} blanked",
        tailored.report.slots, tailored.report.lines, tailored.report.dropped, tailored.report.blanked
    );

    let report = tailored.report;
    let mut response = (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(DOCX_MIME)),
            (
                header::CONTENT_DISPOSITION,
                HeaderValue::from_static(OUTPUT_DISPOSITION),
            ),
        ],
        tailored.document,
    )
        .into_response();

    let headers = response.headers_mut();
    for (name, value) in [
        ("x-tailor-slots", report.slots),
        ("x-tailor-lines", report.lines),
        ("x-tailor-dropped", report.dropped),
        ("x-tailor-blanked", report.blanked),
    ] {
        headers.insert(HeaderName::from_static(name), HeaderValue::from(value));
    }

    Ok(response)
}

/// GET /api/v1/llm/ping
///
/// Verifies the configured API key with a one-shot call.
pub async fn handle_llm_ping(State(state): State<AppState>) -> Result<Json<PingResponse>, AppError> {
    let reply = state.llm.ping().await?;
    Ok(Json(PingResponse {
        ok: true,
        model: MODEL,
        reply,
    }))
}
