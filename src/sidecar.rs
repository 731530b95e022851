//! JSON-lines request loop used by `autoclip serve`.
//!
//! One request per input line: `{"id": 1, "method": "clip.process", "params": {...}}`.
//! Each line written back is a response (`{"id", "result"}` / `{"id", "error"}`)
//! or a progress event. `clip.process` and `media.probe` run as independent
//! tasks, so a long extraction does not hold up later requests. Output lines go
//! through a channel to a single blocking writer, so jobs never block a runtime
//! worker on stdout.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use crate::error::{AppError, ErrorResponse};
use crate::ffmpeg::ProgressCallback;
use crate::pipeline::{ClipPipeline, ClipResponse, SourceMedia};
use crate::platform::Platform;

pub const PROTOCOL_VERSION: u8 = 1;

#[derive(Debug, Deserialize)]
struct RpcRequest {
    id: u64,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, serde::Serialize)]
struct RpcSuccess<T> {
    id: u64,
    result: T,
}

#[derive(Debug, serde::Serialize)]
struct RpcFailure {
    id: u64,
    error: ErrorResponse,
}

#[derive(Debug, serde::Serialize)]
struct RpcEvent {
    event: &'static str,
    payload: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClipProcessParams {
    input_path: PathBuf,
    platform: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaProbeParams {
    input_path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformInfo {
    pub id: Platform,
    pub clip_duration_seconds: u32,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppCapabilities {
    pub protocol_version: u8,
    pub platforms: Vec<PlatformInfo>,
    pub min_start_seconds: u64,
}

pub fn app_capabilities(pipeline: &ClipPipeline) -> AppCapabilities {
    AppCapabilities {
        protocol_version: PROTOCOL_VERSION,
        platforms: Platform::ALL
            .into_iter()
            .map(|id| PlatformInfo {
                id,
                clip_duration_seconds: id.clip_duration_secs(),
            })
            .collect(),
        min_start_seconds: pipeline.min_start_secs(),
    }
}

/// Sending half of the output channel. Cheap to clone into every job.
#[derive(Debug, Clone)]
struct Outbox(mpsc::UnboundedSender<String>);

impl Outbox {
    fn send<T: serde::Serialize>(&self, value: &T) {
        match serde_json::to_string(value) {
            Ok(line) => {
                if self.0.send(line).is_err() {
                    log::error!(target: "autoclip::sidecar", "Output writer is gone; dropping line");
                }
            }
            Err(e) => log::error!(target: "autoclip::sidecar", "Failed to serialize response: {}", e),
        }
    }

    fn respond<T: serde::Serialize>(&self, id: u64, result: Result<T, ErrorResponse>) {
        match result {
            Ok(result) => self.send(&RpcSuccess { id, result }),
            Err(error) => self.send(&RpcFailure { id, error }),
        }
    }

    fn fail(&self, id: u64, err: &AppError) {
        self.respond::<()>(id, Err(ErrorResponse::from(err)));
    }

    fn progress(&self, id: u64, progress: f64) {
        self.send(&RpcEvent {
            event: "clip.job.progress",
            payload: json!({ "id": id, "progress": progress }),
        });
    }
}

/// Drain the channel into `writer` on the blocking pool until every sender is dropped.
fn spawn_writer(
    mut writer: Box<dyn Write + Send>,
    mut rx: mpsc::UnboundedReceiver<String>,
) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        while let Some(line) = rx.blocking_recv() {
            let written = writer
                .write_all(line.as_bytes())
                .and_then(|()| writer.write_all(b"\n"))
                .and_then(|()| writer.flush());
            if let Err(e) = written {
                log::error!(target: "autoclip::sidecar", "Failed to write response: {}", e);
            }
        }
    })
}

fn params_from_value<T: serde::de::DeserializeOwned>(params: Value) -> Result<T, AppError> {
    serde_json::from_value(params)
        .map_err(|e| AppError::validation(format!("Invalid params payload: {}", e)))
}

async fn handle_clip_process(id: u64, params: Value, outbox: Outbox, pipeline: Arc<ClipPipeline>) {
    let parsed: Result<ClipProcessParams, AppError> = params_from_value(params);
    let media = parsed.and_then(|p| SourceMedia::from_request(p.input_path, p.platform.as_deref()));
    let media = match media {
        Ok(media) => media,
        Err(err) => {
            outbox.fail(id, &err);
            return;
        }
    };

    let events = outbox.clone();
    let progress: ProgressCallback = Arc::new(move |p: f64| events.progress(id, p));

    let result = pipeline
        .process_with_progress(&media, Some(progress))
        .await
        .map(|r| ClipResponse::from(&r))
        .map_err(|e| ErrorResponse::from(&e).with_platform(media.platform().as_str()));
    outbox.respond(id, result);
}

async fn handle_media_probe(id: u64, params: Value, outbox: Outbox, pipeline: Arc<ClipPipeline>) {
    let result = async {
        let parsed: MediaProbeParams = params_from_value(params)?;
        let duration = pipeline.probe_duration(&parsed.input_path).await?;
        Ok::<_, AppError>(json!({ "duration": duration }))
    }
    .await
    .map_err(|e| ErrorResponse::from(&e));
    outbox.respond(id, result);
}

fn dispatch(line: &str, outbox: &Outbox, pipeline: &Arc<ClipPipeline>, jobs: &mut JoinSet<()>) {
    let request: RpcRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            outbox.fail(0, &AppError::validation(format!("Invalid request: {}", e)));
            return;
        }
    };
    log::debug!(
        target: "autoclip::sidecar",
        "request id={} method={}",
        request.id,
        request.method
    );

    match request.method.as_str() {
        "clip.process" => {
            jobs.spawn(handle_clip_process(
                request.id,
                request.params,
                outbox.clone(),
                Arc::clone(pipeline),
            ));
        }
        "media.probe" => {
            jobs.spawn(handle_media_probe(
                request.id,
                request.params,
                outbox.clone(),
                Arc::clone(pipeline),
            ));
        }
        "app.capabilities" => {
            outbox.respond::<_>(request.id, Ok::<_, ErrorResponse>(app_capabilities(pipeline)))
        }
        other => outbox.fail(
            request.id,
            &AppError::validation(format!("Unknown method: {}", other)),
        ),
    }
}

fn log_job_result(done: Result<(), tokio::task::JoinError>) {
    if let Err(e) = done {
        log::error!(target: "autoclip::sidecar", "Job task failed: {}", e);
    }
}

/// Read requests until EOF, then wait for in-flight jobs.
///
/// A line that is not UTF-8 or not a request gets an id-0 error and reading
/// continues. A read error stops intake, but jobs already started still run
/// to completion and are answered before the error is returned.
pub async fn serve<R: AsyncBufRead + Unpin>(
    mut reader: R,
    writer: Box<dyn Write + Send>,
    pipeline: Arc<ClipPipeline>,
) -> io::Result<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    let writer_task = spawn_writer(writer, rx);
    let outbox = Outbox(tx);
    let mut jobs = JoinSet::new();
    let mut buf = Vec::with_capacity(1024);

    let intake = loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break Ok(()),
            Ok(_) => {}
            Err(e) => {
                log::error!(target: "autoclip::sidecar", "Failed to read request stream: {}", e);
                break Err(e);
            }
        }

        match std::str::from_utf8(&buf) {
            Ok(line) if line.trim().is_empty() => {}
            Ok(line) => dispatch(line, &outbox, &pipeline, &mut jobs),
            Err(e) => outbox.fail(
                0,
                &AppError::validation(format!("Request line is not valid UTF-8: {}", e)),
            ),
        }

        while let Some(done) = jobs.try_join_next() {
            log_job_result(done);
        }
    };

    while let Some(done) = jobs.join_next().await {
        log_job_result(done);
    }
    drop(outbox);
    if let Err(e) = writer_task.await {
        log::error!(target: "autoclip::sidecar", "Output writer task failed: {}", e);
    }
    intake
}
