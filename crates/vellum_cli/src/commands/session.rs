//! Line-oriented JSON session over stdio.
//!
//! Each input line is one request object tagged by `"op"`; each request gets
//! exactly one response line, `{"ok": ...}` or `{"error": {...}}`. Drafts live
//! as long as the session does.

use super::Globals;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};
use tracing::{debug, info};
use vellum_core::{DocumentService, Patch, VellumError, VersionSelector};

/// One request. Field names follow the wire protocol.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    CreateVersion {
        project_id: String,
        file_id: String,
        content: String,
    },
    CreatePatch {
        project_id: String,
        file_id: String,
        patch: Patch,
    },
    CommitVersion {
        project_id: String,
        file_id: String,
    },
    CommitProject {
        project_id: String,
    },
    GetVersion {
        project_id: String,
        file_id: String,
        /// Latest when absent.
        #[serde(default)]
        generation: Option<i64>,
    },
    FileVersionList {
        project_id: String,
        file_id: String,
    },
    GetPatchList {
        project_id: String,
        file_id: String,
    },
    DeletePatch {
        project_id: String,
        file_id: String,
        generation: i64,
        patch_timestamp: i64,
    },
    DeleteFile {
        project_id: String,
        file_id: String,
        file_name: String,
        removal_timestamp: i64,
    },
}

/// Counters reported when a session ends.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub requests: usize,
    pub failures: usize,
}

/// Serve requests from stdin until EOF.
pub fn run(globals: &Globals) -> Result<()> {
    let service = globals.open_service()?;
    info!(backend = service.backend_name(), "session started");

    let stdin = io::stdin();
    let stdout = io::stdout();
    let stats = serve(&service, stdin.lock(), stdout.lock())?;

    info!(
        requests = stats.requests,
        failures = stats.failures,
        "session ended"
    );
    Ok(())
}

/// Reads requests from `input` and writes one response line per request.
/// Blank lines are ignored.
pub fn serve(
    service: &DocumentService,
    input: impl BufRead,
    mut output: impl Write,
) -> Result<SessionStats> {
    let mut stats = SessionStats::default();

    for line in input.lines() {
        let line = line.context("failed to read request")?;
        if line.trim().is_empty() {
            continue;
        }
        stats.requests += 1;

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => {
                debug!(?request, "request");
                match handle(service, request) {
                    Ok(value) => json!({ "ok": value }),
                    Err(e) => {
                        stats.failures += 1;
                        error_response(e.kind().as_str(), &e.to_string())
                    }
                }
            }
            Err(e) => {
                stats.failures += 1;
                error_response("bad_request", &e.to_string())
            }
        };

        serde_json::to_writer(&mut output, &response).context("failed to write response")?;
        output.write_all(b"\n")?;
        output.flush()?;
    }

    Ok(stats)
}

fn error_response(kind: &str, message: &str) -> Value {
    json!({ "error": { "kind": kind, "message": message } })
}

/// Executes one request against the service.
pub fn handle(service: &DocumentService, request: Request) -> Result<Value, VellumError> {
    match request {
        Request::CreateVersion {
            project_id,
            file_id,
            content,
        } => {
            service.create_version(&project_id, &file_id, content);
            Ok(Value::Null)
        }
        Request::CreatePatch {
            project_id,
            file_id,
            patch,
        } => {
            service.create_patch(&project_id, &file_id, patch)?;
            Ok(Value::Null)
        }
        Request::CommitVersion {
            project_id,
            file_id,
        } => {
            let generation = service.commit_version(&project_id, &file_id)?;
            Ok(json!({ "generation": generation }))
        }
        Request::CommitProject { project_id } => {
            let committed: Vec<Value> = service
                .commit_project(&project_id)?
                .into_iter()
                .map(|(file_id, generation)| json!({ "file_id": file_id, "generation": generation }))
                .collect();
            Ok(json!({ "committed": committed }))
        }
        Request::GetVersion {
            project_id,
            file_id,
            generation,
        } => {
            let selector = generation.map_or(VersionSelector::Latest, VersionSelector::Generation);
            let content = service.get_version(&project_id, &file_id, selector)?;
            Ok(json!({ "content": String::from_utf8_lossy(&content) }))
        }
        Request::FileVersionList {
            project_id,
            file_id,
        } => {
            let generations = service.file_version_list(&project_id, &file_id)?;
            Ok(json!({ "generations": generations }))
        }
        Request::GetPatchList {
            project_id,
            file_id,
        } => {
            // Null is "no open draft"; [] is an open draft without patches.
            let patches = service.get_patch_list(&project_id, &file_id);
            Ok(json!({ "patches": patches }))
        }
        Request::DeletePatch {
            project_id,
            file_id,
            generation,
            patch_timestamp,
        } => {
            let content = service.delete_patch(&project_id, &file_id, generation, patch_timestamp)?;
            Ok(json!({ "content": content }))
        }
        Request::DeleteFile {
            project_id,
            file_id,
            file_name,
            removal_timestamp,
        } => {
            service.delete_file(&project_id, &file_id, &file_name, removal_timestamp)?;
            Ok(Value::Null)
        }
    }
}
