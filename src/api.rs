//! HTTP surface for the oracle.
//!
//! Serves the status, score history, manual verification and Lightning
//! routes. `tiny_http`'s accept loop blocks, so the whole surface runs in a
//! `spawn_blocking` task and bridges into the async context through a
//! runtime handle. The loop polls a shutdown watch between requests.

use crate::error::{Error, Result};
use crate::node::Oracle;
use serde_json::{json, Value};
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tiny_http::{Header, Method, Request, Response, Server};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// How long the accept loop blocks before re-checking shutdown.
const ACCEPT_POLL: Duration = Duration::from_millis(500);

/// Bind the HTTP surface and serve it on a blocking task.
///
/// # Errors
///
/// Returns an error if the port cannot be bound.
pub fn spawn(oracle: Arc<Oracle>, port: u16, shutdown: watch::Receiver<bool>) -> Result<()> {
    let server = Server::http(("0.0.0.0", port))
        .map_err(|e| Error::Api(format!("failed to bind port {port}: {e}")))?;
    let handle = Handle::current();

    info!("HTTP API listening on port {port}");

    tokio::task::spawn_blocking(move || {
        loop {
            if *shutdown.borrow() {
                debug!("HTTP API shutting down");
                break;
            }
            match server.recv_timeout(ACCEPT_POLL) {
                Ok(Some(request)) => handle_request(&oracle, &handle, request),
                Ok(None) => {}
                Err(e) => {
                    warn!("HTTP accept failed: {e}");
                    break;
                }
            }
        }
    });

    Ok(())
}

fn handle_request(oracle: &Arc<Oracle>, handle: &Handle, mut request: Request) {
    let path = request
        .url()
        .split('?')
        .next()
        .unwrap_or("/")
        .to_string();
    let method = request.method().clone();

    let (status, body) = match (method, path.as_str()) {
        (Method::Get, "/") => (200, oracle.status()),
        (Method::Get, "/scores") => {
            (200, json!({ "scores": oracle.recent_scores() }))
        }
        (Method::Post, "/verify") => handle_verify(oracle, handle, &mut request),
        (Method::Get, "/lightning/info") => match serde_json::to_value(oracle.wallet_info()) {
            Ok(info) => (200, info),
            Err(e) => (500, json!({ "error": e.to_string() })),
        },
        (Method::Post, "/lightning/zap") => handle_zap(oracle, handle, &mut request),
        _ => (404, json!({ "error": "Not found" })),
    };

    respond(request, status, &body);
}

fn handle_verify(oracle: &Arc<Oracle>, handle: &Handle, request: &mut Request) -> (u16, Value) {
    let Some(body) = read_json_body(request) else {
        return (400, json!({ "error": "Invalid JSON body" }));
    };

    let Some(content) = body.get("content").and_then(Value::as_str) else {
        return (400, json!({ "error": "Missing required field: content" }));
    };
    let event_id = body
        .get("eventId")
        .and_then(Value::as_str)
        .map(ToString::to_string);

    let result = handle.block_on(oracle.process_content(content, event_id));
    match serde_json::to_value(&result) {
        Ok(value) => (200, value),
        Err(e) => (500, json!({ "error": e.to_string() })),
    }
}

fn handle_zap(oracle: &Arc<Oracle>, handle: &Handle, request: &mut Request) -> (u16, Value) {
    let Some(body) = read_json_body(request) else {
        return (400, json!({ "error": "Invalid JSON body" }));
    };

    let event_id = body.get("eventId").and_then(Value::as_str);
    let author_pubkey = body.get("authorPubkey").and_then(Value::as_str);
    let score = body.get("credibilityScore").and_then(Value::as_u64);

    let (Some(event_id), Some(author_pubkey), Some(score)) = (event_id, author_pubkey, score)
    else {
        return (
            400,
            json!({
                "error": "Missing required fields: eventId, authorPubkey, credibilityScore"
            }),
        );
    };

    let score = u8::try_from(score.min(100)).unwrap_or(100);
    match handle.block_on(oracle.manual_zap(event_id, author_pubkey, score)) {
        Ok(outcome) => (200, outcome),
        Err(e) => (500, json!({ "error": e.to_string() })),
    }
}

fn read_json_body(request: &mut Request) -> Option<Value> {
    let mut body = String::new();
    request.as_reader().read_to_string(&mut body).ok()?;
    serde_json::from_str(&body).ok()
}

fn respond(request: Request, status: u16, body: &Value) {
    let mut response = Response::from_string(body.to_string()).with_status_code(status);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
        response = response.with_header(header);
    }
    if let Err(e) = request.respond(response) {
        debug!("Failed to send response: {e}");
    }
}
