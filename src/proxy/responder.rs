//! Request handling: the configuration channel and the decrypting proxy.
//!
//! `POST /configure` installs the process-wide encryption context exactly
//! once. Every other request is forwarded to the upstream origin with its
//! headers (Range included) intact; the upstream status and headers are
//! copied verbatim onto the outbound response and the body is the decrypt
//! stream. Length and range headers are not recomputed: a stream cipher's
//! ciphertext and plaintext lengths are equal.

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use futures::stream;
use http_body_util::{combinators::UnsyncBoxBody, BodyExt, Full, StreamBody};
use hyper::body::{Body, Frame};
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE, HOST, RANGE};
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::crypto::EncryptionContext;
use crate::state::AppState;
use crate::stream::{StreamDecryptor, StreamError, UpstreamSource};

use super::range::{self, RangeError};

/// Outbound body type: either a buffered reply or the decrypt stream.
pub type ResponseBody = UnsyncBoxBody<Bytes, StreamError>;

/// Headers that describe the inbound hop rather than the resource; copying
/// them onto the outbound response would corrupt framing.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// Configuration channel payload: base64url start counter and key.
#[derive(Deserialize)]
struct ConfigureRequest {
    start_counter: String,
    key: String,
}

#[derive(Serialize)]
struct ConfigureReply {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// Dispatch a single inbound request.
pub async fn handle_request<B: Body>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<ResponseBody>, Infallible> {
    let response = match (req.method(), req.uri().path()) {
        (&Method::POST, "/configure") => handle_configure(req, state).await,
        _ => proxy_request(req, state).await,
    };
    Ok(response)
}

/// Receive the one-time `(start_counter, key)` configuration.
///
/// On decode or import failure the engine stays unconfigured and the
/// caller is told why; a second successful call is rejected because the
/// context is write-once.
async fn handle_configure<B: Body>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Response<ResponseBody> {
    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => {
            return configure_reply(StatusCode::BAD_REQUEST, "error", Some("unreadable body".into()));
        }
    };

    let payload: ConfigureRequest = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            log::warn!("rejected configure payload: {}", e);
            return configure_reply(
                StatusCode::BAD_REQUEST,
                "error",
                Some("invalid configure payload".into()),
            );
        }
    };

    let context = match EncryptionContext::from_base64url(&payload.start_counter, &payload.key) {
        Ok(context) => context,
        Err(e) => {
            log::warn!("key import failed: {}", e);
            return configure_reply(StatusCode::BAD_REQUEST, "error", Some(e.to_string()));
        }
    };

    if state.configure(context).is_err() {
        return configure_reply(
            StatusCode::CONFLICT,
            "error",
            Some("encryption context is already configured".into()),
        );
    }

    log::info!("encryption context configured");
    configure_reply(StatusCode::OK, "configured", None)
}

/// Forward the request upstream and attach the decrypt stream as the body.
async fn proxy_request<B: Body>(req: Request<B>, state: Arc<AppState>) -> Response<ResponseBody> {
    let range_header = match req.headers().get(RANGE) {
        None => None,
        Some(value) => match value.to_str() {
            Ok(s) => Some(s),
            Err(_) => return status_response(StatusCode::RANGE_NOT_SATISFIABLE),
        },
    };

    let offset = match range::range_start(range_header) {
        Ok(offset) => offset,
        Err(RangeError::Malformed) => {
            log::debug!("malformed range header {:?}", range_header);
            return status_response(StatusCode::RANGE_NOT_SATISFIABLE);
        }
    };

    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!("{}{}", state.upstream_origin, path_and_query);

    // Forward the inbound headers (Range included) verbatim; Host belongs
    // to this hop and is rebuilt by the client.
    let mut headers = req.headers().clone();
    headers.remove(HOST);

    let upstream = match state.http.get(&url).headers(headers).send().await {
        Ok(response) => response,
        Err(e) => {
            log::error!("upstream fetch for {} failed: {}", url, e);
            return status_response(StatusCode::BAD_GATEWAY);
        }
    };

    let status = upstream.status();
    let upstream_headers = upstream.headers().clone();
    log::debug!("upstream {} -> {} (offset {})", url, status, offset);

    let decryptor = StreamDecryptor::new(state.context(), UpstreamSource::new(upstream), offset);
    let body = StreamBody::new(stream::unfold(decryptor, |mut decryptor| async move {
        match decryptor.produce_next().await {
            Ok(Some(chunk)) => Some((Ok(Frame::data(chunk)), decryptor)),
            Ok(None) => None,
            Err(err) => Some((Err(err), decryptor)),
        }
    }))
    .boxed_unsync();

    let mut response = Response::new(body);
    *response.status_mut() = status;
    for (name, value) in upstream_headers.iter() {
        if !is_hop_by_hop(name) {
            response.headers_mut().append(name, value.clone());
        }
    }
    response
}

fn empty_body() -> ResponseBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed_unsync()
}

fn status_response(status: StatusCode) -> Response<ResponseBody> {
    let mut response = Response::new(empty_body());
    *response.status_mut() = status;
    response
}

fn configure_reply(
    status: StatusCode,
    state: &'static str,
    message: Option<String>,
) -> Response<ResponseBody> {
    let reply = ConfigureReply {
        status: state,
        message,
    };
    let body = serde_json::to_vec(&reply).unwrap_or_default();
    let mut response = Response::new(
        Full::new(Bytes::from(body))
            .map_err(|never| match never {})
            .boxed_unsync(),
    );
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
