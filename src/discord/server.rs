//! HTTP interactions endpoint.
//!
//! Discord delivers every interaction as a signed `POST` request and expects the first
//! answer in the response body within 3 seconds. The endpoint checks the signature,
//! answers pings itself and hands every other interaction to the bot as an [`Event`].

use std::{future::Future, sync::Arc, time::Duration};

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use log::{debug, info, warn};
use thiserror::Error;
use tokio::{net::TcpListener, time};

use crate::discord::{
    models::{Event, InteractionResponse},
    responder::InteractionResponder,
};

/// Path Discord posts interactions to.
pub const INTERACTIONS_PATH: &str = "/interactions";

/// How long Discord waits for the answer to an interaction.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(3);

const SIGNATURE_HEADER: &str = "X-Signature-Ed25519";
const TIMESTAMP_HEADER: &str = "X-Signature-Timestamp";

/// Reasons a request signature, or the key checking it, is rejected.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("missing header {0}")]
    MissingHeader(&'static str),
    #[error("invalid hex encoding: {0}")]
    Encoding(#[from] hex::FromHexError),
    #[error("public key must be 32 bytes, got {0}")]
    KeyLength(usize),
    #[error("signature verification failed: {0}")]
    Invalid(#[from] ed25519_dalek::SignatureError),
}

/// Parses the hex encoded application public key shown in the developer portal.
pub fn parse_public_key(public_key: &str) -> Result<VerifyingKey, SignatureError> {
    let bytes = hex::decode(public_key.trim())?;
    let bytes: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| SignatureError::KeyLength(bytes.len()))?;

    Ok(VerifyingKey::from_bytes(&bytes)?)
}

#[derive(Clone)]
struct ServerState {
    public_key: VerifyingKey,
    on_event: Arc<dyn Fn(Event) + Send + Sync>,
}

/// Builds the interactions router.
///
/// # Arguments
///
/// * `public_key` - Application key the request signatures are checked against
/// * `on_event` - Called with every verified interaction except pings. It must not
///   block: the request stays open until a response is sent through the event's
///   [`InteractionResponder`] or [`RESPONSE_TIMEOUT`] elapses.
pub fn router<F>(public_key: VerifyingKey, on_event: F) -> Router
where
    F: Fn(Event) + Send + Sync + 'static,
{
    let state = ServerState {
        public_key,
        on_event: Arc::new(on_event),
    };

    Router::new()
        .route(INTERACTIONS_PATH, post(handle_interaction))
        .with_state(state)
}

/// Serves `router` on `address` until `shutdown` completes.
pub async fn serve<S>(address: &str, router: Router, shutdown: S) -> std::io::Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(address).await?;
    info!(
        "listening for interactions on {}{}",
        listener.local_addr()?,
        INTERACTIONS_PATH
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn handle_interaction(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(e) = verify_signature(&state.public_key, &headers, &body) {
        warn!("rejected interaction request: {}", e);
        return (StatusCode::UNAUTHORIZED, "invalid request signature").into_response();
    }

    let (responder, receiver) = InteractionResponder::channel();
    let event = match Event::decode(&body, responder) {
        Ok(event) => event,
        Err(e) => {
            warn!("failed to decode interaction: {}", e);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    if let Event::Ping = event {
        debug!("answer ping");
        return Json(InteractionResponse::pong()).into_response();
    }

    debug!("received {} interaction", event.kind());
    (state.on_event)(event);

    match time::timeout(RESPONSE_TIMEOUT, receiver).await {
        Ok(Ok(response)) => Json(response).into_response(),
        // Every responder was dropped without answering
        Ok(Err(_)) => {
            debug!("interaction left unanswered");
            StatusCode::ACCEPTED.into_response()
        }
        Err(_) => {
            warn!("no interaction response within {:?}", RESPONSE_TIMEOUT);
            StatusCode::ACCEPTED.into_response()
        }
    }
}

/// Checks the Ed25519 signature of `timestamp + body`.
fn verify_signature(
    public_key: &VerifyingKey,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), SignatureError> {
    let signature = header(headers, SIGNATURE_HEADER)?;
    let timestamp = header(headers, TIMESTAMP_HEADER)?;

    let signature = Signature::from_slice(&hex::decode(signature)?)?;
    let message = [timestamp.as_bytes(), body].concat();

    Ok(public_key.verify(&message, &signature)?)
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, SignatureError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or(SignatureError::MissingHeader(name))
}
