// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! HTTP surface of the fallback protocol.
//!
//! Adapts [`ResolutionOutcome`] values to wire responses and exposes the
//! handler as a [`hyper::service::Service`] so the host can mount it, plus
//! a small accept loop for hosts that hand the service its own socket.

use crate::error::FallbackError;
use crate::handler::FallbackHandler;
use crate::normalize::PathNormalizer;
use crate::protocol::{FallbackRequest, ResolutionOutcome};
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE, LOCATION};
use hyper::{Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Answers one fallback request.
///
/// Protocol violations, re-export chasing failures and resolver errors are
/// all fatal for the call and answer with `500`; everything else maps to
/// the protocol's `404`/`301`/`200` responses.
pub async fn respond<B>(
    handler: &FallbackHandler,
    request: &hyper::Request<B>,
) -> Response<Full<Bytes>> {
    let fallback_request = match FallbackRequest::from_http(request) {
        Ok(parsed) => parsed,
        Err(error) => return failure_response(error),
    };

    match handler.handle(fallback_request).await {
        Ok(outcome) => outcome_response(outcome, handler.normalizer()),
        Err(error) => failure_response(error),
    }
}

fn outcome_response(
    outcome: ResolutionOutcome,
    normalizer: &PathNormalizer,
) -> Response<Full<Bytes>> {
    match outcome {
        ResolutionOutcome::NotFound { reason } => {
            plain_response(StatusCode::NOT_FOUND, reason.unwrap_or_default())
        }
        ResolutionOutcome::Redirect {
            canonical_specifier,
        } => {
            // the sandbox expects a leading separator on absolute locations
            // even where the platform's absolute paths carry none
            let location = normalizer.emit_absolute(&canonical_specifier);
            match HeaderValue::from_str(&location) {
                Ok(value) => {
                    let mut response = plain_response(StatusCode::MOVED_PERMANENTLY, "");
                    response.headers_mut().insert(LOCATION, value);
                    response
                }
                Err(error) => {
                    tracing::warn!(%location, %error, "redirect location is not a valid header value");
                    plain_response(StatusCode::INTERNAL_SERVER_ERROR, location)
                }
            }
        }
        ResolutionOutcome::Content(content) => match serde_json::to_vec(&content) {
            Ok(body) => {
                let mut response = plain_response(StatusCode::OK, body);
                response
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                response
            }
            Err(error) => {
                tracing::warn!(%error, "failed to serialize module payload");
                plain_response(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
            }
        },
    }
}

fn failure_response(error: FallbackError) -> Response<Full<Bytes>> {
    tracing::warn!(%error, "fallback request failed");
    plain_response(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
}

fn plain_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
}

/// The fallback handler as a cloneable hyper service.
#[derive(Clone)]
pub struct FallbackService {
    handler: Arc<FallbackHandler>,
}

impl FallbackService {
    /// Wraps a handler for mounting on a hyper connection.
    pub fn new(handler: FallbackHandler) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }
}

impl<B> hyper::service::Service<hyper::Request<B>> for FallbackService
where
    B: Send + Sync + 'static,
{
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future =
        Pin<Box<dyn Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, request: hyper::Request<B>) -> Self::Future {
        let handler = Arc::clone(&self.handler);
        Box::pin(async move { Ok(respond(&handler, &request).await) })
    }
}

/// Serves the fallback protocol on an already-bound listener.
///
/// Connections are handled concurrently but each request is resolved
/// independently; the protocol makes no ordering promises between them.
pub async fn serve(listener: TcpListener, handler: FallbackHandler) -> std::io::Result<()> {
    let service = FallbackService::new(handler);
    loop {
        let (stream, peer) = listener.accept().await?;
        tracing::debug!(%peer, "fallback connection accepted");
        let io = TokioIo::new(stream);
        let service = service.clone();
        tokio::spawn(async move {
            if let Err(error) = auto::Builder::new(TokioExecutor::new())
                .serve_connection(io, service)
                .await
            {
                tracing::warn!(%error, "fallback connection error");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ModuleContent, ModuleSource};
    use http_body_util::BodyExt;

    fn unix_normalizer() -> PathNormalizer {
        PathNormalizer::with_drive_letter_paths(false)
    }

    async fn body_string(response: Response<Full<Bytes>>) -> String {
        let collected = response.into_body().collect().await.unwrap();
        String::from_utf8(collected.to_bytes().to_vec()).unwrap()
    }

    #[tokio::test]
    async fn not_found_maps_to_404() {
        let response = outcome_response(
            ResolutionOutcome::NotFound { reason: None },
            &unix_normalizer(),
        );
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_string(response).await.is_empty());
    }

    #[tokio::test]
    async fn not_found_diagnostic_becomes_the_body() {
        let response = outcome_response(
            ResolutionOutcome::NotFound {
                reason: Some("Failed to read file /gone.js".into()),
            },
            &unix_normalizer(),
        );
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(response).await, "Failed to read file /gone.js");
    }

    #[test]
    fn redirect_carries_the_location_header() {
        let response = outcome_response(
            ResolutionOutcome::Redirect {
                canonical_specifier: "/app/node_modules/react/index.js".into(),
            },
            &unix_normalizer(),
        );
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            response.headers().get(LOCATION).unwrap(),
            "/app/node_modules/react/index.js"
        );
    }

    #[test]
    fn redirect_location_gains_a_separator_on_drive_letter_platforms() {
        let response = outcome_response(
            ResolutionOutcome::Redirect {
                canonical_specifier: "C:/app/node_modules/react/index.js".into(),
            },
            &PathNormalizer::with_drive_letter_paths(true),
        );
        assert_eq!(
            response.headers().get(LOCATION).unwrap(),
            "/C:/app/node_modules/react/index.js"
        );
    }

    #[tokio::test]
    async fn content_serializes_as_json() {
        let response = outcome_response(
            ResolutionOutcome::Content(ModuleContent {
                name: "app/src/b".into(),
                source: ModuleSource::Esm {
                    es_module: "export const b = 1;".into(),
                },
            }),
            &unix_normalizer(),
        );
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["name"], "app/src/b");
        assert_eq!(body["esModule"], "export const b = 1;");
    }
}
