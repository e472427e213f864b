// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Wire types for the module fallback protocol.
//!
//! The sandbox transports one resolution attempt per HTTP-shaped request:
//! the resolve method travels in the `X-Resolve-Method` header and the
//! paths in query parameters. Responses are `404` (not found), `301` with a
//! `location` header (redirect to the canonical specifier) or `200` with a
//! JSON module payload.

use crate::error::{FallbackError, Result};
use crate::resolver::ResolveMethod;
use serde::Serialize;

/// Header naming the resolution mode (`import` or `require`).
pub const RESOLVE_METHOD_HEADER: &str = "X-Resolve-Method";

/// One resolution attempt, as received from the sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackRequest {
    /// How the sandbox reached the specifier.
    pub resolve_method: ResolveMethod,
    /// Absolute path of the module performing the resolution. May carry
    /// platform corruption; cleaned by the normalizer before use.
    pub referrer: String,
    /// The specifier as the sandbox sees it, with its synthetic
    /// absolute-path rewrite applied. May carry platform corruption.
    pub specifier: String,
    /// The specifier exactly as written in source. Never rewritten, and the
    /// authoritative input for resolution and for the relative-vs-bare
    /// distinction.
    pub raw_specifier: String,
}

impl FallbackRequest {
    /// Extracts and validates the fallback values from an HTTP request.
    ///
    /// Fails with [`FallbackError::Protocol`] before any filesystem access
    /// when the method header is unrecognized or a query parameter is
    /// missing.
    pub fn from_http<B>(request: &hyper::Request<B>) -> Result<Self> {
        let header = request
            .headers()
            .get(RESOLVE_METHOD_HEADER)
            .and_then(|value| value.to_str().ok());
        let Some(header) = header else {
            return Err(FallbackError::protocol("no resolve method provided"));
        };
        let Some(resolve_method) = ResolveMethod::parse(header) else {
            return Err(FallbackError::protocol(format!(
                "unrecognized resolve method '{header}'"
            )));
        };

        let query = request.uri().query().unwrap_or("");
        let mut referrer = None;
        let mut specifier = None;
        let mut raw_specifier = None;
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "referrer" => referrer = Some(value.into_owned()),
                "specifier" => specifier = Some(value.into_owned()),
                "rawSpecifier" => raw_specifier = Some(value.into_owned()),
                _ => {}
            }
        }

        Ok(Self {
            resolve_method,
            referrer: required(referrer, "referrer")?,
            specifier: required(specifier, "specifier")?,
            raw_specifier: required(raw_specifier, "rawSpecifier")?,
        })
    }
}

fn required(value: Option<String>, key: &str) -> Result<String> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(FallbackError::protocol(format!("no {key} provided"))),
    }
}

/// The result of one fallback resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// The resolved identity differs from what the sandbox asked for; it
    /// should retry with the canonical specifier.
    Redirect {
        /// Canonical specifier the sandbox should use instead.
        canonical_specifier: String,
    },
    /// The module resolved to readable content.
    Content(ModuleContent),
    /// The specifier did not resolve, or the resolved file was unreadable.
    /// A normal protocol outcome, not an error.
    NotFound {
        /// Optional diagnostic text for the 404 body.
        reason: Option<String>,
    },
}

/// A resolved module, ready for the 200-response JSON body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleContent {
    /// Module name on the wire. Never carries a leading separator: the
    /// sandbox rejects names that start with one, even on platforms where
    /// absolute paths do (an asymmetry of the protocol, reproduced here on
    /// purpose).
    pub name: String,
    /// The module's source, tagged by format.
    #[serde(flatten)]
    pub source: ModuleSource,
}

/// Module source plus the metadata valid for its format.
///
/// Serializes to the wire union `{esModule} | {commonJsModule,
/// namedExports} | {json}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ModuleSource {
    /// An ECMAScript module.
    Esm {
        /// Source text.
        #[serde(rename = "esModule")]
        es_module: String,
    },
    /// A CommonJS module with its statically discovered named exports.
    Cjs {
        /// Source text.
        #[serde(rename = "commonJsModule")]
        common_js_module: String,
        /// Statically discovered export names, sorted, without `default`.
        #[serde(rename = "namedExports")]
        named_exports: Vec<String>,
    },
    /// A JSON module.
    Json {
        /// Raw JSON text.
        json: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str, method: Option<&str>) -> hyper::Request<()> {
        let mut builder = hyper::Request::builder().uri(uri);
        if let Some(method) = method {
            builder = builder.header(RESOLVE_METHOD_HEADER, method);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn parses_a_complete_request() {
        let req = request(
            "http://fallback/?specifier=/app/src/b&rawSpecifier=./b&referrer=/app/src/a.js",
            Some("import"),
        );
        let parsed = FallbackRequest::from_http(&req).unwrap();
        assert_eq!(parsed.resolve_method, ResolveMethod::Import);
        assert_eq!(parsed.specifier, "/app/src/b");
        assert_eq!(parsed.raw_specifier, "./b");
        assert_eq!(parsed.referrer, "/app/src/a.js");
    }

    #[test]
    fn percent_encoded_values_are_decoded() {
        let req = request(
            "http://fallback/?specifier=/x/%40scope/pkg&rawSpecifier=%40scope%2Fpkg&referrer=/a.js",
            Some("require"),
        );
        let parsed = FallbackRequest::from_http(&req).unwrap();
        assert_eq!(parsed.specifier, "/x/@scope/pkg");
        assert_eq!(parsed.raw_specifier, "@scope/pkg");
    }

    #[test]
    fn missing_header_is_a_protocol_error() {
        let req = request("http://fallback/?specifier=a&rawSpecifier=a&referrer=b", None);
        let error = FallbackRequest::from_http(&req).unwrap_err();
        assert!(matches!(error, FallbackError::Protocol(_)));
    }

    #[test]
    fn unrecognized_method_is_a_protocol_error() {
        let req = request(
            "http://fallback/?specifier=a&rawSpecifier=a&referrer=b",
            Some("fetch"),
        );
        let error = FallbackRequest::from_http(&req).unwrap_err();
        assert!(matches!(error, FallbackError::Protocol(_)));
    }

    #[test]
    fn each_query_parameter_is_required() {
        for uri in [
            "http://fallback/?rawSpecifier=a&referrer=b",
            "http://fallback/?specifier=a&referrer=b",
            "http://fallback/?specifier=a&rawSpecifier=a",
        ] {
            let req = request(uri, Some("import"));
            assert!(FallbackRequest::from_http(&req).is_err(), "uri: {uri}");
        }
    }

    #[test]
    fn esm_payload_shape() {
        let content = ModuleContent {
            name: "app/src/b".into(),
            source: ModuleSource::Esm {
                es_module: "export const b = 1;".into(),
            },
        };
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "app/src/b",
                "esModule": "export const b = 1;",
            })
        );
    }

    #[test]
    fn cjs_payload_shape() {
        let content = ModuleContent {
            name: "node_modules/dep/index.js".into(),
            source: ModuleSource::Cjs {
                common_js_module: "exports.a = 1;".into(),
                named_exports: vec!["a".into()],
            },
        };
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "node_modules/dep/index.js",
                "commonJsModule": "exports.a = 1;",
                "namedExports": ["a"],
            })
        );
    }

    #[test]
    fn json_payload_shape() {
        let content = ModuleContent {
            name: "pkg/package.json".into(),
            source: ModuleSource::Json {
                json: "{\"name\":\"pkg\"}".into(),
            },
        };
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "pkg/package.json",
                "json": "{\"name\":\"pkg\"}",
            })
        );
    }
}
