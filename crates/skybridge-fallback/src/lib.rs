// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # skybridge-fallback
//!
//! A module fallback resolution service for sandboxed JavaScript runtimes.
//!
//! Sandboxed runtimes cannot resolve module specifiers against the host
//! filesystem; the sandbox has no filesystem at all. This crate runs on
//! the host side: the sandbox forwards each unresolved `import`/`require`
//! over an HTTP-shaped protocol, and the service answers with one of:
//!
//! - the module's source plus format metadata (`200`, JSON body),
//! - a redirect to the canonical specifier (`301` + `location`), or
//! - not found (`404`), a normal outcome rather than an error.
//!
//! The actual specifier-to-path mapping is the host build tool's job and is
//! injected through the [`ResolveId`] trait; this crate contributes what
//! the build tool cannot: the wire protocol, cross-platform path
//! compensation, static CJS/ESM/JSON classification and static CommonJS
//! named-export discovery (the sandbox needs export names *before* it can
//! execute the module).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use skybridge_fallback::{serve, FallbackHandler};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let resolver = Arc::new(MyBuildToolResolver::new());
//!     let handler = FallbackHandler::new(resolver);
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:9719").await?;
//!     serve(listener, handler).await?;
//!     Ok(())
//! }
//! ```
//!
//! Hosts that multiplex the fallback endpoint onto an existing server can
//! mount [`FallbackService`] (a [`hyper::service::Service`]) or call
//! [`respond`] directly.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classify;
pub mod error;
pub mod exports;
pub mod handler;
pub mod normalize;
pub mod protocol;
pub mod resolver;
pub mod service;

// Re-exports
pub use classify::{classify, ModuleFormat};
pub use error::{FallbackError, Result};
pub use exports::{collect_module_info, ModuleInfo};
pub use handler::FallbackHandler;
pub use normalize::{with_js_extension, PathNormalizer, SCRIPT_EXTENSIONS};
pub use protocol::{
    FallbackRequest, ModuleContent, ModuleSource, ResolutionOutcome, RESOLVE_METHOD_HEADER,
};
pub use resolver::{ResolveId, ResolveMethod};
pub use service::{respond, serve, FallbackService};

/// Version of the skybridge fallback service
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
