//! Protocol engine for the OGC WMS and WCS services.
//!
//! [`OgcEngine::handle`] takes the query parameters of one request and
//! always answers with an [`OgcResponse`]: an image, a coverage, an XML or
//! text document, or an exception document in the negotiated version's
//! schema.
//!
//! ```ignore
//! let engine = OgcEngine::new(registry, transform, ServiceInfo::default(), RequestLimits::default());
//! let params = KvpParams::from_pairs([("service", "WMS"), ("request", "GetCapabilities")]);
//! let response = engine.handle(&params, &RequestContext::new()).await;
//! assert_eq!(response.status, 200);
//! ```

mod context;
mod engine;
mod fetch;
mod handlers;
mod response;
mod stage;

pub use context::RequestContext;
pub use engine::OgcEngine;
pub use response::OgcResponse;
pub use stage::Stage;

pub use ogc_protocol::{KvpParams, RequestLimits, ServiceInfo};
