//! OGC WMS and WCS protocol implementation.
//!
//! Supports:
//! - WMS 1.1.1 and 1.3.0 (GetCapabilities, GetMap, GetFeatureInfo, GetLegendGraphic)
//! - WCS 1.0.0 and 2.0.1 (GetCapabilities, DescribeCoverage, GetCoverage)
//!
//! Requests arrive as case-insensitive key/value pairs and leave as fully
//! validated [`OgcRequest`] values. Documents are written as XML strings.

pub mod capabilities;
pub mod config;
pub mod describe;
pub mod exceptions;
pub mod getfeatureinfo;
pub mod params;
pub mod request;
pub mod version;
mod xml;

pub use capabilities::build_capabilities;
pub use config::{RequestLimits, ServiceInfo};
pub use describe::build_describe_coverage;
pub use exceptions::{build_exception, exception_code, ExceptionDocument};
pub use getfeatureinfo::{FeatureInfo, FeatureInfoResponse, InfoFormat};
pub use params::KvpParams;
pub use request::{parse, OgcRequest, Operation};
pub use version::{Service, ServiceVersion, Version};
