//! Error types for OGC request handling.

use std::fmt;
use thiserror::Error;

use crate::bbox::BboxParseError;
use crate::crs::{CrsParseError, TransformError};
use crate::grid::GridError;
use crate::layer::LayerError;
use crate::provider::ProviderError;
use crate::style::StyleError;
use crate::time::TimeParseError;

/// Result type alias using OgcError.
pub type OgcResult<T> = Result<T, OgcError>;

/// Primary error type for protocol operations.
#[derive(Debug, Error)]
pub enum OgcError {
    // === Request Errors ===
    #[error("Unknown or missing service: '{0}'")]
    InvalidService(String),

    #[error("Unsupported version: '{0}'")]
    UnsupportedVersion(String),

    #[error("Operation not supported: {0}")]
    OperationNotSupported(String),

    #[error("Missing required parameter: {0}")]
    MissingParameterValue(String),

    #[error("Invalid value for parameter '{param}': {message}")]
    InvalidParameterValue { param: String, message: String },

    #[error("Layer not defined: {0}")]
    LayerNotDefined(String),

    #[error("Layer is not queryable: {0}")]
    LayerNotQueryable(String),

    #[error("Style '{style}' is not defined for layer '{layer}'")]
    StyleNotDefined { layer: String, style: String },

    #[error("Invalid CRS: {message}")]
    InvalidCrs { param: String, message: String },

    #[error("Invalid bounding box: {0}")]
    InvalidBoundingBox(String),

    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("Requested format not supported: {value}")]
    InvalidFormat { param: String, value: String },

    #[error("Invalid query point: {0}")]
    InvalidPoint(String),

    // === Data Errors ===
    #[error("Requested extent does not overlap the layer")]
    NoOverlap,

    #[error("Data unavailable for layer '{layer}'")]
    DataUnavailable {
        layer: String,
        #[source]
        source: ProviderError,
    },

    // === Infrastructure Errors ===
    #[error("Request cancelled")]
    Cancelled,

    #[error("Request timeout")]
    Timeout,

    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Error kinds without payloads, for mapping to exception codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidService,
    UnsupportedVersion,
    OperationNotSupported,
    MissingParameterValue,
    InvalidParameterValue,
    LayerNotDefined,
    LayerNotQueryable,
    StyleNotDefined,
    InvalidCrs,
    InvalidBoundingBox,
    InvalidDimensions,
    InvalidFormat,
    InvalidPoint,
    NoOverlap,
    DataUnavailable,
    Cancelled,
    Timeout,
    InternalError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidService => "InvalidService",
            ErrorKind::UnsupportedVersion => "UnsupportedVersion",
            ErrorKind::OperationNotSupported => "OperationNotSupported",
            ErrorKind::MissingParameterValue => "MissingParameterValue",
            ErrorKind::InvalidParameterValue => "InvalidParameterValue",
            ErrorKind::LayerNotDefined => "LayerNotDefined",
            ErrorKind::LayerNotQueryable => "LayerNotQueryable",
            ErrorKind::StyleNotDefined => "StyleNotDefined",
            ErrorKind::InvalidCrs => "InvalidCRS",
            ErrorKind::InvalidBoundingBox => "InvalidBoundingBox",
            ErrorKind::InvalidDimensions => "InvalidDimensions",
            ErrorKind::InvalidFormat => "InvalidFormat",
            ErrorKind::InvalidPoint => "InvalidPoint",
            ErrorKind::NoOverlap => "NoOverlap",
            ErrorKind::DataUnavailable => "DataUnavailable",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::InternalError => "InternalError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl OgcError {
    pub fn invalid_param(param: impl Into<String>, message: impl Into<String>) -> Self {
        OgcError::InvalidParameterValue {
            param: param.into(),
            message: message.into(),
        }
    }

    /// `param` names the request key that carried the CRS.
    pub fn invalid_crs(param: impl Into<String>, message: impl Into<String>) -> Self {
        OgcError::InvalidCrs {
            param: param.into(),
            message: message.into(),
        }
    }

    pub fn invalid_format(param: impl Into<String>, value: impl Into<String>) -> Self {
        OgcError::InvalidFormat {
            param: param.into(),
            value: value.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            OgcError::InvalidService(_) => ErrorKind::InvalidService,
            OgcError::UnsupportedVersion(_) => ErrorKind::UnsupportedVersion,
            OgcError::OperationNotSupported(_) => ErrorKind::OperationNotSupported,
            OgcError::MissingParameterValue(_) => ErrorKind::MissingParameterValue,
            OgcError::InvalidParameterValue { .. } => ErrorKind::InvalidParameterValue,
            OgcError::LayerNotDefined(_) => ErrorKind::LayerNotDefined,
            OgcError::LayerNotQueryable(_) => ErrorKind::LayerNotQueryable,
            OgcError::StyleNotDefined { .. } => ErrorKind::StyleNotDefined,
            OgcError::InvalidCrs { .. } => ErrorKind::InvalidCrs,
            OgcError::InvalidBoundingBox(_) => ErrorKind::InvalidBoundingBox,
            OgcError::InvalidDimensions(_) => ErrorKind::InvalidDimensions,
            OgcError::InvalidFormat { .. } => ErrorKind::InvalidFormat,
            OgcError::InvalidPoint(_) => ErrorKind::InvalidPoint,
            OgcError::NoOverlap => ErrorKind::NoOverlap,
            OgcError::DataUnavailable { .. } => ErrorKind::DataUnavailable,
            OgcError::Cancelled => ErrorKind::Cancelled,
            OgcError::Timeout => ErrorKind::Timeout,
            OgcError::InternalError(_) => ErrorKind::InternalError,
        }
    }

    /// Request parameter the error refers to, for exception `locator` attributes.
    pub fn locator(&self) -> Option<&str> {
        match self {
            OgcError::InvalidService(_) => Some("service"),
            OgcError::UnsupportedVersion(_) => Some("version"),
            OgcError::OperationNotSupported(_) => Some("request"),
            OgcError::MissingParameterValue(p) => Some(p.as_str()),
            OgcError::InvalidParameterValue { param, .. } => Some(param.as_str()),
            OgcError::LayerNotDefined(name) | OgcError::LayerNotQueryable(name) => Some(name.as_str()),
            OgcError::StyleNotDefined { .. } => Some("styles"),
            OgcError::InvalidCrs { param, .. } | OgcError::InvalidFormat { param, .. } => {
                Some(param.as_str())
            }
            OgcError::InvalidBoundingBox(_) | OgcError::NoOverlap => Some("bbox"),
            OgcError::InvalidDimensions(_) => Some("width"),
            OgcError::InvalidPoint(_) => Some("i"),
            _ => None,
        }
    }

    /// Short description safe to show to clients.
    ///
    /// Causes of data and internal failures are kept out.
    pub fn client_message(&self) -> String {
        match self {
            OgcError::DataUnavailable { layer, .. } => {
                format!("No data available for layer '{}'", layer)
            }
            OgcError::InternalError(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            OgcError::LayerNotDefined(_)
            | OgcError::StyleNotDefined { .. }
            | OgcError::DataUnavailable { .. } => 404,

            OgcError::Cancelled => 503,
            OgcError::Timeout => 504,
            OgcError::InternalError(_) => 500,

            _ => 400,
        }
    }
}

impl From<BboxParseError> for OgcError {
    fn from(err: BboxParseError) -> Self {
        OgcError::InvalidBoundingBox(err.to_string())
    }
}

impl From<CrsParseError> for OgcError {
    fn from(err: CrsParseError) -> Self {
        OgcError::invalid_crs("crs", err.to_string())
    }
}

impl From<TransformError> for OgcError {
    fn from(err: TransformError) -> Self {
        match err {
            TransformError::Unsupported { .. } => OgcError::invalid_crs("crs", err.to_string()),
            TransformError::OutOfDomain { .. } => OgcError::InvalidBoundingBox(err.to_string()),
        }
    }
}

impl From<TimeParseError> for OgcError {
    fn from(err: TimeParseError) -> Self {
        OgcError::invalid_param("time", err.to_string())
    }
}

// style and layer errors are configuration faults, never the client's
impl From<StyleError> for OgcError {
    fn from(err: StyleError) -> Self {
        OgcError::InternalError(err.to_string())
    }
}

impl From<LayerError> for OgcError {
    fn from(err: LayerError) -> Self {
        OgcError::InternalError(err.to_string())
    }
}

impl From<GridError> for OgcError {
    fn from(err: GridError) -> Self {
        match err {
            GridError::InvalidSize { .. } => OgcError::InvalidDimensions(err.to_string()),
            GridError::InvalidResolution { .. } => OgcError::invalid_param("resx", err.to_string()),
            GridError::InvalidBbox(e) => e.into(),
            GridError::NoOverlap => OgcError::NoOverlap,
            GridError::Transform(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_hides_cause() {
        let err = OgcError::DataUnavailable {
            layer: "elevation".into(),
            source: ProviderError::backend("connection refused to 10.0.0.7"),
        };
        assert!(!err.client_message().contains("10.0.0.7"));
        assert_eq!(err.http_status(), 404);

        let err = OgcError::InternalError("stack overflow in decoder".into());
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn test_grid_errors_convert() {
        assert_eq!(OgcError::from(GridError::NoOverlap).kind(), ErrorKind::NoOverlap);
        let err: OgcError = GridError::InvalidSize { width: 0, height: 1 }.into();
        assert_eq!(err.kind(), ErrorKind::InvalidDimensions);
    }

    #[test]
    fn test_locator() {
        assert_eq!(
            OgcError::MissingParameterValue("bbox".into()).locator(),
            Some("bbox")
        );
        assert_eq!(OgcError::Timeout.locator(), None);
    }

    #[test]
    fn test_locator_names_the_offending_key() {
        assert_eq!(OgcError::invalid_crs("srs", "EPSG:1").locator(), Some("srs"));
        assert_eq!(
            OgcError::invalid_format("info_format", "image/png").locator(),
            Some("info_format")
        );
        assert_eq!(
            OgcError::invalid_format("format", "image/webp").to_string(),
            "Requested format not supported: image/webp"
        );
    }
}
