//! Service exception documents.
//!
//! Each protocol version has its own exception schema and code list. Errors
//! without a standard code keep their internal kind name in WMS and
//! WCS 1.0.0, and become `NoApplicableCode` for failures that are not the
//! client's fault.

use ogc_common::{ErrorKind, OgcError};

use crate::version::ServiceVersion;
use crate::xml::esc;

/// A rendered exception, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionDocument {
    pub status: u16,
    pub media_type: &'static str,
    pub code: &'static str,
    pub body: String,
}

const NO_APPLICABLE_CODE: &str = "NoApplicableCode";

/// Exception code for `err` in the schema of `version`.
pub fn exception_code(err: &OgcError, version: ServiceVersion) -> &'static str {
    let kind = err.kind();
    match kind {
        ErrorKind::DataUnavailable
        | ErrorKind::Cancelled
        | ErrorKind::Timeout
        | ErrorKind::InternalError => return NO_APPLICABLE_CODE,
        _ => {}
    }

    match version {
        ServiceVersion::Wms111 | ServiceVersion::Wms130 => match kind {
            ErrorKind::InvalidCrs if version == ServiceVersion::Wms111 => "InvalidSRS",
            ErrorKind::InvalidParameterValue
                if matches!(err.locator(), Some("time") | Some("elevation")) =>
            {
                "InvalidDimensionValue"
            }
            other => other.as_str(),
        },
        ServiceVersion::Wcs100 => match kind {
            ErrorKind::LayerNotDefined => "CoverageNotDefined",
            ErrorKind::InvalidCrs => "InvalidParameterValue",
            ErrorKind::LayerNotQueryable => NO_APPLICABLE_CODE,
            other => other.as_str(),
        },
        ServiceVersion::Wcs201 => match kind {
            ErrorKind::LayerNotDefined => "NoSuchCoverage",
            ErrorKind::InvalidBoundingBox | ErrorKind::NoOverlap => "InvalidSubsetting",
            ErrorKind::UnsupportedVersion => "VersionNegotiationFailed",
            ErrorKind::MissingParameterValue => "MissingParameterValue",
            ErrorKind::OperationNotSupported => "OperationNotSupported",
            ErrorKind::LayerNotQueryable => NO_APPLICABLE_CODE,
            _ => "InvalidParameterValue",
        },
    }
}

/// Render `err` as an exception document for `version`.
pub fn build_exception(err: &OgcError, version: ServiceVersion) -> ExceptionDocument {
    let code = exception_code(err, version);
    let message = err.client_message();
    // exception_1_1_1.dtd declares only `code` on ServiceException
    let locator = err
        .locator()
        .filter(|_| version != ServiceVersion::Wms111)
        .map(|l| format!(" locator=\"{}\"", esc(l)))
        .unwrap_or_default();

    let (media_type, body) = match version {
        ServiceVersion::Wms130 => (
            "text/xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<ServiceExceptionReport version="1.3.0" xmlns="http://www.opengis.net/ogc" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://www.opengis.net/ogc http://schemas.opengis.net/wms/1.3.0/exceptions_1_3_0.xsd">
  <ServiceException code="{}"{}>{}</ServiceException>
</ServiceExceptionReport>
"#,
                code,
                locator,
                esc(&message)
            ),
        ),
        ServiceVersion::Wms111 => (
            "application/vnd.ogc.se_xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE ServiceExceptionReport SYSTEM "http://schemas.opengis.net/wms/1.1.1/exception_1_1_1.dtd">
<ServiceExceptionReport version="1.1.1">
  <ServiceException code="{}"{}>{}</ServiceException>
</ServiceExceptionReport>
"#,
                code,
                locator,
                esc(&message)
            ),
        ),
        ServiceVersion::Wcs100 => (
            "application/vnd.ogc.se_xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<ServiceExceptionReport version="1.2.0" xmlns="http://www.opengis.net/ogc" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://www.opengis.net/ogc http://schemas.opengis.net/wcs/1.0.0/OGC-exception.xsd">
  <ServiceException code="{}"{}>{}</ServiceException>
</ServiceExceptionReport>
"#,
                code,
                locator,
                esc(&message)
            ),
        ),
        ServiceVersion::Wcs201 => (
            "application/xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<ows:ExceptionReport version="2.0.1" xmlns:ows="http://www.opengis.net/ows/2.0" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://www.opengis.net/ows/2.0 http://schemas.opengis.net/ows/2.0/owsExceptionReport.xsd">
  <ows:Exception exceptionCode="{}"{}>
    <ows:ExceptionText>{}</ows:ExceptionText>
  </ows:Exception>
</ows:ExceptionReport>
"#,
                code,
                locator,
                esc(&message)
            ),
        ),
    };

    ExceptionDocument {
        status: err.http_status(),
        media_type,
        code,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ogc_common::ProviderError;

    #[test]
    fn test_wms_codes() {
        let crs = OgcError::invalid_crs("crs", "EPSG:1");
        assert_eq!(exception_code(&crs, ServiceVersion::Wms130), "InvalidCRS");
        assert_eq!(exception_code(&crs, ServiceVersion::Wms111), "InvalidSRS");

        let time = OgcError::invalid_param("time", "outside extent");
        assert_eq!(
            exception_code(&time, ServiceVersion::Wms130),
            "InvalidDimensionValue"
        );
        let other = OgcError::invalid_param("transparent", "bad");
        assert_eq!(
            exception_code(&other, ServiceVersion::Wms130),
            "InvalidParameterValue"
        );
        assert_eq!(exception_code(&OgcError::NoOverlap, ServiceVersion::Wms111), "NoOverlap");
    }

    #[test]
    fn test_wcs_codes() {
        let missing = OgcError::LayerNotDefined("dem".into());
        assert_eq!(
            exception_code(&missing, ServiceVersion::Wcs100),
            "CoverageNotDefined"
        );
        assert_eq!(exception_code(&missing, ServiceVersion::Wcs201), "NoSuchCoverage");
        assert_eq!(
            exception_code(&OgcError::NoOverlap, ServiceVersion::Wcs201),
            "InvalidSubsetting"
        );
        assert_eq!(
            exception_code(&OgcError::UnsupportedVersion("3".into()), ServiceVersion::Wcs201),
            "VersionNegotiationFailed"
        );
        assert_eq!(
            exception_code(&OgcError::invalid_format("format", "x"), ServiceVersion::Wcs201),
            "InvalidParameterValue"
        );
    }

    #[test]
    fn test_server_side_failures_have_no_code() {
        for version in [ServiceVersion::Wms130, ServiceVersion::Wcs201] {
            assert_eq!(exception_code(&OgcError::Timeout, version), NO_APPLICABLE_CODE);
            assert_eq!(
                exception_code(&OgcError::InternalError("boom".into()), version),
                NO_APPLICABLE_CODE
            );
        }
    }

    #[test]
    fn test_wms130_document() {
        let doc = build_exception(
            &OgcError::MissingParameterValue("bbox".into()),
            ServiceVersion::Wms130,
        );
        assert_eq!(doc.status, 400);
        assert_eq!(doc.media_type, "text/xml");
        assert!(doc.body.contains(r#"<ServiceExceptionReport version="1.3.0""#));
        assert!(doc
            .body
            .contains(r#"<ServiceException code="MissingParameterValue" locator="bbox">"#));
    }

    #[test]
    fn test_wms111_document_has_doctype() {
        let doc = build_exception(&OgcError::NoOverlap, ServiceVersion::Wms111);
        assert_eq!(doc.media_type, "application/vnd.ogc.se_xml");
        assert!(doc.body.contains("exception_1_1_1.dtd"));
        assert!(doc.body.contains(r#"version="1.1.1""#));
    }

    #[test]
    fn test_wms111_document_has_no_locator() {
        let doc = build_exception(
            &OgcError::MissingParameterValue("bbox".into()),
            ServiceVersion::Wms111,
        );
        assert!(!doc.body.contains("locator="));
        assert!(doc
            .body
            .contains(r#"<ServiceException code="MissingParameterValue">"#));

        let wcs = build_exception(
            &OgcError::MissingParameterValue("bbox".into()),
            ServiceVersion::Wcs100,
        );
        assert!(wcs.body.contains(r#"locator="bbox""#));
    }

    #[test]
    fn test_wcs201_document() {
        let doc = build_exception(
            &OgcError::LayerNotDefined("nope".into()),
            ServiceVersion::Wcs201,
        );
        assert_eq!(doc.status, 404);
        assert_eq!(doc.media_type, "application/xml");
        assert!(doc.body.contains(r#"exceptionCode="NoSuchCoverage""#));
        assert!(doc.body.contains("<ows:ExceptionText>"));
    }

    #[test]
    fn test_cause_is_not_leaked() {
        let err = OgcError::DataUnavailable {
            layer: "dem".into(),
            source: ProviderError::backend("connection refused to 10.0.0.7"),
        };
        let doc = build_exception(&err, ServiceVersion::Wms130);
        assert_eq!(doc.status, 404);
        assert!(!doc.body.contains("10.0.0.7"));
        assert!(doc.body.contains("dem"));
    }

    #[test]
    fn test_message_is_escaped() {
        let doc = build_exception(
            &OgcError::LayerNotDefined("<script>".into()),
            ServiceVersion::Wms130,
        );
        assert!(!doc.body.contains("<script>"));
        assert!(doc.body.contains("&lt;script&gt;"));
    }
}
