//! GetCapabilities and DescribeCoverage.

use std::borrow::Cow;

use ogc_protocol::request::{DescribeCoverage, GetCapabilities};
use ogc_protocol::{build_capabilities, build_describe_coverage, ServiceInfo, ServiceVersion};

use crate::context::RequestContext;
use crate::engine::OgcEngine;
use crate::response::OgcResponse;

pub(crate) fn capabilities(
    engine: &OgcEngine,
    req: &GetCapabilities,
    ctx: &RequestContext,
) -> OgcResponse {
    let service = match &ctx.base_url {
        Some(url) => Cow::Owned(ServiceInfo {
            online_resource: url.clone(),
            ..engine.service.clone()
        }),
        None => Cow::Borrowed(&engine.service),
    };
    let xml = build_capabilities(
        &engine.registry,
        &service,
        &engine.limits,
        req.version,
        engine.transform.as_ref(),
    );
    OgcResponse::ok(capabilities_media_type(req.version), xml)
}

pub(crate) fn describe_coverage(engine: &OgcEngine, req: &DescribeCoverage) -> OgcResponse {
    let xml = build_describe_coverage(&req.coverages, req.version, engine.transform.as_ref());
    OgcResponse::ok(document_media_type(req.version), xml)
}

fn capabilities_media_type(version: ServiceVersion) -> &'static str {
    match version {
        ServiceVersion::Wms111 => "application/vnd.ogc.wms_xml",
        other => document_media_type(other),
    }
}

fn document_media_type(version: ServiceVersion) -> &'static str {
    match version {
        ServiceVersion::Wcs201 => "application/xml",
        _ => "text/xml",
    }
}
