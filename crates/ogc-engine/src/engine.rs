use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use ogc_common::{CrsTransform, ErrorKind, LayerRegistry, OgcError, OgcResult};
use ogc_protocol::request::{self, OgcRequest};
use ogc_protocol::{build_exception, KvpParams, RequestLimits, ServiceInfo, ServiceVersion};
use tracing::{debug, error, info, instrument, warn};

use crate::context::RequestContext;
use crate::handlers;
use crate::response::OgcResponse;
use crate::stage::Stage;

/// Dispatches parsed requests to the per-operation handlers.
///
/// Holds only shared, immutable state, so one engine serves any number of
/// concurrent calls.
pub struct OgcEngine {
    pub(crate) registry: Arc<LayerRegistry>,
    pub(crate) transform: Arc<dyn CrsTransform>,
    pub(crate) service: ServiceInfo,
    pub(crate) limits: RequestLimits,
}

impl OgcEngine {
    pub fn new(
        registry: Arc<LayerRegistry>,
        transform: Arc<dyn CrsTransform>,
        service: ServiceInfo,
        limits: RequestLimits,
    ) -> Self {
        info!(
            layers = registry.len(),
            title = %service.title,
            "OGC engine ready"
        );
        Self {
            registry,
            transform,
            service,
            limits,
        }
    }

    pub fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    pub fn service(&self) -> &ServiceInfo {
        &self.service
    }

    pub fn limits(&self) -> &RequestLimits {
        &self.limits
    }

    /// Answer one request. Every failure becomes an exception response.
    #[instrument(skip(self, params, ctx), fields(request = params.get("request").unwrap_or("")))]
    pub async fn handle(&self, params: &KvpParams, ctx: &RequestContext) -> OgcResponse {
        let started = Instant::now();

        let request = match request::parse(params, &self.registry, &self.limits) {
            Ok(request) => request,
            Err(err) => {
                counter!("ogc_requests_total", "operation" => "invalid").increment(1);
                return self.failure(&err, ServiceVersion::for_exception(params), Stage::Received);
            }
        };

        let operation = request.operation();
        let version = request.version();
        counter!("ogc_requests_total", "operation" => operation.as_str()).increment(1);
        debug!(
            operation = operation.as_str(),
            version = %version,
            stage = %Stage::Validated,
            "Request validated"
        );

        let mut stage = Stage::Validated;
        let result = self.dispatch(request, ctx, &mut stage).await;

        histogram!("ogc_request_duration_seconds", "operation" => operation.as_str())
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(response) => {
                debug!(
                    operation = operation.as_str(),
                    stage = %Stage::Done,
                    bytes = response.body.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Request complete"
                );
                response
            }
            Err(err) => self.failure(&err, version, stage),
        }
    }

    async fn dispatch(
        &self,
        request: OgcRequest,
        ctx: &RequestContext,
        stage: &mut Stage,
    ) -> OgcResult<OgcResponse> {
        match request {
            OgcRequest::GetCapabilities(req) => Ok(handlers::documents::capabilities(self, &req, ctx)),
            OgcRequest::DescribeCoverage(req) => {
                Ok(handlers::documents::describe_coverage(self, &req))
            }
            OgcRequest::GetMap(req) => handlers::map::get_map(self, &req, ctx, stage).await,
            OgcRequest::GetFeatureInfo(req) => {
                handlers::feature_info::get_feature_info(self, &req, ctx, stage).await
            }
            OgcRequest::GetLegendGraphic(req) => handlers::legend::get_legend_graphic(self, &req),
            OgcRequest::GetCoverage(req) => {
                handlers::coverage::get_coverage(self, &req, ctx, stage).await
            }
        }
    }

    fn failure(&self, err: &OgcError, version: ServiceVersion, stage: Stage) -> OgcResponse {
        let doc = build_exception(err, version);
        counter!("ogc_exceptions_total", "code" => doc.code).increment(1);

        match err.kind() {
            ErrorKind::InternalError => {
                error!(stage = %stage, code = doc.code, error = %err, "Request failed")
            }
            ErrorKind::DataUnavailable | ErrorKind::Cancelled | ErrorKind::Timeout => {
                warn!(stage = %stage, code = doc.code, error = %err, "Request failed")
            }
            _ => debug!(stage = %stage, code = doc.code, error = %err, "Request rejected"),
        }
        debug!(stage = %Stage::Failed, version = %version, "Exception report sent");

        OgcResponse::exception(doc)
    }
}

impl std::fmt::Debug for OgcEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OgcEngine")
            .field("layers", &self.registry.len())
            .field("service", &self.service.title)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

