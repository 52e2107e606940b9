//! Request parsing and validation.
//!
//! [`parse`] turns raw KVP parameters into an [`OgcRequest`]. Every check
//! that can be made without touching data happens here, so the engine only
//! ever sees requests whose layers, styles, CRSs, extents and sizes are
//! known to be valid.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use ogc_common::style::parse_hex_color;
use ogc_common::time::parse_iso8601;
use ogc_common::{
    AxisOrder, BoundingBox, CoordinateGrid, Crs, Layer, LayerRegistry, OgcError, OgcResult, Rgba,
    Style, TimeSpec,
};

use crate::config::RequestLimits;
use crate::getfeatureinfo::InfoFormat;
use crate::params::KvpParams;
use crate::version::{Service, ServiceVersion};

// ============================================================================
// Request types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetCapabilities,
    GetMap,
    GetFeatureInfo,
    GetLegendGraphic,
    DescribeCoverage,
    GetCoverage,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::GetCapabilities => "GetCapabilities",
            Operation::GetMap => "GetMap",
            Operation::GetFeatureInfo => "GetFeatureInfo",
            Operation::GetLegendGraphic => "GetLegendGraphic",
            Operation::DescribeCoverage => "DescribeCoverage",
            Operation::GetCoverage => "GetCoverage",
        }
    }

    /// Match a REQUEST value, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "GETCAPABILITIES" | "CAPABILITIES" => Some(Operation::GetCapabilities),
            "GETMAP" | "MAP" => Some(Operation::GetMap),
            "GETFEATUREINFO" | "FEATUREINFO" => Some(Operation::GetFeatureInfo),
            "GETLEGENDGRAPHIC" => Some(Operation::GetLegendGraphic),
            "DESCRIBECOVERAGE" => Some(Operation::DescribeCoverage),
            "GETCOVERAGE" => Some(Operation::GetCoverage),
            _ => None,
        }
    }
}

/// Image formats for GetMap and GetLegendGraphic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    pub const MEDIA_TYPES: [&'static str; 2] = ["image/png", "image/jpeg"];

    pub fn parse(s: &str) -> OgcResult<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "image/png" | "image/png8" | "image/png;mode=8bit" | "png" => Ok(ImageFormat::Png),
            "image/jpeg" | "image/jpg" | "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            _ => Err(OgcError::invalid_format("format", s)),
        }
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

/// Coverage encodings for GetCoverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageFormat {
    GeoTiff,
}

impl CoverageFormat {
    pub fn parse(s: &str) -> OgcResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "geotiff" | "image/tiff" | "image/geotiff" | "image/tiff;application=geotiff" => {
                Ok(CoverageFormat::GeoTiff)
            }
            _ => Err(OgcError::invalid_format("format", s)),
        }
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            CoverageFormat::GeoTiff => "image/tiff",
        }
    }

    /// Name advertised in WCS 1.0.0 documents.
    pub fn wcs10_name(&self) -> &'static str {
        match self {
            CoverageFormat::GeoTiff => "GeoTIFF",
        }
    }
}

/// One requested layer with its resolved style and dimension values.
#[derive(Debug, Clone)]
pub struct LayerSelection {
    pub layer: Arc<Layer>,
    pub style: Arc<Style>,
    pub time: Option<DateTime<Utc>>,
    pub elevation: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct GetCapabilities {
    pub version: ServiceVersion,
}

#[derive(Debug, Clone)]
pub struct GetMap {
    pub version: ServiceVersion,
    /// Bottom-most first
    pub layers: Vec<LayerSelection>,
    pub grid: CoordinateGrid,
    pub format: ImageFormat,
    pub transparent: bool,
    pub background: Rgba,
}

#[derive(Debug, Clone)]
pub struct GetFeatureInfo {
    pub version: ServiceVersion,
    pub query_layers: Vec<LayerSelection>,
    /// The map the query pixel refers to
    pub grid: CoordinateGrid,
    pub i: usize,
    pub j: usize,
    pub info_format: InfoFormat,
    pub feature_count: usize,
}

#[derive(Debug, Clone)]
pub struct GetLegendGraphic {
    pub version: ServiceVersion,
    pub layer: Arc<Layer>,
    pub style: Arc<Style>,
    pub format: ImageFormat,
    /// `None` means the configured legend size
    pub width: Option<usize>,
    pub height: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct DescribeCoverage {
    pub version: ServiceVersion,
    pub coverages: Vec<Arc<Layer>>,
}

/// Requested extent per axis, in the subsetting CRS. A missing axis means
/// the layer's full extent on that axis.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisSubset {
    pub x: Option<(f64, f64)>,
    pub y: Option<(f64, f64)>,
}

impl AxisSubset {
    pub fn from_bbox(bbox: &BoundingBox) -> Self {
        Self {
            x: Some((bbox.min_x, bbox.max_x)),
            y: Some((bbox.min_y, bbox.max_y)),
        }
    }

    /// Fill missing axes from `full`.
    pub fn resolve(&self, full: &BoundingBox) -> BoundingBox {
        let (min_x, max_x) = self.x.unwrap_or((full.min_x, full.max_x));
        let (min_y, max_y) = self.y.unwrap_or((full.min_y, full.max_y));
        BoundingBox::new(min_x, min_y, max_x, max_y)
    }

    pub fn is_full(&self) -> bool {
        self.x.is_none() && self.y.is_none()
    }
}

/// How the output cell count of a coverage is chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputSize {
    Cells { width: usize, height: usize },
    /// Cell size in output CRS units
    Resolution { x: f64, y: f64 },
    /// The layer's native resolution over the subset
    Native,
}

#[derive(Debug, Clone)]
pub struct GetCoverage {
    pub version: ServiceVersion,
    pub layer: Arc<Layer>,
    pub time: Option<DateTime<Utc>>,
    pub elevation: Option<f64>,
    pub subset_crs: Crs,
    pub subset: AxisSubset,
    pub output_crs: Crs,
    pub size: OutputSize,
    pub format: CoverageFormat,
}

/// A parsed, validated request.
#[derive(Debug, Clone)]
pub enum OgcRequest {
    GetCapabilities(GetCapabilities),
    GetMap(GetMap),
    GetFeatureInfo(GetFeatureInfo),
    GetLegendGraphic(GetLegendGraphic),
    DescribeCoverage(DescribeCoverage),
    GetCoverage(GetCoverage),
}

impl OgcRequest {
    pub fn version(&self) -> ServiceVersion {
        match self {
            OgcRequest::GetCapabilities(r) => r.version,
            OgcRequest::GetMap(r) => r.version,
            OgcRequest::GetFeatureInfo(r) => r.version,
            OgcRequest::GetLegendGraphic(r) => r.version,
            OgcRequest::DescribeCoverage(r) => r.version,
            OgcRequest::GetCoverage(r) => r.version,
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            OgcRequest::GetCapabilities(_) => Operation::GetCapabilities,
            OgcRequest::GetMap(_) => Operation::GetMap,
            OgcRequest::GetFeatureInfo(_) => Operation::GetFeatureInfo,
            OgcRequest::GetLegendGraphic(_) => Operation::GetLegendGraphic,
            OgcRequest::DescribeCoverage(_) => Operation::DescribeCoverage,
            OgcRequest::GetCoverage(_) => Operation::GetCoverage,
        }
    }
}

// ============================================================================
// Entry point
// ============================================================================

/// Parse and validate one request against the registry.
pub fn parse(
    params: &KvpParams,
    registry: &LayerRegistry,
    limits: &RequestLimits,
) -> OgcResult<OgcRequest> {
    let service: Service = params
        .get_nonempty("service")
        .ok_or_else(|| OgcError::InvalidService(String::new()))?
        .parse()?;

    let request = params.require("request")?;
    let operation = Operation::from_name(request)
        .ok_or_else(|| OgcError::OperationNotSupported(request.to_string()))?;

    let version = match (service, operation, params.get_nonempty("acceptversions")) {
        (Service::Wcs, Operation::GetCapabilities, Some(accept)) => {
            service.negotiate_accept(accept)?
        }
        _ => service.negotiate(params.get_nonempty("version"))?,
    };

    debug!(
        service = %service,
        operation = operation.as_str(),
        version = version.as_str(),
        "Parsing request"
    );

    match (service, operation) {
        (_, Operation::GetCapabilities) => {
            Ok(OgcRequest::GetCapabilities(GetCapabilities { version }))
        }
        (Service::Wms, Operation::GetMap) => {
            parse_get_map(params, registry, limits, version).map(OgcRequest::GetMap)
        }
        (Service::Wms, Operation::GetFeatureInfo) => {
            parse_get_feature_info(params, registry, limits, version)
                .map(OgcRequest::GetFeatureInfo)
        }
        (Service::Wms, Operation::GetLegendGraphic) => {
            parse_get_legend_graphic(params, registry, limits, version)
                .map(OgcRequest::GetLegendGraphic)
        }
        (Service::Wcs, Operation::DescribeCoverage) => {
            parse_describe_coverage(params, registry, version).map(OgcRequest::DescribeCoverage)
        }
        (Service::Wcs, Operation::GetCoverage) => match version {
            ServiceVersion::Wcs100 => parse_get_coverage_100(params, registry, limits, version),
            _ => parse_get_coverage_201(params, registry, limits, version),
        }
        .map(OgcRequest::GetCoverage),
        (service, operation) => Err(OgcError::OperationNotSupported(format!(
            "{} is not a {} operation",
            operation.as_str(),
            service
        ))),
    }
}

// ============================================================================
// WMS
// ============================================================================

struct MapContext {
    layers: Vec<LayerSelection>,
    grid: CoordinateGrid,
}

/// Layers, styles, CRS, bbox, size and dimensions shared by GetMap and
/// GetFeatureInfo.
fn parse_map_context(
    params: &KvpParams,
    registry: &LayerRegistry,
    limits: &RequestLimits,
    version: ServiceVersion,
) -> OgcResult<MapContext> {
    let layers = parse_layer_list(params.require("layers")?, registry)?;
    limits.check_layer_count(layers.len())?;
    let styles = resolve_styles(params.get("styles"), &layers)?;

    let (crs_key, crs) = parse_map_crs(params, version)?;
    for layer in &layers {
        check_crs(layer, &crs, crs_key)?;
    }

    let order = crs.axis_order(version.axis_convention());
    let bbox = BoundingBox::from_kvp(params.require("bbox")?, order)?;

    let width = parse_size(params, "width")?;
    let height = parse_size(params, "height")?;
    limits.check_image(width, height)?;

    let grid = CoordinateGrid::new(crs, bbox, width, height)?;

    let time = parse_time(params)?;
    let elevation = parse_elevation(params)?;
    let layers = layers
        .into_iter()
        .zip(styles)
        .map(|(layer, style)| select(layer, style, time, elevation))
        .collect::<OgcResult<Vec<_>>>()?;

    Ok(MapContext { layers, grid })
}

fn parse_get_map(
    params: &KvpParams,
    registry: &LayerRegistry,
    limits: &RequestLimits,
    version: ServiceVersion,
) -> OgcResult<GetMap> {
    let MapContext { layers, grid } = parse_map_context(params, registry, limits, version)?;

    let format = params
        .get_nonempty("format")
        .map(ImageFormat::parse)
        .transpose()?
        .unwrap_or(ImageFormat::Png);

    let transparent = parse_bool(params, "transparent")?.unwrap_or(false);

    let background = match params.get_nonempty("bgcolor") {
        None => [255, 255, 255, 255],
        Some(raw) => {
            let [r, g, b, _] = parse_hex_color(raw)
                .map_err(|e| OgcError::invalid_param("bgcolor", e.to_string()))?;
            [r, g, b, 255]
        }
    };

    Ok(GetMap {
        version,
        layers,
        grid,
        format,
        transparent,
        background,
    })
}

fn parse_get_feature_info(
    params: &KvpParams,
    registry: &LayerRegistry,
    limits: &RequestLimits,
    version: ServiceVersion,
) -> OgcResult<GetFeatureInfo> {
    let MapContext { layers, grid } = parse_map_context(params, registry, limits, version)?;

    let mut query_layers = Vec::new();
    for name in split_list(params.require("query_layers")?) {
        let selection = layers
            .iter()
            .find(|s| s.layer.name() == name)
            .ok_or_else(|| OgcError::LayerNotDefined(name.to_string()))?;
        if !selection.layer.is_queryable() {
            return Err(OgcError::LayerNotQueryable(name.to_string()));
        }
        query_layers.push(selection.clone());
    }

    let (col_key, row_key) = match version {
        ServiceVersion::Wms111 => (["x", "i"], ["y", "j"]),
        _ => (["i", "x"], ["j", "y"]),
    };
    let i = parse_point(params, &col_key, grid.width())?;
    let j = parse_point(params, &row_key, grid.height())?;

    let info_format = match params.get_nonempty("info_format") {
        None => InfoFormat::default(),
        Some(raw) => {
            InfoFormat::from_mime(raw).ok_or_else(|| OgcError::invalid_format("info_format", raw))?
        }
    };

    let feature_count = params
        .parse_opt::<usize>("feature_count", |raw| {
            OgcError::invalid_param("feature_count", format!("'{}' is not a positive integer", raw))
        })?
        .unwrap_or(1);
    if feature_count == 0 {
        return Err(OgcError::invalid_param(
            "feature_count",
            "must be at least 1",
        ));
    }

    Ok(GetFeatureInfo {
        version,
        query_layers,
        grid,
        i,
        j,
        info_format,
        feature_count,
    })
}

fn parse_get_legend_graphic(
    params: &KvpParams,
    registry: &LayerRegistry,
    limits: &RequestLimits,
    version: ServiceVersion,
) -> OgcResult<GetLegendGraphic> {
    let name = params
        .get_any(&["layer", "layers"])
        .ok_or_else(|| OgcError::MissingParameterValue("layer".to_string()))?;
    let layer = Arc::clone(registry.require(name)?);
    let style = layer.resolve_style(params.get_any(&["style", "styles"]))?;

    let format = params
        .get_nonempty("format")
        .map(ImageFormat::parse)
        .transpose()?
        .unwrap_or(ImageFormat::Png);

    let width = params
        .get_nonempty("width")
        .map(|_| parse_size(params, "width"))
        .transpose()?;
    let height = params
        .get_nonempty("height")
        .map(|_| parse_size(params, "height"))
        .transpose()?;
    limits.check_image(width.unwrap_or(0), height.unwrap_or(0))?;

    Ok(GetLegendGraphic {
        version,
        layer,
        style,
        format,
        width,
        height,
    })
}

// ============================================================================
// WCS
// ============================================================================

fn parse_describe_coverage(
    params: &KvpParams,
    registry: &LayerRegistry,
    version: ServiceVersion,
) -> OgcResult<DescribeCoverage> {
    let names = match version {
        ServiceVersion::Wcs100 => params.get_nonempty("coverage"),
        _ => Some(params.require("coverageid")?),
    };

    let coverages = match names {
        None => registry.iter().cloned().collect(),
        Some(list) => parse_layer_list(list, registry)?,
    };
    Ok(DescribeCoverage { version, coverages })
}

fn parse_get_coverage_100(
    params: &KvpParams,
    registry: &LayerRegistry,
    limits: &RequestLimits,
    version: ServiceVersion,
) -> OgcResult<GetCoverage> {
    let layer = Arc::clone(registry.require(params.require("coverage")?)?);

    let crs = parse_crs(params.require("crs")?, "crs")?;
    check_crs(&layer, &crs, "crs")?;
    let output_crs = match params.get_nonempty("response_crs") {
        Some(raw) => {
            let response = parse_crs(raw, "response_crs")?;
            check_crs(&layer, &response, "response_crs")?;
            response
        }
        None => crs.clone(),
    };

    let bbox = BoundingBox::from_kvp(params.require("bbox")?, AxisOrder::XY)?;
    let format = CoverageFormat::parse(params.require("format")?)?;

    let size = if params.get_nonempty("width").is_some() || params.get_nonempty("height").is_some() {
        let width = parse_size(params, "width")?;
        let height = parse_size(params, "height")?;
        limits.check_coverage(width, height)?;
        OutputSize::Cells { width, height }
    } else if params.get_nonempty("resx").is_some() || params.get_nonempty("resy").is_some() {
        OutputSize::Resolution {
            x: parse_resolution(params, "resx")?,
            y: parse_resolution(params, "resy")?,
        }
    } else {
        return Err(OgcError::MissingParameterValue("width".to_string()));
    };

    let time = layer.resolve_time(parse_time(params)?)?;
    let elevation = layer.resolve_elevation(None)?;

    Ok(GetCoverage {
        version,
        layer,
        time,
        elevation,
        subset_crs: crs,
        subset: AxisSubset::from_bbox(&bbox),
        output_crs,
        size,
        format,
    })
}

fn parse_get_coverage_201(
    params: &KvpParams,
    registry: &LayerRegistry,
    limits: &RequestLimits,
    version: ServiceVersion,
) -> OgcResult<GetCoverage> {
    let layer = Arc::clone(registry.require(params.require("coverageid")?)?);

    let subset_crs = match params.get_nonempty("subsettingcrs") {
        Some(raw) => parse_crs(raw, "subsettingcrs")?,
        None => layer.grid().crs().clone(),
    };
    check_crs(&layer, &subset_crs, "subsettingcrs")?;
    let output_crs = match params.get_nonempty("outputcrs") {
        Some(raw) => parse_crs(raw, "outputcrs")?,
        None => subset_crs.clone(),
    };
    check_crs(&layer, &output_crs, "outputcrs")?;

    let mut subset = AxisSubset::default();
    let mut time = None;
    let mut time_seen = false;
    for (axis, args) in parse_dimension_calls(params.get_nonempty("subset"), "subset")? {
        match classify_axis(&axis)? {
            Axis::X | Axis::Y if args.len() != 2 => {
                return Err(OgcError::InvalidBoundingBox(format!(
                    "subset on axis '{}' needs a low and a high bound",
                    axis
                )));
            }
            Axis::X => set_axis(&mut subset.x, &axis, &args)?,
            Axis::Y => set_axis(&mut subset.y, &axis, &args)?,
            Axis::Time => {
                if time_seen {
                    return Err(OgcError::invalid_param("subset", "time axis given twice"));
                }
                time_seen = true;
                time = resolve_time_subset(&layer, &args)?;
            }
        }
    }
    if !time_seen {
        time = layer.resolve_time(None)?;
    }
    let elevation = layer.resolve_elevation(None)?;

    let size = match params.get_nonempty("scalesize") {
        Some(raw) => parse_scale_size(raw)?,
        None if params.get_nonempty("width").is_some() || params.get_nonempty("height").is_some() => {
            OutputSize::Cells {
                width: parse_size(params, "width")?,
                height: parse_size(params, "height")?,
            }
        }
        None => OutputSize::Native,
    };
    if let OutputSize::Cells { width, height } = size {
        limits.check_coverage(width, height)?;
    }

    let format = params
        .get_nonempty("format")
        .map(CoverageFormat::parse)
        .transpose()?
        .unwrap_or(CoverageFormat::GeoTiff);

    Ok(GetCoverage {
        version,
        layer,
        time,
        elevation,
        subset_crs,
        subset,
        output_crs,
        size,
        format,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
    Time,
}

fn classify_axis(name: &str) -> OgcResult<Axis> {
    match name.to_ascii_lowercase().as_str() {
        "long" | "lon" | "longitude" | "x" | "e" | "i" => Ok(Axis::X),
        "lat" | "latitude" | "y" | "n" | "j" => Ok(Axis::Y),
        "time" | "t" | "ansi" => Ok(Axis::Time),
        _ => Err(OgcError::invalid_param(
            "subset",
            format!("Unknown axis '{}'", name),
        )),
    }
}

fn set_axis(slot: &mut Option<(f64, f64)>, axis: &str, args: &[String]) -> OgcResult<()> {
    if slot.is_some() {
        return Err(OgcError::invalid_param(
            "subset",
            format!("axis '{}' given twice", axis),
        ));
    }
    let bound = |s: &String| {
        s.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                OgcError::InvalidBoundingBox(format!("'{}' is not a number on axis '{}'", s, axis))
            })
    };
    let (lo, hi) = (bound(&args[0])?, bound(&args[1])?);
    if lo >= hi {
        return Err(OgcError::InvalidBoundingBox(format!(
            "low bound {} is not below high bound {} on axis '{}'",
            lo, hi, axis
        )));
    }
    *slot = Some((lo, hi));
    Ok(())
}

/// A time slice resolves like TIME; an interval picks the latest valid
/// time inside it.
fn resolve_time_subset(layer: &Layer, args: &[String]) -> OgcResult<Option<DateTime<Utc>>> {
    match args {
        [single] => layer.resolve_time(Some(TimeSpec::parse(single)?)),
        [from, to] => {
            let Some(extent) = layer.time() else {
                return Ok(None);
            };
            let (from, to) = (parse_iso8601(from)?, parse_iso8601(to)?);
            extent.latest_within(&from, &to).map(Some).ok_or_else(|| {
                OgcError::invalid_param(
                    "subset",
                    format!("no valid time of layer '{}' in the requested interval", layer.name()),
                )
            })
        }
        _ => Err(OgcError::invalid_param(
            "subset",
            "time takes one value or an interval",
        )),
    }
}

fn parse_scale_size(raw: &str) -> OgcResult<OutputSize> {
    let mut width = None;
    let mut height = None;
    for (axis, args) in parse_dimension_calls(Some(raw), "scalesize")? {
        let [value] = args.as_slice() else {
            return Err(OgcError::invalid_param(
                "scalesize",
                format!("axis '{}' takes a single size", axis),
            ));
        };
        let cells = value
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| OgcError::InvalidDimensions(format!("scalesize {}({})", axis, value)))?;
        match classify_axis(&axis) {
            Ok(Axis::X) => width = Some(cells),
            Ok(Axis::Y) => height = Some(cells),
            _ => {
                return Err(OgcError::invalid_param(
                    "scalesize",
                    format!("cannot scale axis '{}'", axis),
                ))
            }
        }
    }
    match (width, height) {
        (Some(width), Some(height)) => Ok(OutputSize::Cells { width, height }),
        _ => Err(OgcError::invalid_param(
            "scalesize",
            "both a horizontal and a vertical size are required",
        )),
    }
}

/// Split `Name(a,b),Other("c")` into `[(Name, [a, b]), (Other, [c])]`.
fn parse_dimension_calls(raw: Option<&str>, param: &str) -> OgcResult<Vec<(String, Vec<String>)>> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    let malformed = || OgcError::invalid_param(param, format!("malformed value '{}'", raw));

    let mut calls = Vec::new();
    let mut rest = raw.trim();
    while !rest.is_empty() {
        let open = rest.find('(').ok_or_else(malformed)?;
        let close = rest[open..].find(')').ok_or_else(malformed)? + open;
        let name = rest[..open].trim().trim_start_matches(',').trim();
        if name.is_empty() {
            return Err(malformed());
        }
        let args = rest[open + 1..close]
            .split(',')
            .map(|a| a.trim().trim_matches('"').to_string())
            .collect::<Vec<_>>();
        if args.iter().any(String::is_empty) {
            return Err(malformed());
        }
        calls.push((name.to_string(), args));
        rest = rest[close + 1..].trim_start();
        rest = rest.strip_prefix(',').unwrap_or(rest).trim_start();
    }
    Ok(calls)
}

// ============================================================================
// Shared helpers
// ============================================================================

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim)
}

fn parse_layer_list(raw: &str, registry: &LayerRegistry) -> OgcResult<Vec<Arc<Layer>>> {
    split_list(raw)
        .map(|name| {
            if name.is_empty() {
                return Err(OgcError::LayerNotDefined(String::new()));
            }
            registry.require(name).cloned()
        })
        .collect()
}

/// STYLES: absent or empty gives defaults, one name applies to every
/// layer, otherwise one entry per layer where an empty entry is the default.
fn resolve_styles(raw: Option<&str>, layers: &[Arc<Layer>]) -> OgcResult<Vec<Arc<Style>>> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return layers.iter().map(|l| l.resolve_style(None)).collect();
    }

    let entries: Vec<&str> = split_list(raw).collect();
    if entries.len() == 1 {
        return layers
            .iter()
            .map(|l| l.resolve_style(Some(entries[0])))
            .collect();
    }
    if entries.len() != layers.len() {
        return Err(OgcError::invalid_param(
            "styles",
            format!("{} styles given for {} layers", entries.len(), layers.len()),
        ));
    }
    layers
        .iter()
        .zip(entries)
        .map(|(l, s)| l.resolve_style(Some(s)))
        .collect()
}

/// The map CRS and the key it was read from; 1.1.1 prefers `srs`.
fn parse_map_crs(
    params: &KvpParams,
    version: ServiceVersion,
) -> OgcResult<(&'static str, Crs)> {
    let keys: [&'static str; 2] = match version {
        ServiceVersion::Wms111 => ["srs", "crs"],
        _ => ["crs", "srs"],
    };
    let (key, raw) = keys
        .into_iter()
        .find_map(|key| params.get_nonempty(key).map(|raw| (key, raw)))
        .ok_or_else(|| OgcError::MissingParameterValue(keys[0].to_string()))?;
    Ok((key, parse_crs(raw, key)?))
}

fn parse_crs(raw: &str, key: &str) -> OgcResult<Crs> {
    raw.parse::<Crs>()
        .map_err(|e| OgcError::invalid_crs(key, e.to_string()))
}

fn check_crs(layer: &Layer, crs: &Crs, key: &str) -> OgcResult<()> {
    if layer.supports_crs(crs) {
        Ok(())
    } else {
        Err(OgcError::invalid_crs(
            key,
            format!("{} is not supported by layer '{}'", crs, layer.name()),
        ))
    }
}

fn parse_size(params: &KvpParams, key: &str) -> OgcResult<usize> {
    let raw = params.require(key)?;
    raw.parse::<usize>()
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| {
            OgcError::InvalidDimensions(format!("{} must be a positive integer, got '{}'", key, raw))
        })
}

fn parse_resolution(params: &KvpParams, key: &str) -> OgcResult<f64> {
    let raw = params.require(key)?;
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
        .ok_or_else(|| OgcError::invalid_param(key, format!("'{}' is not a positive number", raw)))
}

fn parse_point(params: &KvpParams, keys: &[&str; 2], limit: usize) -> OgcResult<usize> {
    let raw = params
        .get_any(keys)
        .ok_or_else(|| OgcError::MissingParameterValue(keys[0].to_string()))?;
    raw.parse::<usize>()
        .ok()
        .filter(|v| *v < limit)
        .ok_or_else(|| {
            OgcError::InvalidPoint(format!("{}={} is outside the image", keys[0], raw))
        })
}

fn parse_bool(params: &KvpParams, key: &str) -> OgcResult<Option<bool>> {
    match params.get_nonempty(key) {
        None => Ok(None),
        Some(raw) if raw.eq_ignore_ascii_case("true") => Ok(Some(true)),
        Some(raw) if raw.eq_ignore_ascii_case("false") => Ok(Some(false)),
        Some(raw) => Err(OgcError::invalid_param(
            key,
            format!("expected TRUE or FALSE, got '{}'", raw),
        )),
    }
}

fn parse_time(params: &KvpParams) -> OgcResult<Option<TimeSpec>> {
    Ok(params.get_nonempty("time").map(TimeSpec::parse).transpose()?)
}

fn parse_elevation(params: &KvpParams) -> OgcResult<Option<f64>> {
    let Some(raw) = params.get_nonempty("elevation") else {
        return Ok(None);
    };
    if raw.contains(',') || raw.contains('/') {
        return Err(OgcError::invalid_param(
            "elevation",
            "Only a single elevation value is supported",
        ));
    }
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(Some)
        .ok_or_else(|| OgcError::invalid_param("elevation", format!("'{}' is not a number", raw)))
}

fn select(
    layer: Arc<Layer>,
    style: Arc<Style>,
    time: Option<TimeSpec>,
    elevation: Option<f64>,
) -> OgcResult<LayerSelection> {
    let time = layer.resolve_time(time)?;
    let elevation = layer.resolve_elevation(elevation)?;
    Ok(LayerSelection {
        layer,
        style,
        time,
        elevation,
    })
}
