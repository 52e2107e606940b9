//! Layer definitions: metadata plus the data access handle.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

use crate::crs::{Crs, CrsTransform};
use crate::error::{OgcError, OgcResult};
use crate::grid::CoordinateGrid;
use crate::provider::{Coverage, DataProvider, FetchRequest};
use crate::style::{LegendInfo, Style, StyleError};
use crate::time::{format_iso8601, TimeExtent, TimeSpec};
use crate::BoundingBox;

/// Name of the style synthesised for layers configured without styles.
pub const DEFAULT_STYLE_NAME: &str = "default";

/// Tolerance when matching a requested elevation against declared values.
const ELEVATION_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayerError {
    #[error("Layer name must not be empty")]
    EmptyName,

    #[error("Layer '{layer}': default style '{style}' is not among its styles")]
    UnknownDefaultStyle { layer: String, style: String },

    #[error("Layer '{layer}': style '{style}' listed twice")]
    DuplicateStyle { layer: String, style: String },

    #[error("Layer '{0}' declares neither styles nor a value domain")]
    NoStyles(String),

    #[error("Layer '{0}': elevation extent must not be empty")]
    EmptyElevation(String),

    #[error(transparent)]
    Style(#[from] StyleError),
}

/// Declared elevation values.
#[derive(Debug, Clone, PartialEq)]
pub enum ElevationValues {
    List(Vec<f64>),
    Range { min: f64, max: f64 },
}

/// Vertical extent of a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationExtent {
    pub values: ElevationValues,
    /// Units name, e.g. `EPSG:5030` or `meters`
    pub units: String,
    pub unit_symbol: Option<String>,
}

impl ElevationExtent {
    pub fn contains(&self, value: f64) -> bool {
        match &self.values {
            ElevationValues::List(values) => values
                .iter()
                .any(|v| (v - value).abs() <= ELEVATION_EPSILON),
            ElevationValues::Range { min, max } => {
                value >= min - ELEVATION_EPSILON && value <= max + ELEVATION_EPSILON
            }
        }
    }

    /// First listed value, or the range minimum.
    pub fn default_value(&self) -> f64 {
        match &self.values {
            ElevationValues::List(values) => values.first().copied().unwrap_or_default(),
            ElevationValues::Range { min, .. } => *min,
        }
    }

    pub fn to_extent_string(&self) -> String {
        match &self.values {
            ElevationValues::List(values) => values
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(","),
            ElevationValues::Range { min, max } => format!("{}/{}", min, max),
        }
    }
}

/// Range of values a layer's data can take.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueDomain {
    pub min: f64,
    pub max: f64,
    pub units: Option<String>,
}

/// A served coverage.
pub struct Layer {
    name: String,
    title: String,
    abstract_text: Option<String>,
    keywords: Vec<String>,
    grid: CoordinateGrid,
    supported_crs: Vec<Crs>,
    time: Option<TimeExtent>,
    elevation: Option<ElevationExtent>,
    styles: Vec<Arc<Style>>,
    default_style: usize,
    value_domain: Option<ValueDomain>,
    queryable: bool,
    provider: Arc<dyn DataProvider>,
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("name", &self.name)
            .field("grid", &self.grid)
            .field("supported_crs", &self.supported_crs)
            .field("styles", &self.styles.iter().map(|s| s.name()).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Layer`].
pub struct LayerBuilder {
    name: String,
    title: Option<String>,
    abstract_text: Option<String>,
    keywords: Vec<String>,
    grid: CoordinateGrid,
    supported_crs: Vec<Crs>,
    time: Option<TimeExtent>,
    elevation: Option<ElevationExtent>,
    styles: Vec<Arc<Style>>,
    default_style: Option<String>,
    value_domain: Option<ValueDomain>,
    queryable: bool,
    provider: Arc<dyn DataProvider>,
}

impl LayerBuilder {
    pub fn new(name: impl Into<String>, grid: CoordinateGrid, provider: Arc<dyn DataProvider>) -> Self {
        Self {
            name: name.into(),
            title: None,
            abstract_text: None,
            keywords: Vec::new(),
            grid,
            supported_crs: Vec::new(),
            time: None,
            elevation: None,
            styles: Vec::new(),
            default_style: None,
            value_domain: None,
            queryable: true,
            provider,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn abstract_text(mut self, text: impl Into<String>) -> Self {
        self.abstract_text = Some(text.into());
        self
    }

    pub fn keywords(mut self, keywords: impl IntoIterator<Item = String>) -> Self {
        self.keywords.extend(keywords);
        self
    }

    /// Additional output CRSs. The native CRS is always supported.
    pub fn supported_crs(mut self, crs: impl IntoIterator<Item = Crs>) -> Self {
        self.supported_crs.extend(crs);
        self
    }

    pub fn time(mut self, extent: TimeExtent) -> Self {
        self.time = Some(extent);
        self
    }

    pub fn elevation(mut self, extent: ElevationExtent) -> Self {
        self.elevation = Some(extent);
        self
    }

    pub fn style(mut self, style: Arc<Style>) -> Self {
        self.styles.push(style);
        self
    }

    /// Default style name. Without it the first style is the default.
    pub fn default_style(mut self, name: impl Into<String>) -> Self {
        self.default_style = Some(name.into());
        self
    }

    pub fn value_domain(mut self, domain: ValueDomain) -> Self {
        self.value_domain = Some(domain);
        self
    }

    pub fn queryable(mut self, queryable: bool) -> Self {
        self.queryable = queryable;
        self
    }

    pub fn build(self) -> Result<Layer, LayerError> {
        if self.name.trim().is_empty() {
            return Err(LayerError::EmptyName);
        }

        let mut styles = self.styles;
        for (i, style) in styles.iter().enumerate() {
            if styles[..i].iter().any(|s| s.name() == style.name()) {
                return Err(LayerError::DuplicateStyle {
                    layer: self.name,
                    style: style.name().to_string(),
                });
            }
        }

        if styles.is_empty() {
            let domain = self
                .value_domain
                .as_ref()
                .ok_or_else(|| LayerError::NoStyles(self.name.clone()))?;
            let style = Style::grayscale(DEFAULT_STYLE_NAME, domain.min, domain.max)?.with_legend(
                LegendInfo {
                    title: None,
                    units: domain.units.clone(),
                },
            );
            styles.push(Arc::new(style));
        }

        let default_style = match &self.default_style {
            Some(name) => styles.iter().position(|s| s.name() == name).ok_or_else(|| {
                LayerError::UnknownDefaultStyle {
                    layer: self.name.clone(),
                    style: name.clone(),
                }
            })?,
            None => 0,
        };

        if let Some(ElevationExtent {
            values: ElevationValues::List(values),
            ..
        }) = &self.elevation
        {
            if values.is_empty() {
                return Err(LayerError::EmptyElevation(self.name));
            }
        }

        let native = self.grid.crs().clone();
        let mut supported_crs = vec![native];
        for crs in self.supported_crs {
            if !supported_crs.contains(&crs) {
                supported_crs.push(crs);
            }
        }

        Ok(Layer {
            title: self.title.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            abstract_text: self.abstract_text,
            keywords: self.keywords,
            grid: self.grid,
            supported_crs,
            time: self.time,
            elevation: self.elevation,
            styles,
            default_style,
            value_domain: self.value_domain,
            queryable: self.queryable,
            provider: self.provider,
        })
    }
}

/// Summary of one style, as advertised in capabilities.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleSummary {
    pub name: String,
    pub title: String,
    pub abstract_text: Option<String>,
    pub is_default: bool,
}

/// Bounding box of a layer in one of its supported CRSs.
#[derive(Debug, Clone, PartialEq)]
pub struct CrsBoundingBox {
    pub crs: Crs,
    pub bbox: BoundingBox,
    /// Native cell size, only set for the native CRS
    pub resolution: Option<(f64, f64)>,
}

/// Time dimension as advertised in capabilities.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeDescription {
    pub extent: String,
    pub default: String,
    pub begin: String,
    pub end: String,
}

/// Elevation dimension as advertised in capabilities.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationDescription {
    pub extent: String,
    pub default: f64,
    pub units: String,
    pub unit_symbol: Option<String>,
}

/// Read-only capability metadata of a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDescription {
    pub name: String,
    pub title: String,
    pub abstract_text: Option<String>,
    pub keywords: Vec<String>,
    pub native_crs: Crs,
    pub native_bbox: BoundingBox,
    pub width: usize,
    pub height: usize,
    /// Footprint in CRS:84
    pub geographic_bbox: Option<BoundingBox>,
    pub bounding_boxes: Vec<CrsBoundingBox>,
    pub supported_crs: Vec<Crs>,
    pub time: Option<TimeDescription>,
    pub elevation: Option<ElevationDescription>,
    pub styles: Vec<StyleSummary>,
    pub queryable: bool,
    pub units: Option<String>,
}

impl Layer {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn abstract_text(&self) -> Option<&str> {
        self.abstract_text.as_deref()
    }

    pub fn grid(&self) -> &CoordinateGrid {
        &self.grid
    }

    pub fn supported_crs(&self) -> &[Crs] {
        &self.supported_crs
    }

    pub fn time(&self) -> Option<&TimeExtent> {
        self.time.as_ref()
    }

    pub fn elevation(&self) -> Option<&ElevationExtent> {
        self.elevation.as_ref()
    }

    pub fn styles(&self) -> &[Arc<Style>] {
        &self.styles
    }

    pub fn default_style(&self) -> &Arc<Style> {
        &self.styles[self.default_style]
    }

    pub fn value_domain(&self) -> Option<&ValueDomain> {
        self.value_domain.as_ref()
    }

    pub fn is_queryable(&self) -> bool {
        self.queryable
    }

    /// Whether `crs` (or an equivalent identifier) is an accepted output CRS.
    pub fn supports_crs(&self, crs: &Crs) -> bool {
        self.supported_crs.iter().any(|c| c.is_equivalent(crs))
    }

    /// Look up a style by name; `None` or an empty name gives the default.
    pub fn resolve_style(&self, name: Option<&str>) -> OgcResult<Arc<Style>> {
        match name.map(str::trim).filter(|n| !n.is_empty() && !n.eq_ignore_ascii_case("default")) {
            None => Ok(Arc::clone(self.default_style())),
            Some(name) => self
                .styles
                .iter()
                .find(|s| s.name() == name)
                .cloned()
                .ok_or_else(|| OgcError::StyleNotDefined {
                    layer: self.name.clone(),
                    style: name.to_string(),
                }),
        }
    }

    /// Resolve a requested time against the extent.
    ///
    /// Layers without a time dimension ignore the parameter.
    pub fn resolve_time(&self, spec: Option<TimeSpec>) -> OgcResult<Option<DateTime<Utc>>> {
        let Some(extent) = &self.time else {
            return Ok(None);
        };
        match spec {
            None | Some(TimeSpec::Current) => Ok(Some(extent.default_value())),
            Some(TimeSpec::Instant(t)) if extent.contains(&t) => Ok(Some(t)),
            Some(TimeSpec::Instant(t)) => Err(OgcError::invalid_param(
                "time",
                format!(
                    "{} is outside the time extent of layer '{}'",
                    format_iso8601(&t),
                    self.name
                ),
            )),
        }
    }

    /// Resolve a requested elevation against the extent.
    pub fn resolve_elevation(&self, value: Option<f64>) -> OgcResult<Option<f64>> {
        let Some(extent) = &self.elevation else {
            return Ok(None);
        };
        match value {
            None => Ok(Some(extent.default_value())),
            Some(v) if extent.contains(v) => Ok(Some(v)),
            Some(v) => Err(OgcError::invalid_param(
                "elevation",
                format!("{} is outside the elevation extent of layer '{}'", v, self.name),
            )),
        }
    }

    /// Capability metadata snapshot.
    ///
    /// Bounding boxes are computed for each supported CRS the transform can
    /// reach; unreachable ones are left out.
    pub fn describe(&self, transform: &dyn CrsTransform) -> LayerDescription {
        let native_crs = self.grid.crs().clone();
        let native_bbox = *self.grid.bbox();

        let geographic_bbox = transform
            .transform_bbox(&native_bbox, &native_crs, &Crs::crs84())
            .ok();

        let bounding_boxes = self
            .supported_crs
            .iter()
            .filter_map(|crs| {
                if *crs == native_crs {
                    return Some(CrsBoundingBox {
                        crs: crs.clone(),
                        bbox: native_bbox,
                        resolution: Some(self.grid.resolution()),
                    });
                }
                transform
                    .transform_bbox(&native_bbox, &native_crs, crs)
                    .ok()
                    .map(|bbox| CrsBoundingBox {
                        crs: crs.clone(),
                        bbox,
                        resolution: None,
                    })
            })
            .collect();

        let time = self.time.as_ref().map(|extent| {
            let (begin, end) = extent.bounds();
            TimeDescription {
                extent: extent.to_extent_string(),
                default: format_iso8601(&extent.default_value()),
                begin: format_iso8601(&begin),
                end: format_iso8601(&end),
            }
        });

        let elevation = self.elevation.as_ref().map(|extent| ElevationDescription {
            extent: extent.to_extent_string(),
            default: extent.default_value(),
            units: extent.units.clone(),
            unit_symbol: extent.unit_symbol.clone(),
        });

        let styles = self
            .styles
            .iter()
            .enumerate()
            .map(|(i, s)| StyleSummary {
                name: s.name().to_string(),
                title: s.title().to_string(),
                abstract_text: s.abstract_text().map(str::to_string),
                is_default: i == self.default_style,
            })
            .collect();

        LayerDescription {
            name: self.name.clone(),
            title: self.title.clone(),
            abstract_text: self.abstract_text.clone(),
            keywords: self.keywords.clone(),
            native_crs,
            native_bbox,
            width: self.grid.width(),
            height: self.grid.height(),
            geographic_bbox,
            bounding_boxes,
            supported_crs: self.supported_crs.clone(),
            time,
            elevation,
            styles,
            queryable: self.queryable,
            units: self.value_domain.as_ref().and_then(|d| d.units.clone()),
        }
    }

    /// Ask the provider for values covering `request.target`.
    ///
    /// Provider failures become `DataUnavailable` with the cause attached.
    pub async fn fetch(&self, request: &FetchRequest) -> OgcResult<Coverage> {
        let coverage = self
            .provider
            .fetch(&self.name, request)
            .await
            .map_err(|source| OgcError::DataUnavailable {
                layer: self.name.clone(),
                source,
            })?;

        if coverage.width != request.target.width()
            || coverage.height != request.target.height()
            || coverage.values.len() != coverage.width * coverage.height
        {
            return Err(OgcError::InternalError(format!(
                "provider returned {}x{} ({} values) for layer '{}', expected {}x{}",
                coverage.width,
                coverage.height,
                coverage.values.len(),
                self.name,
                request.target.width(),
                request.target.height()
            )));
        }
        Ok(coverage)
    }
}
