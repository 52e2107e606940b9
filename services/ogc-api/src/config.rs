//! Server configuration loader.
//!
//! One YAML file describes the service metadata, request limits, named
//! styles and the served layers. Each layer is backed by a
//! [`SyntheticProvider`] built from its `source` section.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use ogc_common::layer::{ElevationExtent, ElevationValues, ValueDomain};
use ogc_common::{
    BoundingBox, CoordinateGrid, Crs, CrsTransform, LayerBuilder, LayerRegistry, Style,
    StyleDefinition, TimeExtent,
};
use ogc_protocol::{RequestLimits, ServiceInfo};
use serde::Deserialize;
use tracing::{debug, info};

use crate::provider::{Pattern, SyntheticProvider};

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub service: ServiceInfo,
    #[serde(default)]
    pub limits: RequestLimits,
    /// Named styles layers can refer to
    #[serde(default)]
    pub styles: Vec<StyleDefinition>,
    pub layers: Vec<LayerConfig>,
}

/// One served layer.
#[derive(Debug, Clone, Deserialize)]
pub struct LayerConfig {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Native CRS, e.g. `EPSG:4326`
    pub crs: Crs,
    /// Native extent as `[min_x, min_y, max_x, max_y]` in x/y order
    pub bbox: [f64; 4],
    pub width: usize,
    pub height: usize,
    /// Extra CRSs requests may use
    #[serde(default)]
    pub supported_crs: Vec<Crs>,
    /// Names from the top-level `styles` list; the first is the default
    #[serde(default)]
    pub styles: Vec<String>,
    #[serde(default)]
    pub default_style: Option<String>,
    /// WMS time extent, e.g. `2024-01-01T00:00:00Z/2024-01-02T00:00:00Z/PT1H`
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub elevation: Option<ElevationConfig>,
    #[serde(default)]
    pub value_range: Option<ValueRangeConfig>,
    #[serde(default)]
    pub queryable: bool,
    pub source: Pattern,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ElevationConfig {
    #[serde(flatten)]
    pub values: ElevationValuesConfig,
    #[serde(default = "default_elevation_units")]
    pub units: String,
    #[serde(default)]
    pub unit_symbol: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ElevationValuesConfig {
    List { values: Vec<f64> },
    Range { min: f64, max: f64 },
}

fn default_elevation_units() -> String {
    "EPSG:5030".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValueRangeConfig {
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub units: Option<String>,
}

impl ServerConfig {
    /// Read and parse a YAML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_yaml(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        info!(
            path = %path.display(),
            styles = config.styles.len(),
            layers = config.layers.len(),
            "Loaded server config"
        );
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Build the layer registry, in file order.
    pub fn build_registry(&self, transform: Arc<dyn CrsTransform>) -> Result<LayerRegistry> {
        let mut styles: HashMap<&str, Arc<Style>> = HashMap::new();
        for definition in &self.styles {
            let style = Style::from_definition(definition)
                .with_context(|| format!("Invalid style '{}'", definition.name))?;
            if styles
                .insert(definition.name.as_str(), Arc::new(style))
                .is_some()
            {
                bail!("Style '{}' is defined twice", definition.name);
            }
        }

        let mut registry = LayerRegistry::new();
        for layer in &self.layers {
            let built = build_layer(layer, &styles, Arc::clone(&transform))
                .with_context(|| format!("Invalid layer '{}'", layer.name))?;
            registry.register(built)?;
            debug!(layer = %layer.name, "Registered layer");
        }
        Ok(registry)
    }
}

fn build_layer(
    config: &LayerConfig,
    styles: &HashMap<&str, Arc<Style>>,
    transform: Arc<dyn CrsTransform>,
) -> Result<ogc_common::Layer> {
    let [min_x, min_y, max_x, max_y] = config.bbox;
    let grid = CoordinateGrid::new(
        config.crs.clone(),
        BoundingBox::new(min_x, min_y, max_x, max_y),
        config.width,
        config.height,
    )?;

    let provider = SyntheticProvider::new(config.source.clone(), grid.clone(), transform);
    let mut builder = LayerBuilder::new(config.name.clone(), grid, Arc::new(provider))
        .queryable(config.queryable)
        .keywords(config.keywords.iter().cloned());

    if let Some(title) = &config.title {
        builder = builder.title(title.clone());
    }
    if let Some(text) = &config.abstract_text {
        builder = builder.abstract_text(text.clone());
    }

    builder = builder.supported_crs(config.supported_crs.iter().cloned());

    for name in &config.styles {
        let style = styles
            .get(name.as_str())
            .ok_or_else(|| anyhow!("unknown style '{}'", name))?;
        builder = builder.style(Arc::clone(style));
    }
    if let Some(name) = &config.default_style {
        builder = builder.default_style(name.clone());
    }

    if let Some(time) = &config.time {
        builder = builder.time(TimeExtent::parse(time)?);
    }
    if let Some(elevation) = &config.elevation {
        let values = match &elevation.values {
            ElevationValuesConfig::List { values } => ElevationValues::List(values.clone()),
            ElevationValuesConfig::Range { min, max } => ElevationValues::Range {
                min: *min,
                max: *max,
            },
        };
        builder = builder.elevation(ElevationExtent {
            values,
            units: elevation.units.clone(),
            unit_symbol: elevation.unit_symbol.clone(),
        });
    }
    if let Some(range) = &config.value_range {
        builder = builder.value_domain(ValueDomain {
            min: range.min,
            max: range.max,
            units: range.units.clone(),
        });
    }

    Ok(builder.build()?)
}
