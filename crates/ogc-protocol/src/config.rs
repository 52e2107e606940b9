//! Service metadata and request limits.

use serde::{Deserialize, Serialize};

use ogc_common::{OgcError, OgcResult};

/// Metadata advertised in capabilities documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceInfo {
    pub title: String,

    #[serde(rename = "abstract")]
    pub abstract_text: String,

    /// Base URL of the KVP endpoint, without a trailing `?`
    pub online_resource: String,

    pub fees: String,

    pub access_constraints: String,

    pub keywords: Vec<String>,

    /// Organisation named in the contact/provider sections
    pub contact_organization: Option<String>,

    /// Default legend graphic size, also used for capabilities LegendURLs
    pub legend_width: usize,
    pub legend_height: usize,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            title: "OGC Server".to_string(),
            abstract_text: String::new(),
            online_resource: "http://localhost:8080/ogc".to_string(),
            fees: "none".to_string(),
            access_constraints: "PUBLIC".to_string(),
            keywords: Vec::new(),
            contact_organization: None,
            legend_width: 150,
            legend_height: 250,
        }
    }
}

impl ServiceInfo {
    /// GET endpoint prefix for DCP and LegendURL links.
    pub fn get_url(&self) -> String {
        let base = self.online_resource.trim_end_matches(['?', '&']);
        if base.contains('?') {
            format!("{}&", base)
        } else {
            format!("{}?", base)
        }
    }
}

/// Upper bounds on output sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestLimits {
    pub max_width: usize,
    pub max_height: usize,
    /// Cell budget for one WCS coverage
    pub max_cells: usize,
    /// Layers per GetMap, advertised as `LayerLimit`
    pub max_layers: usize,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_width: 4096,
            max_height: 4096,
            max_cells: 1024 * 1024,
            max_layers: 16,
        }
    }
}

impl RequestLimits {
    /// Image size check for GetMap, GetFeatureInfo and legends.
    pub fn check_image(&self, width: usize, height: usize) -> OgcResult<()> {
        if width > self.max_width || height > self.max_height {
            return Err(OgcError::InvalidDimensions(format!(
                "{}x{} exceeds the maximum of {}x{}",
                width, height, self.max_width, self.max_height
            )));
        }
        Ok(())
    }

    pub fn check_layer_count(&self, count: usize) -> OgcResult<()> {
        if count > self.max_layers {
            return Err(OgcError::invalid_param(
                "layers",
                format!("{} layers requested, at most {} allowed", count, self.max_layers),
            ));
        }
        Ok(())
    }

    /// Cell budget check for coverages.
    pub fn check_coverage(&self, width: usize, height: usize) -> OgcResult<()> {
        let cells = width.saturating_mul(height);
        if cells > self.max_cells {
            return Err(OgcError::InvalidDimensions(format!(
                "{}x{} ({} cells) exceeds the limit of {} cells",
                width, height, cells, self.max_cells
            )));
        }
        Ok(())
    }
}
