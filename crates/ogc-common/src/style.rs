//! Styles: colour mappings from coverage values to RGBA.
//!
//! A [`StyleDefinition`] is the serde-facing configuration form. It is
//! validated into a [`Style`], which is immutable and shared between layers
//! through `Arc`.

use serde::{Deserialize, Serialize};

/// RGBA colour, 8 bits per channel.
pub type Rgba = [u8; 4];

/// Fully transparent black, the default no-data colour.
pub const TRANSPARENT: Rgba = [0, 0, 0, 0];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StyleError {
    #[error("Style '{0}' must have at least one color stop")]
    NoStops(String),

    #[error("Style '{name}': color stops must be strictly increasing ({previous} then {next})")]
    UnorderedStops { name: String, previous: f64, next: f64 },

    #[error("Style '{name}': stop value {value} is not finite")]
    NonFiniteStop { name: String, value: f64 },

    #[error("Invalid color: {0}")]
    InvalidColor(String),
}

/// Colour in any of the accepted configuration spellings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Color {
    /// "#RRGGBB", "#RRGGBBAA" or a named colour
    Text(String),

    /// RGB array: [r, g, b] or [r, g, b, a]
    Array(Vec<u8>),

    /// Explicit RGBA
    Rgba {
        r: u8,
        g: u8,
        b: u8,
        #[serde(default = "opaque")]
        a: u8,
    },
}

fn opaque() -> u8 {
    255
}

impl Color {
    /// Resolve to an RGBA quadruple.
    pub fn to_rgba(&self) -> Result<Rgba, StyleError> {
        match self {
            Color::Text(s) if s.starts_with('#') => parse_hex_color(s),
            Color::Text(s) => named_color(s).ok_or_else(|| StyleError::InvalidColor(s.clone())),
            Color::Array(arr) => match arr.as_slice() {
                [r, g, b] => Ok([*r, *g, *b, 255]),
                [r, g, b, a] => Ok([*r, *g, *b, *a]),
                _ => Err(StyleError::InvalidColor(format!("{:?}", arr))),
            },
            Color::Rgba { r, g, b, a } => Ok([*r, *g, *b, *a]),
        }
    }
}

/// Parse "#RRGGBB" / "#RRGGBBAA" and the KVP "0xRRGGBB" form.
pub fn parse_hex_color(s: &str) -> Result<Rgba, StyleError> {
    let hex = s
        .trim()
        .trim_start_matches('#')
        .trim_start_matches("0x")
        .trim_start_matches("0X");
    let channel = |i: usize| {
        hex.get(i..i + 2)
            .and_then(|c| u8::from_str_radix(c, 16).ok())
            .ok_or_else(|| StyleError::InvalidColor(s.to_string()))
    };

    match hex.len() {
        6 => Ok([channel(0)?, channel(2)?, channel(4)?, 255]),
        8 => Ok([channel(0)?, channel(2)?, channel(4)?, channel(6)?]),
        _ => Err(StyleError::InvalidColor(s.to_string())),
    }
}

fn named_color(name: &str) -> Option<Rgba> {
    let rgba = match name.to_lowercase().as_str() {
        "transparent" => [0, 0, 0, 0],
        "black" => [0, 0, 0, 255],
        "white" => [255, 255, 255, 255],
        "red" => [255, 0, 0, 255],
        "green" => [0, 255, 0, 255],
        "blue" => [0, 0, 255, 255],
        "yellow" => [255, 255, 0, 255],
        "cyan" => [0, 255, 255, 255],
        "magenta" => [255, 0, 255, 255],
        "orange" => [255, 165, 0, 255],
        "purple" => [128, 0, 128, 255],
        "brown" => [165, 42, 42, 255],
        "gray" | "grey" => [128, 128, 128, 255],
        _ => return None,
    };
    Some(rgba)
}

/// Interpolation method between color stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Blend between the two bracketing stops. Domain is `[first, last]`.
    #[default]
    Linear,
    /// Colour of the greatest stop not above the value. Domain is `[first, +inf)`.
    Step,
}

/// A color stop as written in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorStop {
    pub value: f64,
    pub color: Color,
    #[serde(default)]
    pub label: Option<String>,
}

/// Configuration form of a style.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleDefinition {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    pub stops: Vec<ColorStop>,
    #[serde(default)]
    pub interpolation: Interpolation,
    #[serde(default)]
    pub no_data_color: Option<Color>,
    #[serde(default)]
    pub legend_title: Option<String>,
    #[serde(default)]
    pub units: Option<String>,
}

/// A resolved breakpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Breakpoint {
    pub value: f64,
    pub color: Rgba,
    pub label: Option<String>,
}

impl Breakpoint {
    pub fn new(value: f64, color: Rgba) -> Self {
        Self {
            value,
            color,
            label: None,
        }
    }
}

/// Legend metadata carried by a style.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegendInfo {
    pub title: Option<String>,
    pub units: Option<String>,
}

/// A validated, immutable colour mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    name: String,
    title: String,
    abstract_text: Option<String>,
    breakpoints: Vec<Breakpoint>,
    interpolation: Interpolation,
    no_data: Rgba,
    legend: LegendInfo,
}

impl Style {
    /// Create a style. Breakpoints must be non-empty, finite and strictly increasing.
    pub fn new(
        name: impl Into<String>,
        breakpoints: Vec<Breakpoint>,
        interpolation: Interpolation,
    ) -> Result<Self, StyleError> {
        let name = name.into();
        if breakpoints.is_empty() {
            return Err(StyleError::NoStops(name));
        }
        for bp in &breakpoints {
            if !bp.value.is_finite() {
                return Err(StyleError::NonFiniteStop {
                    name,
                    value: bp.value,
                });
            }
        }
        for pair in breakpoints.windows(2) {
            if pair[1].value <= pair[0].value {
                return Err(StyleError::UnorderedStops {
                    name,
                    previous: pair[0].value,
                    next: pair[1].value,
                });
            }
        }

        Ok(Self {
            title: name.clone(),
            name,
            abstract_text: None,
            breakpoints,
            interpolation,
            no_data: TRANSPARENT,
            legend: LegendInfo::default(),
        })
    }

    /// Black-to-white ramp over `[min, max]`.
    pub fn grayscale(name: impl Into<String>, min: f64, max: f64) -> Result<Self, StyleError> {
        let style = Self::new(
            name,
            vec![
                Breakpoint::new(min, [0, 0, 0, 255]),
                Breakpoint::new(max, [255, 255, 255, 255]),
            ],
            Interpolation::Linear,
        )?;
        Ok(style.with_title("Grayscale"))
    }

    /// Validate a configuration entry.
    pub fn from_definition(def: &StyleDefinition) -> Result<Self, StyleError> {
        let breakpoints = def
            .stops
            .iter()
            .map(|stop| {
                Ok(Breakpoint {
                    value: stop.value,
                    color: stop.color.to_rgba()?,
                    label: stop.label.clone(),
                })
            })
            .collect::<Result<Vec<_>, StyleError>>()?;

        let mut style = Self::new(def.name.clone(), breakpoints, def.interpolation)?;
        if let Some(title) = &def.title {
            style.title = title.clone();
        }
        style.abstract_text = def.abstract_text.clone();
        if let Some(color) = &def.no_data_color {
            style.no_data = color.to_rgba()?;
        }
        style.legend = LegendInfo {
            title: def.legend_title.clone(),
            units: def.units.clone(),
        };
        Ok(style)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_abstract(mut self, text: impl Into<String>) -> Self {
        self.abstract_text = Some(text.into());
        self
    }

    pub fn with_legend(mut self, legend: LegendInfo) -> Self {
        self.legend = legend;
        self
    }

    pub fn with_no_data(mut self, color: Rgba) -> Self {
        self.no_data = color;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn abstract_text(&self) -> Option<&str> {
        self.abstract_text.as_deref()
    }

    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    pub fn no_data(&self) -> Rgba {
        self.no_data
    }

    pub fn legend(&self) -> &LegendInfo {
        &self.legend
    }

    /// Step styles whose every stop is labelled read as categories.
    pub fn is_enumerated(&self) -> bool {
        self.interpolation == Interpolation::Step
            && self.breakpoints.iter().all(|bp| bp.label.is_some())
    }

    /// First and last stop values.
    pub fn value_range(&self) -> (f64, f64) {
        let first = self.breakpoints[0].value;
        let last = self.breakpoints[self.breakpoints.len() - 1].value;
        (first, last)
    }

    /// Values this style maps to a colour other than no-data.
    pub fn in_domain(&self, value: f64) -> bool {
        let (first, last) = self.value_range();
        match self.interpolation {
            Interpolation::Linear => value >= first && value <= last,
            Interpolation::Step => value.is_finite() && value >= first,
        }
    }

    /// Colour for a single value. NaN and out-of-domain values get the no-data colour.
    pub fn color_for(&self, value: f64) -> Rgba {
        if value.is_nan() || !self.in_domain(value) {
            return self.no_data;
        }

        // index of the first stop strictly above the value
        let upper = self.breakpoints.partition_point(|bp| bp.value <= value);
        let lower = &self.breakpoints[upper.saturating_sub(1)];

        match self.interpolation {
            Interpolation::Step => lower.color,
            Interpolation::Linear => match self.breakpoints.get(upper) {
                None => lower.color,
                Some(high) => {
                    let t = (value - lower.value) / (high.value - lower.value);
                    lerp(lower.color, high.color, t)
                }
            },
        }
    }

    /// Map a buffer of values to RGBA bytes (4 per value).
    pub fn apply(&self, values: &[f32]) -> Vec<u8> {
        let mut out = Vec::with_capacity(values.len() * 4);
        for v in values {
            out.extend_from_slice(&self.color_for(*v as f64));
        }
        out
    }
}

fn lerp(a: Rgba, b: Rgba, t: f64) -> Rgba {
    let t = t.clamp(0.0, 1.0);
    let mix = |x: u8, y: u8| ((x as f64) * (1.0 - t) + (y as f64) * t).round() as u8;
    [mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2]), mix(a[3], b[3])]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Style {
        Style::new(
            "ramp",
            vec![
                Breakpoint::new(0.0, [0, 0, 255, 255]),
                Breakpoint::new(10.0, [255, 0, 0, 255]),
            ],
            Interpolation::Linear,
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_empty_and_unordered() {
        assert!(matches!(
            Style::new("s", vec![], Interpolation::Linear),
            Err(StyleError::NoStops(_))
        ));
        let err = Style::new(
            "s",
            vec![Breakpoint::new(1.0, [0; 4]), Breakpoint::new(1.0, [0; 4])],
            Interpolation::Linear,
        )
        .unwrap_err();
        assert!(matches!(err, StyleError::UnorderedStops { .. }));
    }

    #[test]
    fn test_linear_interpolation() {
        let style = ramp();
        assert_eq!(style.color_for(0.0), [0, 0, 255, 255]);
        assert_eq!(style.color_for(10.0), [255, 0, 0, 255]);
        assert_eq!(style.color_for(5.0), [128, 0, 128, 255]);
    }

    #[test]
    fn test_out_of_domain_is_no_data() {
        let style = ramp();
        assert_eq!(style.color_for(-0.1), TRANSPARENT);
        assert_eq!(style.color_for(10.1), TRANSPARENT);
        assert_eq!(style.color_for(f64::NAN), TRANSPARENT);
    }

    #[test]
    fn test_step_interpolation() {
        let style = Style::new(
            "classes",
            vec![
                Breakpoint::new(0.0, [1, 1, 1, 255]),
                Breakpoint::new(5.0, [2, 2, 2, 255]),
            ],
            Interpolation::Step,
        )
        .unwrap();
        assert_eq!(style.color_for(4.99), [1, 1, 1, 255]);
        assert_eq!(style.color_for(5.0), [2, 2, 2, 255]);
        assert_eq!(style.color_for(1e9), [2, 2, 2, 255]);
        assert_eq!(style.color_for(-1.0), TRANSPARENT);
        assert_eq!(style.color_for(f64::INFINITY), TRANSPARENT);
    }

    #[test]
    fn test_labelled_step_style_is_enumerated() {
        let labelled = |value: f64, label: &str| Breakpoint {
            label: Some(label.to_string()),
            ..Breakpoint::new(value, [0, 0, 0, 255])
        };
        let classes = vec![labelled(1.0, "water"), labelled(2.0, "land")];
        let style = Style::new("classes", classes.clone(), Interpolation::Step).unwrap();
        assert!(style.is_enumerated());

        let linear = Style::new("classes", classes, Interpolation::Linear).unwrap();
        assert!(!linear.is_enumerated());
        let partial = Style::new(
            "classes",
            vec![labelled(1.0, "water"), Breakpoint::new(2.0, [0; 4])],
            Interpolation::Step,
        )
        .unwrap();
        assert!(!partial.is_enumerated());
    }

    #[test]
    fn test_apply_buffer() {
        let rgba = ramp().apply(&[0.0, f32::NAN]);
        assert_eq!(rgba, vec![0, 0, 255, 255, 0, 0, 0, 0]);
    }

    #[test]
    fn test_color_parsing() {
        assert_eq!(Color::Text("#ff0000".into()).to_rgba().unwrap(), [255, 0, 0, 255]);
        assert_eq!(Color::Text("#00ff0080".into()).to_rgba().unwrap(), [0, 255, 0, 128]);
        assert_eq!(Color::Text("white".into()).to_rgba().unwrap(), [255, 255, 255, 255]);
        assert_eq!(Color::Array(vec![1, 2, 3]).to_rgba().unwrap(), [1, 2, 3, 255]);
        assert!(Color::Text("#12".into()).to_rgba().is_err());
        assert!(Color::Text("chartreuse-ish".into()).to_rgba().is_err());
        assert_eq!(parse_hex_color("0xFFFFFF").unwrap(), [255, 255, 255, 255]);
    }

    #[test]
    fn test_definition_from_json() {
        let def: StyleDefinition = serde_json::from_str(
            r##"{
                "name": "temperature",
                "title": "Temperature",
                "stops": [
                    {"value": -40, "color": "#0000ff", "label": "cold"},
                    {"value": 40, "color": [255, 0, 0]}
                ],
                "units": "C"
            }"##,
        )
        .unwrap();
        let style = Style::from_definition(&def).unwrap();
        assert_eq!(style.title(), "Temperature");
        assert_eq!(style.value_range(), (-40.0, 40.0));
        assert_eq!(style.legend().units.as_deref(), Some("C"));
        assert_eq!(style.breakpoints()[0].label.as_deref(), Some("cold"));
    }
}
