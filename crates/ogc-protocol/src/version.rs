//! Service identification and version negotiation.
//!
//! Negotiation picks the highest supported version that is not above the
//! requested one. A request below every supported version gets the lowest,
//! and a request without a version gets the highest.

use std::fmt;
use std::str::FromStr;

use ogc_common::{AxisConvention, OgcError, OgcResult};

use crate::params::KvpParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Wms,
    Wcs,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Wms => "WMS",
            Service::Wcs => "WCS",
        }
    }

    /// Supported versions, ascending.
    pub fn versions(&self) -> &'static [ServiceVersion] {
        match self {
            Service::Wms => &[ServiceVersion::Wms111, ServiceVersion::Wms130],
            Service::Wcs => &[ServiceVersion::Wcs100, ServiceVersion::Wcs201],
        }
    }

    pub fn highest(&self) -> ServiceVersion {
        let versions = self.versions();
        versions[versions.len() - 1]
    }

    pub fn lowest(&self) -> ServiceVersion {
        self.versions()[0]
    }

    /// Pick the version to answer with.
    pub fn negotiate(&self, requested: Option<&str>) -> OgcResult<ServiceVersion> {
        let Some(raw) = requested.map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(self.highest());
        };
        let wanted: Version = raw
            .parse()
            .map_err(|_| OgcError::UnsupportedVersion(raw.to_string()))?;

        Ok(self
            .versions()
            .iter()
            .rev()
            .find(|v| v.version() <= wanted)
            .copied()
            .unwrap_or_else(|| self.lowest()))
    }

    /// WCS `acceptversions`: the first listed supported version wins,
    /// otherwise the first entry is negotiated.
    pub fn negotiate_accept(&self, accept: &str) -> OgcResult<ServiceVersion> {
        let entries: Vec<&str> = accept
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect();

        for entry in &entries {
            let version: Version = entry
                .parse()
                .map_err(|_| OgcError::UnsupportedVersion(entry.to_string()))?;
            if let Some(exact) = self.versions().iter().find(|v| v.version() == version) {
                return Ok(*exact);
            }
        }
        self.negotiate(entries.first().copied())
    }
}

impl FromStr for Service {
    type Err = OgcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "WMS" => Ok(Service::Wms),
            "WCS" => Ok(Service::Wcs),
            _ => Err(OgcError::InvalidService(s.to_string())),
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dotted version number, compared numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed version string: '{0}'")]
pub struct VersionParseError(String);

impl FromStr for Version {
    type Err = VersionParseError;

    /// One to three dot-separated integers; missing parts are zero.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || VersionParseError(s.to_string());
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(err());
        }
        let mut numbers = [0u32; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(err());
            }
            *slot = part.parse().map_err(|_| err())?;
        }
        Ok(Version::new(numbers[0], numbers[1], numbers[2]))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A supported (service, version) pair. Every handler and document builder
/// dispatches on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceVersion {
    Wms111,
    Wms130,
    Wcs100,
    Wcs201,
}

impl ServiceVersion {
    pub fn service(&self) -> Service {
        match self {
            ServiceVersion::Wms111 | ServiceVersion::Wms130 => Service::Wms,
            ServiceVersion::Wcs100 | ServiceVersion::Wcs201 => Service::Wcs,
        }
    }

    pub fn version(&self) -> Version {
        match self {
            ServiceVersion::Wms111 => Version::new(1, 1, 1),
            ServiceVersion::Wms130 => Version::new(1, 3, 0),
            ServiceVersion::Wcs100 => Version::new(1, 0, 0),
            ServiceVersion::Wcs201 => Version::new(2, 0, 1),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceVersion::Wms111 => "1.1.1",
            ServiceVersion::Wms130 => "1.3.0",
            ServiceVersion::Wcs100 => "1.0.0",
            ServiceVersion::Wcs201 => "2.0.1",
        }
    }

    /// WMS 1.3.0 and WCS 2.0.1 honour the CRS authority's axis order.
    pub fn axis_convention(&self) -> AxisConvention {
        match self {
            ServiceVersion::Wms130 | ServiceVersion::Wcs201 => AxisConvention::Authority,
            ServiceVersion::Wms111 | ServiceVersion::Wcs100 => AxisConvention::Traditional,
        }
    }

    /// Best-effort version for reporting an error on a request that may not
    /// have parsed. Unknown services fall back to WMS 1.3.0.
    pub fn for_exception(params: &KvpParams) -> ServiceVersion {
        let Some(service) = params
            .get_nonempty("service")
            .and_then(|s| s.parse::<Service>().ok())
        else {
            return ServiceVersion::Wms130;
        };

        let negotiated = match params.get_nonempty("acceptversions") {
            Some(accept) if service == Service::Wcs => service.negotiate_accept(accept),
            _ => service.negotiate(params.get_nonempty("version")),
        };
        negotiated.unwrap_or_else(|_| service.highest())
    }
}

impl fmt::Display for ServiceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.service(), self.as_str())
    }
}
