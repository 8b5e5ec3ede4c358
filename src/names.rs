//! Site names and instrument naming convention.
//!
//! Instruments are identified as `SITE-CLASS-TYPE-SUBTYPE`, e.g.
//! `South-MST-NectarCam-D`. Only the site is drawn from a closed set; it is
//! accepted case-insensitively and through the observatory aliases.

use crate::error::{SimtoolsError, SimtoolsResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Observatory site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Site {
    /// CTAO-North (La Palma).
    North,
    /// CTAO-South (Paranal).
    South,
}

impl Site {
    /// All sites in canonical order.
    pub const ALL: [Site; 2] = [Site::North, Site::South];

    /// Canonical site name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Site::North => "North",
            Site::South => "South",
        }
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Site::North => &["north", "lapalma"],
            Site::South => &["south", "paranal"],
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Site {
    type Err = SimtoolsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        for site in Site::ALL {
            if site.aliases().contains(&lower.as_str()) {
                if s != site.as_str() {
                    tracing::debug!("Correcting site name {} -> {}", s, site);
                }
                return Ok(site);
            }
        }
        tracing::error!("Invalid site name {}", s);
        Err(SimtoolsError::invalid("SITE", s))
    }
}

/// Validate a site name and return its canonical spelling.
pub fn validate_site_name(name: &str) -> SimtoolsResult<Site> {
    name.parse()
}

/// Compose an instrument name following the `SITE-CLASS-TYPE-SUBTYPE` convention.
pub fn instrument_name(
    site: &str,
    class: &str,
    instrument_type: &str,
    subtype: &str,
) -> SimtoolsResult<String> {
    let site = validate_site_name(site)?;
    Ok(format!("{}-{}-{}-{}", site, class, instrument_type, subtype))
}
