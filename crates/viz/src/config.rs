//! Runtime configuration for a bar page.
//!
//! The surface dimensions used to be ambient globals of the hosting page; here
//! they are explicit values handed to [`crate::Page`]. Configuration can be
//! loaded from environment variables or constructed programmatically.

use std::env;

/// Default surface width in user units.
pub const DEFAULT_WIDTH: f64 = 600.0;
/// Default surface height in user units.
pub const DEFAULT_HEIGHT: f64 = 400.0;
/// Selector of the drawing surface.
pub const DEFAULT_SURFACE: &str = "svg#viz";
/// Tag of the elements bound to data.
pub const DEFAULT_ELEMENT: &str = "rect";

#[derive(Clone, Debug, PartialEq)]
pub struct VizConfig {
    /// Surface width. Carried for the host page, the bar layout ignores it
    pub width: f64,
    /// Surface height, used to centre bars vertically
    pub height: f64,
    /// Selector locating the drawing surface
    pub surface: String,
    /// Tag of the joined elements
    pub element: String,
}

impl VizConfig {
    /// Construct a configuration for a surface of the given size with the
    /// default surface selector and element tag.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            surface: DEFAULT_SURFACE.to_owned(),
            element: DEFAULT_ELEMENT.to_owned(),
        }
    }

    /// Replace the surface selector.
    #[must_use]
    pub fn with_surface(mut self, surface: &str) -> Self {
        surface.clone_into(&mut self.surface);
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `VIZ_WIDTH`: surface width (default: 600)
    /// - `VIZ_HEIGHT`: surface height (default: 400)
    /// - `VIZ_SURFACE`: surface selector (default: `svg#viz`)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`VizConfig::from_env`] with a custom variable source.
    /// Values that fail to parse as finite numbers fall back to the defaults.
    #[must_use]
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let number = |name: &str, default: f64| {
            lookup(name)
                .and_then(|val| val.trim().parse::<f64>().ok())
                .filter(|val| val.is_finite())
                .unwrap_or(default)
        };
        let surface = lookup("VIZ_SURFACE")
            .map(|val| val.trim().to_owned())
            .filter(|val| !val.is_empty())
            .unwrap_or_else(|| DEFAULT_SURFACE.to_owned());
        Self {
            width: number("VIZ_WIDTH", DEFAULT_WIDTH),
            height: number("VIZ_HEIGHT", DEFAULT_HEIGHT),
            surface,
            element: DEFAULT_ELEMENT.to_owned(),
        }
    }
}

impl Default for VizConfig {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn lookup_overrides_and_falls_back() {
        let vars = HashMap::from([
            ("VIZ_WIDTH", "800"),
            ("VIZ_HEIGHT", "not a number"),
            ("VIZ_SURFACE", " svg#chart "),
        ]);
        let config = VizConfig::from_lookup(|name| vars.get(name).map(|val| (*val).to_owned()));
        assert_eq!(config.width, 800.0);
        assert_eq!(config.height, DEFAULT_HEIGHT);
        assert_eq!(config.surface, "svg#chart");
        assert_eq!(config.element, "rect");
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let config =
            VizConfig::from_lookup(|name| (name == "VIZ_HEIGHT").then(|| "inf".to_owned()));
        assert_eq!(config, VizConfig::default());
    }
}
