//! The bar attribute function and its read-back.

use anyhow::{Context as _, Result, anyhow};
use dom::NodeKey;
use html::DOM;
use serde::{Deserialize, Serialize};

use crate::number::format_number;
use crate::selection::{Batch, BoundSelection};

/// Fill written on every bar. The trailing space is part of the value.
pub const FILL: &str = "steelblue ";

const BAR_WIDTH: f64 = 15.0;
const BAR_STEP: f64 = 20.0;
const HEIGHT_PER_UNIT: f64 = 10.0;
const TOKEN_FACTOR: f64 = 64.0;

/// Attributes of one bar, a pure function of `(d, i, surface height)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectRecord {
    pub width: f64,
    pub height: f64,
    pub x: f64,
    pub y: f64,
    pub tokenid: f64,
    pub fill: String,
}

impl RectRecord {
    pub fn for_datum(value: f64, index: usize, surface_height: f64) -> Self {
        let position = index as f64;
        Self {
            width: BAR_WIDTH,
            height: HEIGHT_PER_UNIT * value,
            x: position * BAR_STEP,
            y: surface_height / 2.0 - (HEIGHT_PER_UNIT / 2.0) * value,
            tokenid: value * position * TOKEN_FACTOR,
            fill: FILL.to_owned(),
        }
    }

    /// `(name, value)` pairs in the order they are written to the element.
    pub fn attributes(&self) -> [(&'static str, String); 6] {
        [
            ("width", format_number(self.width)),
            ("height", format_number(self.height)),
            ("x", format_number(self.x)),
            ("y", format_number(self.y)),
            ("tokenid", format_number(self.tokenid)),
            ("fill", self.fill.clone()),
        ]
    }

    /// Read a rendered bar back from the document.
    ///
    /// # Errors
    /// Returns an error if the element is gone, an attribute is missing, or
    /// a numeric attribute does not parse.
    pub fn from_element(document: &DOM, key: NodeKey) -> Result<Self> {
        let read = |name: &str| {
            document
                .attr(key, name)
                .ok_or_else(|| anyhow!("Element {key:?} has no '{name}' attribute"))
        };
        let number = |name: &str| -> Result<f64> {
            let raw = read(name)?;
            raw.parse::<f64>()
                .with_context(|| format!("Attribute '{name}' of {key:?} is not a number: '{raw}'"))
        };
        Ok(Self {
            width: number("width")?,
            height: number("height")?,
            x: number("x")?,
            y: number("y")?,
            tokenid: number("tokenid")?,
            fill: read("fill")?.to_owned(),
        })
    }
}

/// Write every bar attribute onto `bars`, each computed from the bound datum
/// and its index.
pub fn apply_bar_attributes(
    bars: &BoundSelection<f64>,
    surface_height: f64,
    batch: &mut Batch<'_>,
) {
    let record = |value: &f64, index: usize| RectRecord::for_datum(*value, index, surface_height);
    bars.attr_const("width", batch, &format_number(BAR_WIDTH))
        .attr("height", batch, |value, index| format_number(record(value, index).height))
        .attr("x", batch, |value, index| format_number(record(value, index).x))
        .attr("y", batch, |value, index| format_number(record(value, index).y))
        .attr("tokenid", batch, |value, index| format_number(record(value, index).tokenid))
        .attr_const("fill", batch, FILL);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_bar_example() {
        let first = RectRecord::for_datum(2.0, 0, 100.0);
        let second = RectRecord::for_datum(5.0, 1, 100.0);
        let fill = || "steelblue ".to_owned();
        assert_eq!(
            first,
            RectRecord { width: 15.0, height: 20.0, x: 0.0, y: 40.0, tokenid: 0.0, fill: fill() }
        );
        assert_eq!(
            second,
            RectRecord { width: 15.0, height: 50.0, x: 20.0, y: 25.0, tokenid: 320.0, fill: fill() }
        );
    }

    #[test]
    fn attributes_are_stringified_like_a_browser() {
        let record = RectRecord::for_datum(2.5, 3, 101.0);
        let attrs = record.attributes();
        assert_eq!(attrs[0], ("width", "15".to_owned()));
        assert_eq!(attrs[1], ("height", "25".to_owned()));
        assert_eq!(attrs[2], ("x", "60".to_owned()));
        assert_eq!(attrs[3], ("y", "38".to_owned()));
        assert_eq!(attrs[4], ("tokenid", "480".to_owned()));
        assert_eq!(attrs[5], ("fill", "steelblue ".to_owned()));
    }

    #[test]
    fn negative_values_flip_below_centre() {
        let record = RectRecord::for_datum(-4.0, 2, 50.0);
        assert_eq!(record.height, -40.0);
        assert_eq!(record.y, 45.0);
        assert_eq!(record.tokenid, -512.0);
    }
}
