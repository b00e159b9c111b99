//! Color gradient tables for heatmap rendering.
//!
//! Three themes map a normalized position in `[0, 1]` to a color:
//! - **dark**: for dark basemaps (e.g. CartoDB dark matter), an inferno ramp
//! - **light**: for light basemaps (e.g. terrain tiles), a cool-warm ramp
//! - **original**: the classic black/blue/lime/yellow/orange/red heatmap
//!
//! The tables are immutable statics; [`Gradient::sample`] interpolates
//! linearly between neighbouring stops.

use serde::{Deserialize, Serialize};

/// An opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Build a color from a `0xRRGGBB` literal.
    pub const fn hex(value: u32) -> Self {
        Rgb(
            ((value >> 16) & 0xff) as u8,
            ((value >> 8) & 0xff) as u8,
            (value & 0xff) as u8,
        )
    }

    /// `#rrggbb` notation.
    pub fn to_hex_string(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    fn lerp(a: Rgb, b: Rgb, t: f64) -> Rgb {
        let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
        Rgb(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
    }
}

/// Ordered `(position, color)` stops, positions ascending in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gradient {
    stops: &'static [(f64, Rgb)],
}

const DARK: &[(f64, Rgb)] = &[
    (0.0, Rgb::hex(0x000004)),
    (0.1, Rgb::hex(0x160b39)),
    (0.2, Rgb::hex(0x420a68)),
    (0.3, Rgb::hex(0x6a176e)),
    (0.4, Rgb::hex(0x932667)),
    (0.5, Rgb::hex(0xbc3754)),
    (0.6, Rgb::hex(0xdd513a)),
    (0.7, Rgb::hex(0xf37819)),
    (0.8, Rgb::hex(0xfca50a)),
    (0.9, Rgb::hex(0xf6d746)),
    (1.0, Rgb::hex(0xfcffa4)),
];

const LIGHT: &[(f64, Rgb)] = &[
    (0.0, Rgb::hex(0x3b4cc0)),
    (0.1, Rgb::hex(0x5977e3)),
    (0.2, Rgb::hex(0x7b9ff9)),
    (0.3, Rgb::hex(0x9ebeff)),
    (0.4, Rgb::hex(0xc0d4f5)),
    (0.5, Rgb::hex(0xdddcdc)),
    (0.6, Rgb::hex(0xf2cbb7)),
    (0.7, Rgb::hex(0xf7ac8e)),
    (0.8, Rgb::hex(0xee8468)),
    (0.9, Rgb::hex(0xd65244)),
    (1.0, Rgb::hex(0xb40426)),
];

// black, blue, lime, yellow, orange, red
const ORIGINAL: &[(f64, Rgb)] = &[
    (0.0, Rgb::hex(0x000000)),
    (0.6, Rgb::hex(0x0000ff)),
    (0.7, Rgb::hex(0x00ff00)),
    (0.8, Rgb::hex(0xffff00)),
    (0.9, Rgb::hex(0xffa500)),
    (1.0, Rgb::hex(0xff0000)),
];

// ColorBrewer sequential "Reds"
const REDS: &[(f64, Rgb)] = &[
    (0.0, Rgb::hex(0xfff5f0)),
    (0.125, Rgb::hex(0xfee0d2)),
    (0.25, Rgb::hex(0xfcbba1)),
    (0.375, Rgb::hex(0xfc9272)),
    (0.5, Rgb::hex(0xfb6a4a)),
    (0.625, Rgb::hex(0xef3b2c)),
    (0.75, Rgb::hex(0xcb181d)),
    (0.875, Rgb::hex(0xa50f15)),
    (1.0, Rgb::hex(0x67000d)),
];

impl Gradient {
    /// Sequential white-to-dark-red ramp used for density overlays.
    pub const REDS: Gradient = Gradient { stops: REDS };

    /// The raw stops.
    pub fn stops(&self) -> &'static [(f64, Rgb)] {
        self.stops
    }

    /// Color at position `t`, clamped to `[0, 1]`.
    pub fn sample(&self, t: f64) -> Rgb {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let stops = self.stops;

        if t <= stops[0].0 {
            return stops[0].1;
        }
        for w in stops.windows(2) {
            let (p0, c0) = w[0];
            let (p1, c1) = w[1];
            if t <= p1 {
                let span = p1 - p0;
                let local = if span > 0.0 { (t - p0) / span } else { 1.0 };
                return Rgb::lerp(c0, c1, local);
            }
        }
        stops[stops.len() - 1].1
    }
}

/// Heatmap color theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatmapTheme {
    Dark,
    Light,
    Original,
}

impl HeatmapTheme {
    pub const ALL: [HeatmapTheme; 3] = [
        HeatmapTheme::Dark,
        HeatmapTheme::Light,
        HeatmapTheme::Original,
    ];

    pub fn gradient(&self) -> Gradient {
        let stops = match self {
            HeatmapTheme::Dark => DARK,
            HeatmapTheme::Light => LIGHT,
            HeatmapTheme::Original => ORIGINAL,
        };
        Gradient { stops }
    }

    pub fn name(&self) -> &'static str {
        match self {
            HeatmapTheme::Dark => "dark",
            HeatmapTheme::Light => "light",
            HeatmapTheme::Original => "original",
        }
    }
}

impl std::str::FromStr for HeatmapTheme {
    type Err = crate::InsightsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dark" => Ok(HeatmapTheme::Dark),
            "light" => Ok(HeatmapTheme::Light),
            "original" => Ok(HeatmapTheme::Original),
            other => Err(crate::InsightsError::InvalidParameter(format!(
                "unknown heatmap theme '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stops_ascending_and_bounded() {
        let mut gradients: Vec<Gradient> = HeatmapTheme::ALL.iter().map(|t| t.gradient()).collect();
        gradients.push(Gradient::REDS);

        for g in gradients {
            let stops = g.stops();
            assert_eq!(stops.first().unwrap().0, 0.0);
            assert_eq!(stops.last().unwrap().0, 1.0);
            assert!(stops.windows(2).all(|w| w[0].0 < w[1].0));
        }
    }

    #[test]
    fn test_sample_hits_stops_exactly() {
        let dark = HeatmapTheme::Dark.gradient();
        assert_eq!(dark.sample(0.0), Rgb::hex(0x000004));
        assert_eq!(dark.sample(0.5), Rgb::hex(0xbc3754));
        assert_eq!(dark.sample(1.0), Rgb::hex(0xfcffa4));

        let original = HeatmapTheme::Original.gradient();
        assert_eq!(original.sample(0.7), Rgb(0, 255, 0));
    }

    #[test]
    fn test_sample_interpolates_and_clamps() {
        let original = HeatmapTheme::Original.gradient();
        // halfway between black (0.0) and blue (0.6)
        assert_eq!(original.sample(0.3), Rgb(0, 0, 128));
        assert_eq!(original.sample(-2.0), Rgb(0, 0, 0));
        assert_eq!(original.sample(7.0), Rgb(255, 0, 0));
        assert_eq!(original.sample(f64::NAN), Rgb(0, 0, 0));
    }

    #[test]
    fn test_theme_from_str() {
        assert_eq!("Dark".parse::<HeatmapTheme>().unwrap(), HeatmapTheme::Dark);
        assert_eq!("light".parse::<HeatmapTheme>().unwrap(), HeatmapTheme::Light);
        assert!("sepia".parse::<HeatmapTheme>().is_err());
    }

    #[test]
    fn test_hex_string() {
        assert_eq!(Rgb::hex(0x3b4cc0).to_hex_string(), "#3b4cc0");
    }
}
