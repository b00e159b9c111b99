//! Background raster under chart overlays.

use super::plot_err;
use crate::error::{InsightsError, Result};
use crate::{Extent, XyPoint};
use image::RgbaImage;
use plotters::coord::Shift;
use plotters::element::BitMapElement;
use plotters::prelude::*;
use std::path::Path;

/// A raster image placed at a Web Mercator extent.
#[derive(Debug, Clone, PartialEq)]
pub struct Basemap {
    image: RgbaImage,
    extent: Extent,
}

impl Basemap {
    pub fn new(image: RgbaImage, extent: Extent) -> Self {
        Self { image, extent }
    }

    /// Load a PNG basemap covering `extent`.
    pub fn open<P: AsRef<Path>>(path: P, extent: Extent) -> Result<Self> {
        let image = image::open(path)?.to_rgba8();
        Ok(Self::new(image, extent))
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Bilinear sample at a map coordinate. `None` outside the image.
    pub fn sample(&self, x: f64, y: f64) -> Option<[u8; 4]> {
        let (w, h) = self.image.dimensions();
        if w == 0 || h == 0 || self.extent.width() <= 0.0 || self.extent.height() <= 0.0 {
            return None;
        }
        if !self.extent.contains(&XyPoint::new(x, y)) {
            return None;
        }

        // Pixel centers sit at +0.5; image rows grow downwards
        let u = (x - self.extent.min_x) / self.extent.width() * w as f64 - 0.5;
        let v = (self.extent.max_y - y) / self.extent.height() * h as f64 - 0.5;
        let u = u.clamp(0.0, (w - 1) as f64);
        let v = v.clamp(0.0, (h - 1) as f64);

        let (x0, y0) = (u.floor() as u32, v.floor() as u32);
        let (x1, y1) = ((x0 + 1).min(w - 1), (y0 + 1).min(h - 1));
        let (fx, fy) = (u - x0 as f64, v - y0 as f64);

        let p00 = self.image.get_pixel(x0, y0).0;
        let p10 = self.image.get_pixel(x1, y0).0;
        let p01 = self.image.get_pixel(x0, y1).0;
        let p11 = self.image.get_pixel(x1, y1).0;

        let mut out = [0u8; 4];
        for c in 0..4 {
            let top = p00[c] as f64 * (1.0 - fx) + p10[c] as f64 * fx;
            let bottom = p01[c] as f64 * (1.0 - fx) + p11[c] as f64 * fx;
            out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
        }
        Some(out)
    }

    /// Resample the part of the basemap visible in `view` into a `width` x
    /// `height` RGB buffer, composited over white.
    pub fn raster(&self, width: u32, height: u32, view: &Extent) -> Vec<u8> {
        let mut buf = Vec::with_capacity(width as usize * height as usize * 3);
        for py in 0..height {
            let y = view.max_y - (py as f64 + 0.5) / height as f64 * view.height();
            for px in 0..width {
                let x = view.min_x + (px as f64 + 0.5) / width as f64 * view.width();
                let [r, g, b, a] = self.sample(x, y).unwrap_or([255, 255, 255, 0]);
                let alpha = a as f64 / 255.0;
                let over_white =
                    |c: u8| (c as f64 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
                buf.extend_from_slice(&[over_white(r), over_white(g), over_white(b)]);
            }
        }
        buf
    }

    /// Paint the part of the basemap visible in `view` over the whole area
    /// as a single bitmap.
    pub fn draw<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        view: &Extent,
    ) -> Result<()> {
        let (w, h) = area.dim_in_pixel();
        if w == 0 || h == 0 {
            return Ok(());
        }

        let element: BitMapElement<(i32, i32)> =
            BitMapElement::with_owned_buffer((0, 0), (w, h), self.raster(w, h, view))
                .ok_or_else(|| InsightsError::Plot("basemap buffer size mismatch".into()))?;
        area.draw(&element).map_err(plot_err)
    }
}
