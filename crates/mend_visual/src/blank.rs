//! Blank-page classification of screenshots.

use serde::{Deserialize, Serialize};

use crate::raster::Raster;

/// Thresholds for the blank-page check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlankPageConfig {
    /// Blank fraction above which the page counts as blank
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Minimum number of non-blank pixels a rendered page has
    #[serde(default = "default_min_content_pixels")]
    pub min_content_pixels: u64,
    /// Distance from pure white / full transparency still treated as blank
    #[serde(default = "default_tolerance")]
    pub tolerance: u8,
}

fn default_threshold() -> f64 {
    0.95
}

fn default_min_content_pixels() -> u64 {
    1000
}

fn default_tolerance() -> u8 {
    10
}

impl Default for BlankPageConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            min_content_pixels: default_min_content_pixels(),
            tolerance: default_tolerance(),
        }
    }
}

impl BlankPageConfig {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_min_content_pixels(mut self, pixels: u64) -> Self {
        self.min_content_pixels = pixels;
        self
    }

    pub fn with_tolerance(mut self, tolerance: u8) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Near-white or near-transparent.
    pub fn is_blank_pixel(&self, pixel: &[u8]) -> bool {
        let floor = 255 - self.tolerance;
        pixel[3] <= self.tolerance || (pixel[0] >= floor && pixel[1] >= floor && pixel[2] >= floor)
    }
}

/// Pixel statistics for one screenshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlankPageAnalysis {
    pub width: u32,
    pub height: u32,
    pub total_pixels: u64,
    pub blank_pixels: u64,
    pub content_pixels: u64,
    pub blank_fraction: f64,
    pub is_blank: bool,
}

/// Classify a raster. Either condition alone marks it blank: the blank
/// fraction exceeds the threshold, or too few pixels carry content.
pub fn analyze_raster(raster: &Raster, config: &BlankPageConfig) -> BlankPageAnalysis {
    let total_pixels = raster.pixel_count();
    let blank_pixels = raster
        .pixels()
        .filter(|p| config.is_blank_pixel(p))
        .count() as u64;
    let content_pixels = total_pixels - blank_pixels;

    let blank_fraction = if total_pixels == 0 {
        1.0
    } else {
        blank_pixels as f64 / total_pixels as f64
    };

    BlankPageAnalysis {
        width: raster.width,
        height: raster.height,
        total_pixels,
        blank_pixels,
        content_pixels,
        blank_fraction,
        is_blank: blank_fraction > config.threshold || content_pixels < config.min_content_pixels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: [u8; 4] = [255, 255, 255, 255];
    const INK: [u8; 4] = [20, 20, 20, 255];

    /// A white raster with `content` dark pixels laid out row by row.
    fn raster_with_content(width: u32, height: u32, content: u64) -> Raster {
        let mut raster = Raster::filled(width, height, WHITE);
        for i in 0..content {
            raster.set_pixel((i % width as u64) as u32, (i / width as u64) as u32, INK);
        }
        raster
    }

    #[test]
    fn test_blank_pixel_classification() {
        let config = BlankPageConfig::default();
        assert!(config.is_blank_pixel(&[250, 248, 255, 255]));
        assert!(config.is_blank_pixel(&[0, 0, 0, 5]));
        assert!(!config.is_blank_pixel(&[240, 255, 255, 255]));
        assert!(!config.is_blank_pixel(&[0, 0, 0, 255]));
    }

    #[test]
    fn test_near_white_page_of_any_size_is_blank() {
        let config = BlankPageConfig::default();
        for (w, h) in [(40, 25), (100, 100), (320, 200)] {
            let raster = Raster::filled(w, h, [252, 252, 252, 255]);
            let analysis = analyze_raster(&raster, &config);
            assert!(analysis.is_blank, "{}x{}", w, h);
            assert_eq!(analysis.content_pixels, 0);
        }
    }

    #[test]
    fn test_enough_content_below_threshold_is_not_blank() {
        let config = BlankPageConfig::default();
        // 100x100 with 1000 content pixels: 90% blank.
        let analysis = analyze_raster(&raster_with_content(100, 100, 1000), &config);
        assert!(!analysis.is_blank);
        assert!((analysis.blank_fraction - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_small_rendered_area_is_blank() {
        // 20x20 mostly dark, but fewer content pixels than the floor.
        let raster = Raster::filled(20, 20, INK);
        let analysis = analyze_raster(&raster, &BlankPageConfig::default());
        assert_eq!(analysis.content_pixels, 400);
        assert!(analysis.is_blank);
    }

    #[test]
    fn test_full_hd_page_with_sparse_content() {
        let analysis =
            analyze_raster(&raster_with_content(1920, 1080, 500), &BlankPageConfig::default());
        assert_eq!(analysis.total_pixels, 1920 * 1080);
        assert_eq!(analysis.content_pixels, 500);
        assert!(analysis.blank_fraction > 0.99);
        assert!(analysis.is_blank);
    }

    #[test]
    fn test_empty_raster_is_blank() {
        let analysis = analyze_raster(&Raster::filled(0, 0, WHITE), &BlankPageConfig::default());
        assert!(analysis.is_blank);
        assert_eq!(analysis.blank_fraction, 1.0);
    }
}
