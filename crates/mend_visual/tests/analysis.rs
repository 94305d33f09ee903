//! Visual analysis over encoded screenshots and realistic console output.

use mend_model::{AggregateSeverity, FindingType, Severity};
use mend_visual::{CapturedArtifacts, Raster, Screenshot, VisualDetector};

#[test]
fn test_full_hd_near_white_screenshot_stops() {
    let mut raster = Raster::filled(1920, 1080, [255, 255, 255, 255]);
    for i in 0..500u32 {
        raster.set_pixel(100 + i % 50, 100 + i / 50, [200, 30, 30, 255]);
    }
    let png = raster.encode_png().unwrap();

    let artifacts = CapturedArtifacts::new()
        .with_screenshot(Screenshot::Png(png))
        .with_page_status(200);
    let analysis = VisualDetector::new().unwrap().analyze_results(&artifacts);

    let blank = analysis.blank_page.unwrap();
    assert_eq!(blank.content_pixels, 500);
    assert!(blank.blank_fraction >= 0.99);
    assert!(blank.is_blank);
    assert_eq!(analysis.severity, AggregateSeverity::Critical);
    assert!(analysis.should_stop);
    assert_eq!(analysis.errors.len(), 1);
    assert_eq!(analysis.errors[0].finding_type, FindingType::BlankPage);
}

#[test]
fn test_broken_build_capture() {
    let artifacts = CapturedArtifacts::new()
        .with_page_status(200)
        .with_console(
            "[plugin:vite:css] [postcss] It looks like you're trying to use `tailwindcss` directly as a PostCSS plugin.",
            Some("src/index.css:1:1"),
        )
        .with_console("Failed to load resource: the server responded with a status of 404 (Not Found)", None)
        .with_console("Download the React DevTools for a better development experience", None);

    let analysis = VisualDetector::new().unwrap().analyze_results(&artifacts);

    let severities: Vec<Severity> = analysis.errors.iter().map(|f| f.severity).collect();
    assert_eq!(severities, vec![Severity::Critical, Severity::Major, Severity::Minor]);
    assert_eq!(analysis.errors[0].location.as_deref(), Some("src/index.css:1:1"));
    assert!(analysis.should_stop);

    let report = analysis.report();
    assert!(report.contains("CRITICAL"));
    assert!(report.contains("3 finding(s)"));
}

#[test]
fn test_healthy_vite_page_does_not_stop() {
    let mut page = Raster::filled(400, 300, [255, 255, 255, 255]);
    for y in 0..100 {
        for x in 0..200 {
            page.set_pixel(x, y, [30, 30, 30, 255]);
        }
    }
    let artifacts = CapturedArtifacts::new()
        .with_page_status(200)
        .with_screenshot(Screenshot::Raster(page))
        .with_console("[vite] connecting...", Some("client:495"))
        .with_console("[vite] connected.", Some("client:614"));

    let analysis = VisualDetector::new().unwrap().analyze_results(&artifacts);

    assert_eq!(analysis.blank_page.as_ref().map(|b| b.is_blank), Some(false));
    assert!(analysis.errors.iter().all(|f| f.severity == Severity::Minor));
    assert_eq!(analysis.severity, AggregateSeverity::Minor);
    assert!(!analysis.should_stop);
}
