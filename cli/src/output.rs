//! JSON output and image export for finished scans.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use foodscan_core::{ImageAsset, ScanReport};
use serde_json::{json, Value};

pub fn report_json(report: &ScanReport) -> Value {
    let record = report.record.as_ref();
    let image = match &report.image {
        Some(ImageAsset::Loaded(img)) => json!({
            "placeholder": false,
            "width": img.width(),
            "height": img.height(),
            "format": img.format.map(|f| f.to_mime_type()),
            "source_url": img.source_url,
        }),
        Some(ImageAsset::Placeholder) => json!({ "placeholder": true }),
        None => Value::Null,
    };

    json!({
        "code": report.code,
        "outcome": report.outcome(),
        "brand": record.and_then(|r| r.brand.as_deref()),
        "ingredients_text": record.and_then(|r| r.ingredients_text.as_deref()),
        "image_url": record.and_then(|r| r.image_url.as_deref()),
        "image": image,
        "error": report.error,
    })
}

/// Write the report's image (or the placeholder) to `{dir}/{code}.png`.
/// Returns the written path, or `None` when the scan produced no image slot.
pub fn save_image(dir: &Path, report: &ScanReport) -> Result<Option<PathBuf>> {
    let (Some(code), Some(image)) = (&report.code, &report.image) else {
        return Ok(None);
    };

    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(format!("{}.png", sanitize_for_filesystem(code)));
    image
        .bitmap()
        .save(&path)
        .with_context(|| format!("failed to write {}", path.display()))?;

    tracing::info!(path = %path.display(), placeholder = image.is_placeholder(), "image saved");
    Ok(Some(path))
}

fn sanitize_for_filesystem(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(200) // Limit length for filesystem compatibility
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use foodscan_core::{ProductRecord, ScanState};

    fn report(image: Option<ImageAsset>) -> ScanReport {
        ScanReport {
            code: Some("0001".to_string()),
            record: Some(ProductRecord {
                brand: Some("Acme".to_string()),
                ingredients_text: Some("Water".to_string()),
                image_url: Some(String::new()),
            }),
            image,
            error: None,
            states: vec![
                ScanState::Idle,
                ScanState::Scanning,
                ScanState::Fetching,
                ScanState::Fetched,
                ScanState::Idle,
            ],
        }
    }

    #[test]
    fn json_keeps_absence_explicit() {
        let mut r = report(Some(ImageAsset::Placeholder));
        r.record.as_mut().unwrap().ingredients_text = None;

        let value = report_json(&r);
        assert_eq!(value["code"], "0001");
        assert_eq!(value["outcome"], "fetched");
        assert_eq!(value["brand"], "Acme");
        assert!(value["ingredients_text"].is_null());
        assert_eq!(value["image"]["placeholder"], true);
    }

    #[test]
    fn saves_placeholder_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_image(dir.path(), &report(Some(ImageAsset::Placeholder)))
            .unwrap()
            .unwrap();
        assert_eq!(path, dir.path().join("0001.png"));
        assert!(path.exists());
    }

    #[test]
    fn nothing_to_save_without_image_slot() {
        let dir = tempfile::tempdir().unwrap();
        assert!(save_image(dir.path(), &report(None)).unwrap().is_none());
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_for_filesystem("12/34 ab"), "12_34_ab");
    }
}
