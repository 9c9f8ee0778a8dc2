//! Presentation edge: what the pipeline hands to a view.
//!
//! Absent fields become the "N/A" sentinel here and nowhere earlier.

use std::time::Duration;

use serde::Serialize;

use crate::image::ImageAsset;
use crate::product::ProductRecord;

/// Shown in place of an absent field.
pub const NOT_AVAILABLE: &str = "N/A";

pub const FETCH_FAILED_BRAND: &str = "Error";
pub const FETCH_FAILED_INGREDIENTS: &str = "Could not fetch";

pub const STATUS_CANCELLED: &str = "Scan cancelled or no result.";

pub fn scanned_status(code: &str) -> String {
    format!("Scanned: {}", code)
}

/// Display-ready text for the product card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductCard {
    pub brand: String,
    pub ingredients: String,
}

impl ProductCard {
    pub fn from_record(record: &ProductRecord) -> Self {
        Self {
            brand: record
                .brand
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            ingredients: record
                .ingredients_text
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        }
    }

    pub fn fetch_failed() -> Self {
        Self {
            brand: FETCH_FAILED_BRAND.to_string(),
            ingredients: FETCH_FAILED_INGREDIENTS.to_string(),
        }
    }
}

/// Something that can display pipeline output.
///
/// Calls arrive from background tasks, so implementations must be `Send + Sync`.
pub trait ProductView: Send + Sync {
    fn set_status(&self, status: &str);

    fn show_product(&self, card: &ProductCard);

    fn show_image(&self, image: &ImageAsset);

    /// Run the card entrance animation. Called once per successful fetch.
    fn play_entrance(&self) {}
}

/// One rendered frame of the entrance animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationFrame {
    /// 0.0 (transparent) to 1.0 (opaque).
    pub alpha: f32,
    /// Horizontal offset from the resting position.
    pub translation_x: f32,
}

/// Fade-in plus slide-in from the right with a decelerating curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntranceAnimation {
    pub duration: Duration,
    pub start_translation_x: f32,
}

impl Default for EntranceAnimation {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(500),
            start_translation_x: 300.0,
        }
    }
}

impl EntranceAnimation {
    /// Decelerate interpolation: fast at the start, easing into rest.
    pub fn interpolate(t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        1.0 - (1.0 - t) * (1.0 - t)
    }

    pub fn frame_at(&self, elapsed: Duration) -> AnimationFrame {
        let t = if self.duration.is_zero() {
            1.0
        } else {
            elapsed.as_secs_f32() / self.duration.as_secs_f32()
        };
        let progress = Self::interpolate(t);

        AnimationFrame {
            alpha: progress,
            translation_x: self.start_translation_x * (1.0 - progress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_fields_render_as_sentinel() {
        let card = ProductCard::from_record(&ProductRecord {
            brand: Some("Acme".to_string()),
            ingredients_text: None,
            image_url: None,
        });
        assert_eq!(card.brand, "Acme");
        assert_eq!(card.ingredients, NOT_AVAILABLE);
    }

    #[test]
    fn fetch_failure_card_text() {
        let card = ProductCard::fetch_failed();
        assert_eq!(card.brand, "Error");
        assert_eq!(card.ingredients, "Could not fetch");
    }

    #[test]
    fn animation_starts_offscreen_and_ends_at_rest() {
        let anim = EntranceAnimation::default();

        let start = anim.frame_at(Duration::ZERO);
        assert_eq!(start.alpha, 0.0);
        assert_eq!(start.translation_x, 300.0);

        let end = anim.frame_at(Duration::from_millis(500));
        assert_eq!(end.alpha, 1.0);
        assert_eq!(end.translation_x, 0.0);

        let past = anim.frame_at(Duration::from_secs(2));
        assert_eq!(past, end);
    }

    #[test]
    fn animation_decelerates() {
        let anim = EntranceAnimation::default();
        let half = anim.frame_at(Duration::from_millis(250));
        // Ahead of linear at the midpoint.
        assert!((half.alpha - 0.75).abs() < 1e-6);
        assert!((half.translation_x - 75.0).abs() < 1e-3);
    }

    #[test]
    fn zero_duration_jumps_to_end() {
        let anim = EntranceAnimation {
            duration: Duration::ZERO,
            start_translation_x: 300.0,
        };
        assert_eq!(anim.frame_at(Duration::ZERO).alpha, 1.0);
    }
}
