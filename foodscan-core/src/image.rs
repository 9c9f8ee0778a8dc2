//! Product image download and decoding.
//!
//! Every failure here resolves to the placeholder. Nothing is cached; each
//! scan downloads and decodes again.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageFormat, ImageReader, Rgba, RgbaImage};

use crate::http::HttpClient;

/// Edge length of the generated placeholder bitmap.
pub const PLACEHOLDER_SIZE: u32 = 64;

const PLACEHOLDER_FILL: Rgba<u8> = Rgba([0xC8, 0xC8, 0xC8, 0xFF]);

/// A decoded product image.
#[derive(Debug, Clone)]
pub struct ProductImage {
    pub bitmap: DynamicImage,
    /// Format detected from the downloaded bytes, when recognizable.
    pub format: Option<ImageFormat>,
    pub source_url: String,
}

impl ProductImage {
    pub fn width(&self) -> u32 {
        self.bitmap.width()
    }

    pub fn height(&self) -> u32 {
        self.bitmap.height()
    }

    /// Write the bitmap to disk; the format follows the file extension.
    pub fn save(&self, path: &Path) -> Result<(), image::ImageError> {
        self.bitmap.save(path)
    }
}

/// What the view shows in the image slot.
#[derive(Debug, Clone)]
pub enum ImageAsset {
    Loaded(ProductImage),
    Placeholder,
}

impl ImageAsset {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, ImageAsset::Placeholder)
    }

    /// Bitmap to render: the product image, or the placeholder bitmap.
    pub fn bitmap(&self) -> DynamicImage {
        match self {
            ImageAsset::Loaded(image) => image.bitmap.clone(),
            ImageAsset::Placeholder => placeholder_bitmap(),
        }
    }
}

/// Neutral grey square shown when no product image is available.
pub fn placeholder_bitmap() -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        PLACEHOLDER_SIZE,
        PLACEHOLDER_SIZE,
        PLACEHOLDER_FILL,
    ))
}

/// Decode raw bytes, guessing the format from their content.
pub fn decode_image(data: &[u8]) -> Result<(DynamicImage, Option<ImageFormat>), String> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| format!("Failed to read image: {}", e))?;

    let format = reader.format();
    let bitmap = reader
        .decode()
        .map_err(|e| format!("Failed to decode image: {}", e))?;

    Ok((bitmap, format))
}

/// Fetch and decode the image at `url`.
pub async fn fetch_image<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
) -> Result<ProductImage, String> {
    let data = client
        .fetch_bytes(url)
        .await
        .map_err(|e| format!("Failed to fetch image: {}", e))?;

    let (bitmap, format) = decode_image(&data)?;

    Ok(ProductImage {
        bitmap,
        format,
        source_url: url.to_string(),
    })
}

/// Resolve the image slot for a product.
///
/// An absent or blank URL gives the placeholder without touching the
/// network. Fetch and decode failures also give the placeholder.
pub async fn load_image<C: HttpClient + ?Sized>(client: &C, url: Option<&str>) -> ImageAsset {
    let url = match url.map(str::trim).filter(|u| !u.is_empty()) {
        Some(u) => u,
        None => return ImageAsset::Placeholder,
    };

    match fetch_image(client, url).await {
        Ok(image) => {
            tracing::debug!(
                url,
                width = image.width(),
                height = image.height(),
                "image loaded"
            );
            ImageAsset::Loaded(image)
        }
        Err(e) => {
            tracing::warn!(url, error = %e, "image unavailable, using placeholder");
            ImageAsset::Placeholder
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockClient;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([10, 20, 30, 255]),
        ));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn decodes_png() {
        let (bitmap, format) = decode_image(&png_bytes(3, 2)).unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (3, 2));
        assert_eq!(format, Some(ImageFormat::Png));
    }

    #[test]
    fn truncated_jpeg_fails_to_decode() {
        assert!(decode_image(&[0xFF, 0xD8, 0xFF, 0xE0]).is_err());
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(decode_image(b"not an image").is_err());
    }

    #[test]
    fn placeholder_has_fixed_size() {
        let bitmap = ImageAsset::Placeholder.bitmap();
        assert_eq!(bitmap.width(), PLACEHOLDER_SIZE);
        assert_eq!(bitmap.height(), PLACEHOLDER_SIZE);
    }

    #[tokio::test]
    async fn absent_or_blank_url_skips_network() {
        let client = MockClient::new();
        assert!(load_image(&client, None).await.is_placeholder());
        assert!(load_image(&client, Some("")).await.is_placeholder());
        assert!(load_image(&client, Some("   ")).await.is_placeholder());
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn fetch_error_gives_placeholder() {
        let url = "https://images.test/broken.jpg";
        let client = MockClient::new().with_error(url, "connection reset");
        assert!(load_image(&client, Some(url)).await.is_placeholder());
        assert_eq!(client.requests(), vec![url.to_string()]);
    }

    #[tokio::test]
    async fn undecodable_body_gives_placeholder() {
        let url = "https://images.test/page.html";
        let client = MockClient::new().with_bytes(url, b"<html></html>".to_vec());
        assert!(load_image(&client, Some(url)).await.is_placeholder());
    }

    #[tokio::test]
    async fn decodable_body_is_loaded() {
        let url = "https://images.test/front.png";
        let client = MockClient::new().with_bytes(url, png_bytes(8, 4));
        match load_image(&client, Some(url)).await {
            ImageAsset::Loaded(image) => {
                assert_eq!((image.width(), image.height()), (8, 4));
                assert_eq!(image.source_url, url);
            }
            ImageAsset::Placeholder => panic!("expected a decoded image"),
        }
    }
}
