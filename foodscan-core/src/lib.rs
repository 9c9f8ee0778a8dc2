pub mod config;
pub mod error;
pub mod http;
pub mod image;
pub mod pipeline;
pub mod product;
pub mod scanner;
pub mod view;

pub use config::FoodscanConfig;
pub use error::{ConfigError, FetchError, ParseError, ProductError, ScanError};
pub use http::{ApiClient, ApiClientBuilder, HttpClient, MockClient, MockResponse};
pub use crate::image::{decode_image, fetch_image, load_image, placeholder_bitmap, ImageAsset, ProductImage};
pub use pipeline::{ScanController, ScanReport, ScanState, TaskHandle, TaskRunner};
pub use product::{fetch_product, parse_product, product_url, ProductRecord};
pub use scanner::{BarcodeScanner, LineScanner, ScanOptions, ScanResult, ScriptedScanner};
pub use view::{AnimationFrame, EntranceAnimation, ProductCard, ProductView};
