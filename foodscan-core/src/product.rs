//! Product lookup against the Open Food Facts API.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use url::Url;

use crate::error::{FetchError, ParseError, ProductError};
use crate::http::HttpClient;

/// The three fields the pipeline reads from a product document.
/// `None` means the field was missing or null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub brand: Option<String>,
    pub ingredients_text: Option<String>,
    pub image_url: Option<String>,
}

impl ProductRecord {
    /// Image URL if there is one worth fetching.
    pub fn image_url(&self) -> Option<&str> {
        self.image_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }
}

/// Build the product URL for a code: `{base}{code}.json`.
///
/// The code is appended as a single percent-encoded path segment, so a code
/// containing `/`, `?` or `#` cannot escape into another part of the URL.
pub fn product_url(base: &str, code: &str) -> Result<Url, ProductError> {
    if code.is_empty() {
        return Err(ProductError::EmptyCode);
    }

    let mut url = Url::parse(base).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| FetchError::InvalidUrl(format!("{} cannot be a base URL", base)))?
        .pop_if_empty()
        .push(&format!("{}.json", code));

    Ok(url)
}

/// Parse an API response body into a `ProductRecord`.
pub fn parse_product(body: &str) -> Result<ProductRecord, ParseError> {
    let root: JsonValue =
        serde_json::from_str(body).map_err(|e| ParseError::InvalidJson(e.to_string()))?;

    let root = root
        .as_object()
        .ok_or_else(|| ParseError::InvalidJson("top-level value is not an object".to_string()))?;

    let product = match root.get("product").and_then(JsonValue::as_object) {
        Some(p) => p,
        None => {
            let reason = root
                .get("status_verbose")
                .and_then(JsonValue::as_str)
                .unwrap_or("no status given");
            return Err(ParseError::MissingProduct(reason.to_string()));
        }
    };

    Ok(ProductRecord {
        brand: string_field(product.get("brands")),
        ingredients_text: string_field(product.get("ingredients_text")),
        image_url: string_field(product.get("image_url")),
    })
}

/// Strings pass through; other scalars keep their JSON text; null,
/// arrays and objects count as absent.
fn string_field(value: Option<&JsonValue>) -> Option<String> {
    match value? {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}

/// Fetch and parse one product.
pub async fn fetch_product<C: HttpClient + ?Sized>(
    client: &C,
    base: &str,
    code: &str,
) -> Result<ProductRecord, ProductError> {
    let url = product_url(base, code)?;
    let body = client.fetch_text(url.as_str()).await?;
    let record = parse_product(&body)?;

    tracing::debug!(
        code,
        has_brand = record.brand.is_some(),
        has_ingredients = record.ingredients_text.is_some(),
        has_image = record.image_url().is_some(),
        "product parsed"
    );

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_API_BASE_URL;
    use crate::http::MockClient;

    #[test]
    fn url_inserts_code_verbatim_for_barcodes() {
        for code in ["0001", "3017620422003", "737628064502", "abc-123_x.y~z"] {
            let url = product_url(DEFAULT_API_BASE_URL, code).unwrap();
            assert_eq!(
                url.as_str(),
                format!("https://world.openfoodfacts.org/api/v0/product/{}.json", code)
            );
        }
    }

    #[test]
    fn url_percent_encodes_reserved_characters() {
        let url = product_url(DEFAULT_API_BASE_URL, "12/34?x#y").unwrap();
        assert_eq!(
            url.as_str(),
            "https://world.openfoodfacts.org/api/v0/product/12%2F34%3Fx%23y.json"
        );
    }

    #[test]
    fn url_handles_base_without_trailing_slash() {
        let url = product_url("http://localhost:9000/api/v0/product", "42").unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/api/v0/product/42.json");
    }

    #[test]
    fn empty_code_is_rejected() {
        assert!(matches!(
            product_url(DEFAULT_API_BASE_URL, ""),
            Err(ProductError::EmptyCode)
        ));
    }

    #[test]
    fn parses_all_fields() {
        let record = parse_product(
            r#"{"code":"1","product":{"brands":"Ferrero","ingredients_text":"Sugar, palm oil","image_url":"https://images.test/1.jpg"},"status":1}"#,
        )
        .unwrap();
        assert_eq!(
            record,
            ProductRecord {
                brand: Some("Ferrero".to_string()),
                ingredients_text: Some("Sugar, palm oil".to_string()),
                image_url: Some("https://images.test/1.jpg".to_string()),
            }
        );
    }

    #[test]
    fn missing_and_null_fields_are_absent() {
        let record = parse_product(r#"{"product":{"brands":null}}"#).unwrap();
        assert_eq!(record, ProductRecord::default());
    }

    #[test]
    fn scalar_fields_keep_their_text() {
        let record = parse_product(r#"{"product":{"brands":42,"ingredients_text":true}}"#).unwrap();
        assert_eq!(record.brand.as_deref(), Some("42"));
        assert_eq!(record.ingredients_text.as_deref(), Some("true"));
    }

    #[test]
    fn missing_product_is_a_parse_error() {
        let err = parse_product(r#"{"status":0,"status_verbose":"product not found"}"#).unwrap_err();
        match err {
            ParseError::MissingProduct(reason) => assert_eq!(reason, "product not found"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn non_object_body_is_invalid() {
        assert!(matches!(parse_product("[]"), Err(ParseError::InvalidJson(_))));
        assert!(matches!(parse_product("<html>"), Err(ParseError::InvalidJson(_))));
    }

    #[test]
    fn empty_image_url_is_not_fetchable() {
        let record = ProductRecord {
            image_url: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(record.image_url(), None);
    }

    #[tokio::test]
    async fn fetch_product_goes_through_client() {
        let url = "https://world.openfoodfacts.org/api/v0/product/0001.json";
        let client = MockClient::new().with_text(
            url,
            r#"{"product":{"brands":"Acme","ingredients_text":"Water","image_url":""}}"#,
        );

        let record = fetch_product(&client, DEFAULT_API_BASE_URL, "0001")
            .await
            .unwrap();
        assert_eq!(record.brand.as_deref(), Some("Acme"));
        assert_eq!(client.requests(), vec![url.to_string()]);
    }

    #[tokio::test]
    async fn fetch_product_surfaces_status() {
        let client = MockClient::new().with_status(
            "https://world.openfoodfacts.org/api/v0/product/0002.json",
            500,
        );
        let err = fetch_product(&client, DEFAULT_API_BASE_URL, "0002")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProductError::Fetch(FetchError::Status { status: 500, .. })
        ));
    }
}
