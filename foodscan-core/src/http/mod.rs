//! HTTP access for the product API and image downloads.
//!
//! All outgoing requests go through the `HttpClient` trait so the pipeline
//! can be driven by `MockClient` in tests.

mod client;

pub use client::{ApiClient, ApiClientBuilder, HttpClient, MockClient, MockResponse};
