//! Page fetching.
//!
//! Defines the [`Fetcher`] trait consumed by the resolver, an HTTP
//! implementation with retries, and a caching decorator.

pub mod cache;
pub mod http;

pub use cache::{CachingFetcher, PageCache};
pub use http::HttpFetcher;

/// Async trait implemented by every page source.
///
/// `None` means no usable content: a non-HTML response, a non-retryable
/// status, or a transport failure after retries. Implementations never
/// surface errors to the caller.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Option<Vec<u8>>;
}
