//! Subscription handling: URL resolution, payload download, base64 decoding

pub mod decoder;
pub mod fetcher;

pub use decoder::{decode_base64_text, decode_payload};
pub use fetcher::{collect_subscribe_urls, FetchConfig, SubscriptionFetcher, SUBSCRIBE_URL_ENV};
