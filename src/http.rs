use crate::config::{HTTP_CONNECT_TIMEOUT, HTTP_TIMEOUT};
use reqwest::Client;
use tracing::warn;

const USER_AGENT: &str = concat!("trucksbus-listing/", env!("CARGO_PKG_VERSION"));

/// Client shared by the catalog and ads calls.
pub fn build_client() -> Client {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(*HTTP_TIMEOUT)
        .connect_timeout(*HTTP_CONNECT_TIMEOUT)
        .gzip(true)
        .brotli(true)
        .build()
        .unwrap_or_else(|err| {
            warn!(target = "trucksbus.http", error = %err, "falling back to default client");
            Client::new()
        })
}
