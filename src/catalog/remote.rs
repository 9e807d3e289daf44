use crate::catalog::{Catalog, CatalogError};
use crate::config::API_BASE_URL;
use crate::http::build_client;
use crate::models::{City, District, TaxonomyNode};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;
use urlencoding::encode;

#[derive(Debug, Clone)]
pub struct CatalogClient {
    base_url: String,
    http: Client,
}

impl CatalogClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: build_client(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(API_BASE_URL.as_str())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, CatalogError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(target = "trucksbus.catalog", %url, "catalog_get");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| CatalogError::Request(err.to_string()))?;

        if !response.status().is_success() {
            return Err(CatalogError::Status {
                path: path.to_string(),
                status: response.status().as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|err| CatalogError::Decode(err.to_string()))
    }
}

/// Builds `/categories/{c}[/brands/{b}[/models/{m}[/variants/{v}]]]` with
/// every slug percent-encoded.
fn taxonomy_path(slugs: &[&str]) -> String {
    const LEVELS: [&str; 4] = ["categories", "brands", "models", "variants"];
    let mut path = String::new();
    for (level, slug) in LEVELS.iter().zip(slugs) {
        path.push('/');
        path.push_str(level);
        path.push('/');
        path.push_str(&encode(slug));
    }
    path
}

#[async_trait::async_trait]
impl Catalog for CatalogClient {
    async fn list_brands(&self, category: &str) -> Result<Vec<TaxonomyNode>, CatalogError> {
        self.get_json(&format!("{}/brands", taxonomy_path(&[category])))
            .await
    }

    async fn list_models(
        &self,
        category: &str,
        brand: &str,
    ) -> Result<Vec<TaxonomyNode>, CatalogError> {
        self.get_json(&format!("{}/models", taxonomy_path(&[category, brand])))
            .await
    }

    async fn list_variants(
        &self,
        category: &str,
        brand: &str,
        model: &str,
    ) -> Result<Vec<TaxonomyNode>, CatalogError> {
        self.get_json(&format!(
            "{}/variants",
            taxonomy_path(&[category, brand, model])
        ))
        .await
    }

    async fn get_category(&self, category: &str) -> Result<TaxonomyNode, CatalogError> {
        self.get_json(&taxonomy_path(&[category])).await
    }

    async fn get_brand(&self, category: &str, brand: &str) -> Result<TaxonomyNode, CatalogError> {
        self.get_json(&taxonomy_path(&[category, brand])).await
    }

    async fn get_model(
        &self,
        category: &str,
        brand: &str,
        model: &str,
    ) -> Result<TaxonomyNode, CatalogError> {
        self.get_json(&taxonomy_path(&[category, brand, model]))
            .await
    }

    async fn get_variant(
        &self,
        category: &str,
        brand: &str,
        model: &str,
        variant: &str,
    ) -> Result<TaxonomyNode, CatalogError> {
        self.get_json(&taxonomy_path(&[category, brand, model, variant]))
            .await
    }

    async fn list_cities(&self) -> Result<Vec<City>, CatalogError> {
        self.get_json("/cities").await
    }

    async fn list_districts(&self, city_id: &str) -> Result<Vec<District>, CatalogError> {
        self.get_json(&format!("/cities/{}/districts", encode(city_id)))
            .await
    }
}
