//! Read-only access to the taxonomy and location API.
//!
//! Every call is a single idempotent GET. Nothing is cached and nothing is
//! retried; callers decide whether a failure matters.

pub mod remote;

use crate::models::{City, District, TaxonomyNode};
use thiserror::Error;

pub use remote::CatalogClient;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Request(String),
    #[error("catalog returned HTTP {status} for {path}")]
    Status { path: String, status: u16 },
    #[error("invalid catalog response: {0}")]
    Decode(String),
    #[error("catalog request timed out")]
    Timeout,
}

#[async_trait::async_trait]
pub trait Catalog: Send + Sync {
    async fn list_brands(&self, category: &str) -> Result<Vec<TaxonomyNode>, CatalogError>;

    async fn list_models(
        &self,
        category: &str,
        brand: &str,
    ) -> Result<Vec<TaxonomyNode>, CatalogError>;

    async fn list_variants(
        &self,
        category: &str,
        brand: &str,
        model: &str,
    ) -> Result<Vec<TaxonomyNode>, CatalogError>;

    async fn get_category(&self, category: &str) -> Result<TaxonomyNode, CatalogError>;

    async fn get_brand(&self, category: &str, brand: &str) -> Result<TaxonomyNode, CatalogError>;

    async fn get_model(
        &self,
        category: &str,
        brand: &str,
        model: &str,
    ) -> Result<TaxonomyNode, CatalogError>;

    async fn get_variant(
        &self,
        category: &str,
        brand: &str,
        model: &str,
        variant: &str,
    ) -> Result<TaxonomyNode, CatalogError>;

    async fn list_cities(&self) -> Result<Vec<City>, CatalogError>;

    async fn list_districts(&self, city_id: &str) -> Result<Vec<District>, CatalogError>;
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory catalog used by the resolver, seeder and session tests.

    use super::{Catalog, CatalogError};
    use crate::models::{City, District, TaxonomyNode};
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;

    #[derive(Default)]
    pub struct FakeCatalog {
        pub categories: Vec<TaxonomyNode>,
        pub brands: HashMap<String, Vec<TaxonomyNode>>,
        pub models: HashMap<(String, String), Vec<TaxonomyNode>>,
        pub variants: HashMap<(String, String, String), Vec<TaxonomyNode>>,
        pub cities: Vec<City>,
        pub districts: HashMap<String, Vec<District>>,
        pub failing: HashSet<String>,
        pub gates: HashMap<String, Arc<Notify>>,
        pub calls: Mutex<Vec<String>>,
    }

    pub fn node(id: &str, slug: &str) -> TaxonomyNode {
        TaxonomyNode::new(id, slug.to_uppercase(), slug)
    }

    impl FakeCatalog {
        pub fn with_category(mut self, id: &str, slug: &str) -> Self {
            self.categories.push(node(id, slug));
            self
        }

        pub fn with_brands(mut self, category: &str, brands: &[(&str, &str)]) -> Self {
            self.brands.insert(
                category.to_string(),
                brands.iter().map(|(id, slug)| node(id, slug)).collect(),
            );
            self
        }

        pub fn with_models(mut self, category: &str, brand: &str, models: &[(&str, &str)]) -> Self {
            self.models.insert(
                (category.to_string(), brand.to_string()),
                models.iter().map(|(id, slug)| node(id, slug)).collect(),
            );
            self
        }

        pub fn with_variants(
            mut self,
            category: &str,
            brand: &str,
            model: &str,
            variants: &[(&str, &str)],
        ) -> Self {
            self.variants.insert(
                (category.to_string(), brand.to_string(), model.to_string()),
                variants.iter().map(|(id, slug)| node(id, slug)).collect(),
            );
            self
        }

        pub fn with_cities(mut self, cities: &[(&str, &str)]) -> Self {
            self.cities = cities
                .iter()
                .map(|(id, name)| City {
                    id: id.to_string(),
                    name: name.to_string(),
                    plate_code: None,
                })
                .collect();
            self
        }

        pub fn with_districts(mut self, city: &str, districts: &[(&str, &str)]) -> Self {
            self.districts.insert(
                city.to_string(),
                districts
                    .iter()
                    .map(|(id, name)| District {
                        id: id.to_string(),
                        name: name.to_string(),
                        city_id: Some(city.to_string()),
                    })
                    .collect(),
            );
            self
        }

        /// Makes the call identified by `key` fail.
        pub fn failing(mut self, key: &str) -> Self {
            self.failing.insert(key.to_string());
            self
        }

        /// Holds the call identified by `key` until the returned notifier fires.
        pub fn gated(mut self, key: &str) -> (Self, Arc<Notify>) {
            let notify = Arc::new(Notify::new());
            self.gates.insert(key.to_string(), notify.clone());
            (self, notify)
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        async fn enter(&self, key: String) -> Result<(), CatalogError> {
            self.calls.lock().unwrap().push(key.clone());
            if let Some(gate) = self.gates.get(&key) {
                gate.notified().await;
            }
            if self.failing.contains(&key) {
                return Err(CatalogError::Status {
                    path: key,
                    status: 500,
                });
            }
            Ok(())
        }

        fn find(list: Option<&Vec<TaxonomyNode>>, slug: &str, path: String) -> Result<TaxonomyNode, CatalogError> {
            list.and_then(|items| items.iter().find(|n| n.slug == slug).cloned())
                .ok_or(CatalogError::Status { path, status: 404 })
        }
    }

    #[async_trait::async_trait]
    impl Catalog for FakeCatalog {
        async fn list_brands(&self, category: &str) -> Result<Vec<TaxonomyNode>, CatalogError> {
            self.enter(format!("brands:{category}")).await?;
            Ok(self.brands.get(category).cloned().unwrap_or_default())
        }

        async fn list_models(&self, category: &str, brand: &str) -> Result<Vec<TaxonomyNode>, CatalogError> {
            self.enter(format!("models:{category}/{brand}")).await?;
            Ok(self
                .models
                .get(&(category.to_string(), brand.to_string()))
                .cloned()
                .unwrap_or_default())
        }

        async fn list_variants(
            &self,
            category: &str,
            brand: &str,
            model: &str,
        ) -> Result<Vec<TaxonomyNode>, CatalogError> {
            self.enter(format!("variants:{category}/{brand}/{model}")).await?;
            Ok(self
                .variants
                .get(&(category.to_string(), brand.to_string(), model.to_string()))
                .cloned()
                .unwrap_or_default())
        }

        async fn get_category(&self, category: &str) -> Result<TaxonomyNode, CatalogError> {
            let key = format!("category:{category}");
            self.enter(key.clone()).await?;
            Self::find(Some(&self.categories), category, key)
        }

        async fn get_brand(&self, category: &str, brand: &str) -> Result<TaxonomyNode, CatalogError> {
            let key = format!("brand:{category}/{brand}");
            self.enter(key.clone()).await?;
            Self::find(self.brands.get(category), brand, key)
        }

        async fn get_model(&self, category: &str, brand: &str, model: &str) -> Result<TaxonomyNode, CatalogError> {
            let key = format!("model:{category}/{brand}/{model}");
            self.enter(key.clone()).await?;
            Self::find(
                self.models.get(&(category.to_string(), brand.to_string())),
                model,
                key,
            )
        }

        async fn get_variant(
            &self,
            category: &str,
            brand: &str,
            model: &str,
            variant: &str,
        ) -> Result<TaxonomyNode, CatalogError> {
            let key = format!("variant:{category}/{brand}/{model}/{variant}");
            self.enter(key.clone()).await?;
            Self::find(
                self.variants
                    .get(&(category.to_string(), brand.to_string(), model.to_string())),
                variant,
                key,
            )
        }

        async fn list_cities(&self) -> Result<Vec<City>, CatalogError> {
            self.enter("cities".to_string()).await?;
            Ok(self.cities.clone())
        }

        async fn list_districts(&self, city_id: &str) -> Result<Vec<District>, CatalogError> {
            self.enter(format!("districts:{city_id}")).await?;
            Ok(self.districts.get(city_id).cloned().unwrap_or_default())
        }
    }
}
