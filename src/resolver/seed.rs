use crate::catalog::Catalog;
use crate::models::{DeepLink, TaxonomyNode};
use crate::resolver::ResolverDriver;
use tracing::{info, warn};

/// Taxonomy nodes resolved from a deep link. A `None` level stops the chain:
/// nothing below it is ever set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeededSelection {
    pub category: Option<TaxonomyNode>,
    pub brand: Option<TaxonomyNode>,
    pub model: Option<TaxonomyNode>,
    pub variant: Option<TaxonomyNode>,
}

/// Applies a deep link once per distinct link.
#[derive(Debug, Default)]
pub struct DeepLinkSeeder {
    last: Option<DeepLink>,
}

impl DeepLinkSeeder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `link` and seeds the driver with the result. Returns `None`
    /// without touching the catalog when the effective link was already
    /// applied.
    pub async fn seed(
        &mut self,
        driver: &mut ResolverDriver,
        link: &DeepLink,
        default_category: &str,
    ) -> Option<SeededSelection> {
        let mut effective = link.clone();
        if effective.category_slug.is_none() {
            effective.category_slug = Some(default_category.to_string());
        }
        if self.last.as_ref() == Some(&effective) {
            return None;
        }
        self.last = Some(effective.clone());

        let catalog = driver.catalog();
        let seeded = resolve(catalog.as_ref(), &effective).await;
        info!(
            target = "trucksbus.seed",
            category = ?seeded.category.as_ref().map(|n| &n.slug),
            brand = ?seeded.brand.as_ref().map(|n| &n.slug),
            model = ?seeded.model.as_ref().map(|n| &n.slug),
            variant = ?seeded.variant.as_ref().map(|n| &n.slug),
            "deep_link_resolved"
        );
        driver.seed(seeded.clone());
        Some(seeded)
    }
}

/// Looks up each named level in dependency order. The first level that
/// fails to resolve ends the walk; ancestors already resolved are kept.
pub async fn resolve(catalog: &dyn Catalog, link: &DeepLink) -> SeededSelection {
    let mut seeded = SeededSelection::default();
    let Some(category_slug) = link.category_slug.as_deref() else {
        return seeded;
    };
    seeded.category = match catalog.get_category(category_slug).await {
        Ok(node) => Some(node),
        Err(err) => {
            warn!(target = "trucksbus.seed", level = "category", slug = category_slug, error = %err, "deep link level unresolved");
            return seeded;
        }
    };

    let Some(brand_slug) = link.brand_slug.as_deref() else {
        return seeded;
    };
    seeded.brand = match catalog.get_brand(category_slug, brand_slug).await {
        Ok(node) => Some(node),
        Err(err) => {
            warn!(target = "trucksbus.seed", level = "brand", slug = brand_slug, error = %err, "deep link level unresolved");
            return seeded;
        }
    };

    let Some(model_slug) = link.model_slug.as_deref() else {
        return seeded;
    };
    seeded.model = match catalog.get_model(category_slug, brand_slug, model_slug).await {
        Ok(node) => Some(node),
        Err(err) => {
            warn!(target = "trucksbus.seed", level = "model", slug = model_slug, error = %err, "deep link level unresolved");
            return seeded;
        }
    };

    let Some(variant_slug) = link.variant_slug.as_deref() else {
        return seeded;
    };
    match catalog
        .get_variant(category_slug, brand_slug, model_slug, variant_slug)
        .await
    {
        Ok(node) => seeded.variant = Some(node),
        Err(err) => {
            warn!(target = "trucksbus.seed", level = "variant", slug = variant_slug, error = %err, "deep link level unresolved");
        }
    }
    seeded
}
