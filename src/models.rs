use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;

/// One level of the vehicle taxonomy: a category, brand, model or variant.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TaxonomyNode {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    pub slug: String,
}

impl TaxonomyNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            slug: slug.into(),
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct City {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub plate_code: Option<String>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct District {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "opt_id_string")]
    pub city_id: Option<String>,
}

/// Anything listed in a dropdown and selected by id.
pub trait Listed {
    fn id(&self) -> &str;
}

impl Listed for TaxonomyNode {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Listed for City {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Listed for District {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Identifiers currently chosen on the form. `None` means unset.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub category_id: Option<String>,
    pub brand_id: Option<String>,
    pub model_id: Option<String>,
    pub variant_id: Option<String>,
    pub city_id: Option<String>,
    pub district_id: Option<String>,
}

/// Slugs of the selected taxonomy nodes, kept for catalog paths and the
/// legacy slug fields of the create call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSlugs {
    pub category: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub variant: Option<String>,
}

/// Taxonomy levels named by slug in an incoming URL.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepLink {
    #[serde(default)]
    pub category_slug: Option<String>,
    #[serde(default)]
    pub brand_slug: Option<String>,
    #[serde(default)]
    pub model_slug: Option<String>,
    #[serde(default)]
    pub variant_slug: Option<String>,
}

impl DeepLink {
    pub fn new(
        category_slug: Option<&str>,
        brand_slug: Option<&str>,
        model_slug: Option<&str>,
        variant_slug: Option<&str>,
    ) -> Self {
        let clean = |value: Option<&str>| {
            value
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            category_slug: clean(category_slug),
            brand_slug: clean(brand_slug),
            model_slug: clean(model_slug),
            variant_slug: clean(variant_slug),
        }
    }

    /// Parses `/<category>/<brand>/<model>/<variant>` style paths, ignoring a
    /// leading prefix segment such as `create-ad`.
    pub fn from_path(path: &str, prefix: &str) -> Self {
        let mut segments = path
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .peekable();
        if segments.peek().is_some_and(|first| *first == prefix) {
            segments.next();
        }
        let parts: Vec<&str> = segments.take(4).collect();
        Self::new(
            parts.first().copied(),
            parts.get(1).copied(),
            parts.get(2).copied(),
            parts.get(3).copied(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.category_slug.is_none()
            && self.brand_slug.is_none()
            && self.model_slug.is_none()
            && self.variant_slug.is_none()
    }
}

/// Error body returned by the backend on failed requests.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

pub(crate) fn opt_id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_node_accepts_numeric_ids() {
        let node: TaxonomyNode =
            serde_json::from_str(r#"{"id": 42, "name": "Mercedes-Benz", "slug": "mercedes"}"#)
                .expect("decode");
        assert_eq!(node.id, "42");
        assert_eq!(node.slug, "mercedes");
    }

    #[test]
    fn district_city_id_is_optional() {
        let with: District =
            serde_json::from_str(r#"{"id": 7, "name": "Kadikoy", "cityId": 34}"#).unwrap();
        assert_eq!(with.city_id.as_deref(), Some("34"));
        let without: District = serde_json::from_str(r#"{"id": "8", "name": "Besiktas"}"#).unwrap();
        assert_eq!(without.city_id, None);
    }

    #[test]
    fn deep_link_from_path_skips_prefix_and_query() {
        let link = DeepLink::from_path("/create-ad/minibus-midibus/mercedes/sprinter?x=1", "create-ad");
        assert_eq!(link.category_slug.as_deref(), Some("minibus-midibus"));
        assert_eq!(link.brand_slug.as_deref(), Some("mercedes"));
        assert_eq!(link.model_slug.as_deref(), Some("sprinter"));
        assert_eq!(link.variant_slug, None);
    }

    #[test]
    fn deep_link_blank_slugs_are_unset() {
        let link = DeepLink::new(Some(" "), Some(""), None, None);
        assert!(link.is_empty());
    }
}
