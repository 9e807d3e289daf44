//! Cascading category → brand → model → variant selection, plus the
//! independent city → district pair.
//!
//! [`SelectionResolver`] performs no I/O. Every action returns the catalog
//! fetches it needs; completions come back through [`SelectionResolver::apply`]
//! tagged with the [`Ticket`] they were issued under. Dependent levels are
//! cleared synchronously inside the action, and a completion whose ticket is
//! no longer current is discarded, so a slow response for an abandoned parent
//! can never repopulate the form.

pub mod driver;
pub mod seed;

use crate::catalog::CatalogError;
use crate::models::{City, District, Listed, Selection, SelectionSlugs, TaxonomyNode};
use thiserror::Error;
use tracing::{debug, warn};

pub use driver::ResolverDriver;
pub use seed::{DeepLinkSeeder, SeededSelection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Category,
    Brand,
    Model,
    Variant,
    City,
    District,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Category => "category",
            Level::Brand => "brand",
            Level::Model => "model",
            Level::Variant => "variant",
            Level::City => "city",
            Level::District => "district",
        }
    }

    const TIERS: [Level; 3] = [Level::Brand, Level::Model, Level::Variant];

    fn tier(self) -> Option<usize> {
        Self::TIERS.iter().position(|level| *level == self)
    }
}

/// How far down the taxonomy the selection reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Empty,
    CategoryOnly,
    BrandChosen,
    ModelChosen,
    VariantChosen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoSelect {
    /// Pick the first option when the list arrives and nothing is selected.
    FirstWhenEmpty,
    Off,
}

impl AutoSelect {
    pub fn from_flag(enabled: bool) -> Self {
        if enabled {
            AutoSelect::FirstWhenEmpty
        } else {
            AutoSelect::Off
        }
    }
}

/// Freshness key of one in-flight option-list fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub level: Level,
    pub generation: u64,
    pub parent: Option<String>,
    pub auto_select: AutoSelect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogQuery {
    Brands {
        category: String,
    },
    Models {
        category: String,
        brand: String,
    },
    Variants {
        category: String,
        brand: String,
        model: String,
    },
    Cities,
    Districts {
        city_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub ticket: Ticket,
    pub query: CatalogQuery,
}

#[derive(Debug, Clone)]
pub enum Listing {
    Nodes(Vec<TaxonomyNode>),
    Cities(Vec<City>),
    Districts(Vec<District>),
}

#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub ticket: Ticket,
    pub result: Result<Listing, CatalogError>,
}

#[derive(Debug)]
pub enum Applied {
    /// The completion was current; these follow-up fetches must be issued.
    Fresh(Vec<FetchRequest>),
    /// The completion belonged to an abandoned request and was dropped.
    Stale,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("{} `{id}` is not among the loaded options", level.as_str())]
    UnknownOption { level: Level, id: String },
    #[error("select a {} first", level.as_str())]
    MissingParent { level: Level },
}

/// Options for one dropdown and whether a fetch for it is outstanding.
#[derive(Debug, Clone)]
pub struct OptionList<T> {
    items: Vec<T>,
    pending: Option<u64>,
}

impl<T> Default for OptionList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            pending: None,
        }
    }
}

impl<T: Listed> OptionList<T> {
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    fn find(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    fn reset(&mut self) {
        self.items.clear();
        self.pending = None;
    }
}

#[derive(Debug, Clone, Default)]
struct Tier {
    selected: Option<TaxonomyNode>,
    options: OptionList<TaxonomyNode>,
}

impl Tier {
    fn reset(&mut self) {
        self.selected = None;
        self.options.reset();
    }

    fn selected_id(&self) -> Option<&str> {
        self.selected.as_ref().map(|node| node.id.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct SelectionResolver {
    auto_select: AutoSelect,
    next_generation: u64,
    category: Option<TaxonomyNode>,
    // brand, model, variant
    tiers: [Tier; 3],
    cities: OptionList<City>,
    city_id: Option<String>,
    districts: OptionList<District>,
    district_id: Option<String>,
}

impl Default for SelectionResolver {
    fn default() -> Self {
        Self::new(AutoSelect::FirstWhenEmpty)
    }
}

impl SelectionResolver {
    pub fn new(auto_select: AutoSelect) -> Self {
        Self {
            auto_select,
            next_generation: 0,
            category: None,
            tiers: Default::default(),
            cities: OptionList::default(),
            city_id: None,
            districts: OptionList::default(),
            district_id: None,
        }
    }

    pub fn auto_select(&self) -> AutoSelect {
        self.auto_select
    }

    pub fn selection(&self) -> Selection {
        Selection {
            category_id: self.category.as_ref().map(|node| node.id.clone()),
            brand_id: self.tiers[0].selected_id().map(str::to_string),
            model_id: self.tiers[1].selected_id().map(str::to_string),
            variant_id: self.tiers[2].selected_id().map(str::to_string),
            city_id: self.city_id.clone(),
            district_id: self.district_id.clone(),
        }
    }

    pub fn slugs(&self) -> SelectionSlugs {
        let slug = |node: &Option<TaxonomyNode>| node.as_ref().map(|n| n.slug.clone());
        SelectionSlugs {
            category: slug(&self.category),
            brand: slug(&self.tiers[0].selected),
            model: slug(&self.tiers[1].selected),
            variant: slug(&self.tiers[2].selected),
        }
    }

    pub fn stage(&self) -> Stage {
        if self.category.is_none() {
            Stage::Empty
        } else if self.tiers[0].selected.is_none() {
            Stage::CategoryOnly
        } else if self.tiers[1].selected.is_none() {
            Stage::BrandChosen
        } else if self.tiers[2].selected.is_none() {
            Stage::ModelChosen
        } else {
            Stage::VariantChosen
        }
    }

    pub fn category(&self) -> Option<&TaxonomyNode> {
        self.category.as_ref()
    }

    pub fn selected(&self, level: Level) -> Option<&TaxonomyNode> {
        match level {
            Level::Category => self.category.as_ref(),
            other => other
                .tier()
                .and_then(|idx| self.tiers[idx].selected.as_ref()),
        }
    }

    pub fn brands(&self) -> &OptionList<TaxonomyNode> {
        &self.tiers[0].options
    }

    pub fn models(&self) -> &OptionList<TaxonomyNode> {
        &self.tiers[1].options
    }

    pub fn variants(&self) -> &OptionList<TaxonomyNode> {
        &self.tiers[2].options
    }

    pub fn cities(&self) -> &OptionList<City> {
        &self.cities
    }

    pub fn districts(&self) -> &OptionList<District> {
        &self.districts
    }

    /// Switches the category; brand and everything below is cleared before
    /// the brand list is requested.
    pub fn set_category(&mut self, category: TaxonomyNode) -> Vec<FetchRequest> {
        if self.category.as_ref() == Some(&category) {
            return Vec::new();
        }
        self.category = Some(category);
        self.reset_tiers_from(0);
        self.request_tier(0, AutoSelect::Off).into_iter().collect()
    }

    pub fn choose_brand(&mut self, id: Option<&str>) -> Result<Vec<FetchRequest>, ResolveError> {
        self.choose_tier(0, id)
    }

    pub fn choose_model(&mut self, id: Option<&str>) -> Result<Vec<FetchRequest>, ResolveError> {
        self.choose_tier(1, id)
    }

    pub fn choose_variant(&mut self, id: Option<&str>) -> Result<(), ResolveError> {
        self.choose_tier(2, id).map(|_| ())
    }

    /// Requests the city list; any selected city stays until the list shows
    /// it is gone.
    pub fn load_cities(&mut self) -> FetchRequest {
        let generation = self.bump();
        self.cities.pending = Some(generation);
        FetchRequest {
            ticket: Ticket {
                level: Level::City,
                generation,
                parent: None,
                auto_select: AutoSelect::Off,
            },
            query: CatalogQuery::Cities,
        }
    }

    pub fn choose_city(&mut self, id: Option<&str>) -> Result<Vec<FetchRequest>, ResolveError> {
        let Some(id) = id else {
            self.city_id = None;
            self.clear_districts();
            return Ok(Vec::new());
        };
        if !self.cities.contains(id) {
            return Err(ResolveError::UnknownOption {
                level: Level::City,
                id: id.to_string(),
            });
        }
        if self.city_id.as_deref() == Some(id) {
            return Ok(Vec::new());
        }
        self.city_id = Some(id.to_string());
        self.clear_districts();
        let generation = self.bump();
        self.districts.pending = Some(generation);
        Ok(vec![FetchRequest {
            ticket: Ticket {
                level: Level::District,
                generation,
                parent: Some(id.to_string()),
                auto_select: AutoSelect::Off,
            },
            query: CatalogQuery::Districts {
                city_id: id.to_string(),
            },
        }])
    }

    pub fn choose_district(&mut self, id: Option<&str>) -> Result<(), ResolveError> {
        let Some(id) = id else {
            self.district_id = None;
            return Ok(());
        };
        if self.city_id.is_none() {
            return Err(ResolveError::MissingParent { level: Level::City });
        }
        if !self.districts.contains(id) {
            return Err(ResolveError::UnknownOption {
                level: Level::District,
                id: id.to_string(),
            });
        }
        self.district_id = Some(id.to_string());
        Ok(())
    }

    /// Applies an explicitly resolved deep link in one step. Every level it
    /// sets is taken as-is and the option lists are reloaded without
    /// auto-selection, so unspecified lower levels stay unset.
    pub fn seed(&mut self, seeded: SeededSelection) -> Vec<FetchRequest> {
        let Some(category) = seeded.category else {
            return Vec::new();
        };
        self.category = Some(category);
        self.reset_tiers_from(0);

        let chain = [seeded.brand, seeded.model, seeded.variant];
        let mut requests = Vec::new();
        for (idx, node) in chain.into_iter().enumerate() {
            requests.extend(self.request_tier(idx, AutoSelect::Off));
            match node {
                Some(node) => self.tiers[idx].selected = Some(node),
                None => break,
            }
        }
        requests
    }

    /// Folds one fetch completion into the state.
    pub fn apply(&mut self, outcome: FetchOutcome) -> Applied {
        let FetchOutcome { ticket, result } = outcome;
        if !self.is_current(&ticket) {
            debug!(
                target = "trucksbus.resolver",
                level = ticket.level.as_str(),
                generation = ticket.generation,
                parent = ?ticket.parent,
                "discarding stale catalog response"
            );
            return Applied::Stale;
        }

        match ticket.level {
            Level::City => {
                self.cities.pending = None;
                match result.and_then(expect_cities) {
                    Ok(items) => {
                        self.cities.items = items;
                        if let Some(id) = self.city_id.clone()
                            && !self.cities.contains(&id)
                        {
                            self.city_id = None;
                            self.clear_districts();
                        }
                    }
                    Err(err) => {
                        warn!(target = "trucksbus.resolver", level = "city", error = %err, "city list unavailable");
                        self.cities.items.clear();
                        self.city_id = None;
                        self.clear_districts();
                    }
                }
                Applied::Fresh(Vec::new())
            }
            Level::District => {
                self.districts.pending = None;
                match result.and_then(expect_districts) {
                    Ok(items) => {
                        self.districts.items = items;
                        if let Some(id) = self.district_id.clone()
                            && !self.districts.contains(&id)
                        {
                            self.district_id = None;
                        }
                    }
                    Err(err) => {
                        warn!(target = "trucksbus.resolver", level = "district", error = %err, "district list unavailable");
                        self.districts.items.clear();
                        self.district_id = None;
                    }
                }
                Applied::Fresh(Vec::new())
            }
            Level::Category => Applied::Stale,
            level => {
                let Some(idx) = level.tier() else {
                    return Applied::Stale;
                };
                self.tiers[idx].options.pending = None;
                match result.and_then(expect_nodes) {
                    Ok(items) => Applied::Fresh(self.accept_tier(idx, items, ticket.auto_select)),
                    Err(err) => {
                        warn!(
                            target = "trucksbus.resolver",
                            level = level.as_str(),
                            error = %err,
                            "option list unavailable"
                        );
                        self.reset_tiers_from(idx);
                        Applied::Fresh(Vec::new())
                    }
                }
            }
        }
    }

    fn accept_tier(
        &mut self,
        idx: usize,
        items: Vec<TaxonomyNode>,
        auto_select: AutoSelect,
    ) -> Vec<FetchRequest> {
        self.tiers[idx].options.items = items;

        if let Some(selected) = self.tiers[idx].selected.clone() {
            match self.tiers[idx].options.find(&selected.id).cloned() {
                Some(listed) => {
                    self.tiers[idx].selected = Some(listed);
                    return Vec::new();
                }
                None => {
                    debug!(
                        target = "trucksbus.resolver",
                        level = Level::TIERS[idx].as_str(),
                        id = %selected.id,
                        "selection no longer listed; clearing"
                    );
                    self.tiers[idx].selected = None;
                    self.reset_tiers_from(idx + 1);
                }
            }
        }

        if auto_select == AutoSelect::FirstWhenEmpty
            && let Some(first) = self.tiers[idx].options.items.first().cloned()
        {
            self.tiers[idx].selected = Some(first);
            self.reset_tiers_from(idx + 1);
            return self.request_tier(idx + 1, self.auto_select).into_iter().collect();
        }
        Vec::new()
    }

    fn choose_tier(&mut self, idx: usize, id: Option<&str>) -> Result<Vec<FetchRequest>, ResolveError> {
        let level = Level::TIERS[idx];
        let Some(id) = id else {
            self.tiers[idx].selected = None;
            self.reset_tiers_from(idx + 1);
            return Ok(Vec::new());
        };
        let node = self.tiers[idx]
            .options
            .find(id)
            .cloned()
            .ok_or_else(|| ResolveError::UnknownOption {
                level,
                id: id.to_string(),
            })?;
        if self.tiers[idx].selected_id() == Some(id) {
            return Ok(Vec::new());
        }
        self.tiers[idx].selected = Some(node);
        self.reset_tiers_from(idx + 1);
        Ok(self.request_tier(idx + 1, self.auto_select).into_iter().collect())
    }

    /// Builds the fetch for tier `idx` from the slugs selected above it, or
    /// nothing when there is no such tier.
    fn request_tier(&mut self, idx: usize, auto_select: AutoSelect) -> Option<FetchRequest> {
        let level = *Level::TIERS.get(idx)?;
        let category = self.category.as_ref()?.slug.clone();
        let parent_slug = |tier: &Tier| tier.selected.as_ref().map(|n| n.slug.clone());
        let (query, parent) = match idx {
            0 => (
                CatalogQuery::Brands { category },
                self.category.as_ref().map(|n| n.id.clone()),
            ),
            1 => (
                CatalogQuery::Models {
                    category,
                    brand: parent_slug(&self.tiers[0])?,
                },
                self.tiers[0].selected_id().map(str::to_string),
            ),
            _ => (
                CatalogQuery::Variants {
                    category,
                    brand: parent_slug(&self.tiers[0])?,
                    model: parent_slug(&self.tiers[1])?,
                },
                self.tiers[1].selected_id().map(str::to_string),
            ),
        };
        let generation = self.bump();
        self.tiers[idx].options.pending = Some(generation);
        Some(FetchRequest {
            ticket: Ticket {
                level,
                generation,
                parent,
                auto_select,
            },
            query,
        })
    }

    fn is_current(&self, ticket: &Ticket) -> bool {
        let (pending, parent) = match ticket.level {
            Level::City => (self.cities.pending, None),
            Level::District => (self.districts.pending, self.city_id.clone()),
            Level::Category => return false,
            level => {
                let Some(idx) = level.tier() else {
                    return false;
                };
                let parent = if idx == 0 {
                    self.category.as_ref().map(|n| n.id.clone())
                } else {
                    self.tiers[idx - 1].selected_id().map(str::to_string)
                };
                (self.tiers[idx].options.pending, parent)
            }
        };
        pending == Some(ticket.generation) && parent == ticket.parent
    }

    fn reset_tiers_from(&mut self, idx: usize) {
        for tier in self.tiers.iter_mut().skip(idx) {
            tier.reset();
        }
    }

    fn clear_districts(&mut self) {
        self.district_id = None;
        self.districts.reset();
    }

    fn bump(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }
}

fn expect_nodes(listing: Listing) -> Result<Vec<TaxonomyNode>, CatalogError> {
    match listing {
        Listing::Nodes(items) => Ok(items),
        _ => Err(CatalogError::Decode("expected taxonomy nodes".into())),
    }
}

fn expect_cities(listing: Listing) -> Result<Vec<City>, CatalogError> {
    match listing {
        Listing::Cities(items) => Ok(items),
        _ => Err(CatalogError::Decode("expected cities".into())),
    }
}

fn expect_districts(listing: Listing) -> Result<Vec<District>, CatalogError> {
    match listing {
        Listing::Districts(items) => Ok(items),
        _ => Err(CatalogError::Decode("expected districts".into())),
    }
}
