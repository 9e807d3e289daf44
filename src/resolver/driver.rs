use crate::catalog::{Catalog, CatalogError};
use crate::metrics;
use crate::models::TaxonomyNode;
use crate::resolver::{
    Applied, AutoSelect, CatalogQuery, FetchOutcome, FetchRequest, Listing, ResolveError,
    SeededSelection, SelectionResolver,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::debug;

/// Runs the fetches a [`SelectionResolver`] asks for and feeds completions
/// back in arrival order. Each fetch is its own task, so a slow list never
/// blocks a later one.
pub struct ResolverDriver {
    resolver: SelectionResolver,
    catalog: Arc<dyn Catalog>,
    tx: mpsc::UnboundedSender<FetchOutcome>,
    rx: mpsc::UnboundedReceiver<FetchOutcome>,
    in_flight: usize,
    timeout: Option<Duration>,
}

impl ResolverDriver {
    pub fn new(catalog: Arc<dyn Catalog>, auto_select: AutoSelect) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            resolver: SelectionResolver::new(auto_select),
            catalog,
            tx,
            rx,
            in_flight: 0,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn resolver(&self) -> &SelectionResolver {
        &self.resolver
    }

    pub fn catalog(&self) -> Arc<dyn Catalog> {
        self.catalog.clone()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn set_category(&mut self, category: TaxonomyNode) {
        let requests = self.resolver.set_category(category);
        self.dispatch(requests);
    }

    pub fn choose_brand(&mut self, id: Option<&str>) -> Result<(), ResolveError> {
        let requests = self.resolver.choose_brand(id)?;
        self.dispatch(requests);
        Ok(())
    }

    pub fn choose_model(&mut self, id: Option<&str>) -> Result<(), ResolveError> {
        let requests = self.resolver.choose_model(id)?;
        self.dispatch(requests);
        Ok(())
    }

    pub fn choose_variant(&mut self, id: Option<&str>) -> Result<(), ResolveError> {
        self.resolver.choose_variant(id)
    }

    pub fn load_cities(&mut self) {
        let request = self.resolver.load_cities();
        self.dispatch(vec![request]);
    }

    pub fn choose_city(&mut self, id: Option<&str>) -> Result<(), ResolveError> {
        let requests = self.resolver.choose_city(id)?;
        self.dispatch(requests);
        Ok(())
    }

    pub fn choose_district(&mut self, id: Option<&str>) -> Result<(), ResolveError> {
        self.resolver.choose_district(id)
    }

    pub fn seed(&mut self, seeded: SeededSelection) {
        let requests = self.resolver.seed(seeded);
        self.dispatch(requests);
    }

    /// Waits for the next completion and applies it. Returns `None` when
    /// nothing is in flight.
    pub async fn pump(&mut self) -> Option<Applied> {
        if self.in_flight == 0 {
            return None;
        }
        let outcome = self.rx.recv().await?;
        self.in_flight -= 1;
        let applied = self.resolver.apply(outcome);
        if let Applied::Fresh(next) = &applied {
            self.dispatch(next.clone());
        }
        Some(applied)
    }

    /// Pumps until every issued fetch, including follow-ups, has completed.
    pub async fn settle(&mut self) {
        while self.pump().await.is_some() {}
    }

    fn dispatch(&mut self, requests: Vec<FetchRequest>) {
        for FetchRequest { ticket, query } in requests {
            debug!(
                target = "trucksbus.resolver",
                level = ticket.level.as_str(),
                generation = ticket.generation,
                "dispatch_fetch"
            );
            self.in_flight += 1;
            let catalog = self.catalog.clone();
            let tx = self.tx.clone();
            let timeout = self.timeout;
            tokio::spawn(async move {
                let started = Instant::now();
                let result = match timeout {
                    Some(limit) => tokio::time::timeout(limit, run_query(catalog.as_ref(), &query))
                        .await
                        .unwrap_or(Err(CatalogError::Timeout)),
                    None => run_query(catalog.as_ref(), &query).await,
                };
                metrics::fetch_elapsed(
                    ticket.level.as_str(),
                    started.elapsed().as_millis(),
                    result.is_ok(),
                );
                let _ = tx.send(FetchOutcome { ticket, result });
            });
        }
    }
}

async fn run_query(catalog: &dyn Catalog, query: &CatalogQuery) -> Result<Listing, CatalogError> {
    match query {
        CatalogQuery::Brands { category } => catalog.list_brands(category).await.map(Listing::Nodes),
        CatalogQuery::Models { category, brand } => {
            catalog.list_models(category, brand).await.map(Listing::Nodes)
        }
        CatalogQuery::Variants {
            category,
            brand,
            model,
        } => catalog
            .list_variants(category, brand, model)
            .await
            .map(Listing::Nodes),
        CatalogQuery::Cities => catalog.list_cities().await.map(Listing::Cities),
        CatalogQuery::Districts { city_id } => {
            catalog.list_districts(city_id).await.map(Listing::Districts)
        }
    }
}
