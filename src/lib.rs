pub mod catalog;
pub mod config;
pub mod expertise;
pub mod http;
pub mod lightbox;
pub mod media;
pub mod metrics;
pub mod models;
pub mod profile;
pub mod resolver;
pub mod session;
pub mod submission;

pub use catalog::{Catalog, CatalogClient, CatalogError};
pub use models::{DeepLink, Selection, TaxonomyNode};
pub use profile::{FormProfile, profile_for};
pub use resolver::{ResolverDriver, SelectionResolver};
pub use session::{AdFormSession, Collaborators, Navigation};
