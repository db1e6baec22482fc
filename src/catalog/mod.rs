//! Catalog pagination snapshot and catalog administration

pub mod cache;
pub mod manager;

pub use cache::CatalogCache;
pub use manager::CatalogManager;
