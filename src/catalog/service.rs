//! Catalog service: cache, deduplication and offline degradation
//!
//! Resolution order for reads:
//! 1. fresh cache entry (memory, then disk)
//! 2. live fetch, coalesced with any identical fetch already in flight
//! 3. expired cache entry
//! 4. bundled fallback catalog

use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::client::{ApiClient, ApiError};
use super::fallback::{fallback_product, fallback_products};
use super::{DataSource, Product, Sourced};
use crate::cache::{CacheStats, TieredCache};
use crate::dedup::{DedupStats, RequestDeduplicator};

/// Cache key of the full product listing
pub const PRODUCTS_KEY: &str = "products";

/// Cache key of a single product
pub fn product_key(id: &str) -> String {
    format!("product:{}", id)
}

/// Errors surfaced by the catalog service
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The product does not exist
    #[error("Product '{0}' not found")]
    NotFound(String),

    /// The API failed and nothing cached or bundled could stand in
    #[error("Catalog unavailable: {0}")]
    Unavailable(Arc<ApiError>),
}

/// Freshness and connectivity settings
#[derive(Debug, Clone)]
pub struct CatalogSettings {
    /// How long the product listing stays fresh
    pub products_ttl: Duration,
    /// How long a single product stays fresh
    pub product_ttl: Duration,
    /// Never touch the network
    pub offline: bool,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            products_ttl: Duration::from_secs(5 * 60),
            product_ttl: Duration::from_secs(10 * 60),
            offline: false,
        }
    }
}

/// Caching front for the product catalog
#[derive(Debug)]
pub struct CatalogService {
    client: ApiClient,
    cache: Arc<TieredCache>,
    settings: CatalogSettings,
    list_requests: RequestDeduplicator<Vec<Product>, ApiError>,
    product_requests: RequestDeduplicator<Product, ApiError>,
}

impl CatalogService {
    pub fn new(client: ApiClient, cache: TieredCache, settings: CatalogSettings) -> Self {
        Self {
            client,
            cache: Arc::new(cache),
            settings,
            list_requests: RequestDeduplicator::new(),
            product_requests: RequestDeduplicator::new(),
        }
    }

    /// The underlying API client
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// The underlying cache
    pub fn cache(&self) -> &TieredCache {
        &self.cache
    }

    /// Whether the service is running without network access
    pub fn is_offline(&self) -> bool {
        self.settings.offline
    }

    /// Cache counters
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Deduplication counters for listing and product requests
    pub fn dedup_stats(&self) -> (DedupStats, DedupStats) {
        (self.list_requests.stats(), self.product_requests.stats())
    }

    /// Product listing; never fails
    pub async fn products(&self) -> Sourced<Vec<Product>> {
        if let Some((cached, _)) = self.cache.get_fresh::<Vec<Product>>(PRODUCTS_KEY) {
            return Sourced::new(cached.data, DataSource::Cached);
        }
        self.load_products().await
    }

    /// Product listing fetched live, ignoring cache freshness
    ///
    /// Still coalesces with a fetch already in flight and still degrades on failure.
    pub async fn refresh_products(&self) -> Sourced<Vec<Product>> {
        self.load_products().await
    }

    /// Products in `category`, case-insensitive
    pub async fn products_in(&self, category: &str) -> Sourced<Vec<Product>> {
        self.products().await.in_category(category)
    }

    /// A single product
    pub async fn product(&self, id: &str) -> Result<Sourced<Product>, ServiceError> {
        let key = product_key(id);
        if let Some((cached, _)) = self.cache.get_fresh::<Product>(&key) {
            return Ok(Sourced::new(cached.data, DataSource::Cached));
        }
        if let Some((listing, _)) = self.cache.get_fresh::<Vec<Product>>(PRODUCTS_KEY) {
            if let Some(product) = listing.data.into_iter().find(|p| p.id == id) {
                return Ok(Sourced::new(product, DataSource::Cached));
            }
        }

        let mut failure = None;
        if !self.settings.offline {
            match self.fetch_live_product(id).await {
                Ok(product) => return Ok(Sourced::new(product, DataSource::Live)),
                Err(e) if matches!(*e, ApiError::NotFound(_)) => {
                    self.evict(id);
                    return Err(ServiceError::NotFound(id.to_string()));
                }
                Err(e) => {
                    log_degraded(&e, "product");
                    failure = Some(e);
                }
            }
        }

        if let Some(cached) = self.cache.get_any::<Product>(&key) {
            return Ok(Sourced::new(cached.data, stale_source(cached.is_expired)));
        }
        if let Some(cached) = self.cache.get_any::<Vec<Product>>(PRODUCTS_KEY) {
            if let Some(product) = cached.data.into_iter().find(|p| p.id == id) {
                return Ok(Sourced::new(product, DataSource::Stale));
            }
        }
        if let Some(product) = fallback_product(id) {
            return Ok(Sourced::new(product, DataSource::Fallback));
        }
        Err(match failure {
            Some(e) => ServiceError::Unavailable(e),
            None => ServiceError::NotFound(id.to_string()),
        })
    }

    /// Live state of the given products, for checking a cart against inventory
    ///
    /// Ids missing from the listing are looked up individually; ids the API reports
    /// as not found are omitted. The source is `Live` only if every lookup was live.
    pub async fn live_products_for(&self, ids: &[String]) -> Sourced<Vec<Product>> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let listing = self.refresh_products().await;
        let mut source = listing.source;
        let mut found: Vec<Product> = listing
            .data
            .into_iter()
            .filter(|p| wanted.contains(p.id.as_str()))
            .collect();

        if source != DataSource::Live {
            return Sourced::new(found, source);
        }

        let present: HashSet<String> = found.iter().map(|p| p.id.clone()).collect();
        let missing: Vec<&str> = wanted
            .into_iter()
            .filter(|id| !present.contains(*id))
            .collect();
        let lookups = join_all(missing.iter().map(|id| self.fetch_live_product(id))).await;
        for (id, result) in missing.iter().zip(lookups) {
            match result {
                Ok(product) => found.push(product),
                Err(e) if matches!(*e, ApiError::NotFound(_)) => self.evict(id),
                Err(e) => {
                    log_degraded(&e, "product");
                    source = DataSource::Stale;
                }
            }
        }
        Sourced::new(found, source)
    }

    /// Drops every cached catalog entry
    pub fn invalidate_all(&self) -> Result<usize, crate::storage::StorageError> {
        self.cache.clear()
    }

    /// Drops every cached copy of a product the API no longer has
    fn evict(&self, id: &str) {
        tracing::info!(id, "Product no longer exists, evicting cached copies");
        self.cache.invalidate(&product_key(id));
        let pruned = self.cache.modify::<Vec<Product>, _>(PRODUCTS_KEY, |products| {
            let before = products.len();
            products.retain(|p| p.id != id);
            products.len() != before
        });
        if let Err(e) = pruned {
            tracing::warn!(id, error = %e, "Failed to remove product from cached listing");
        }
    }

    async fn load_products(&self) -> Sourced<Vec<Product>> {
        if self.settings.offline {
            tracing::debug!("Offline mode, skipping product fetch");
            return self.degraded_products();
        }
        match self.fetch_live_products().await {
            Ok(products) => Sourced::new(products, DataSource::Live),
            Err(e) => {
                log_degraded(&e, "product list");
                self.degraded_products()
            }
        }
    }

    fn degraded_products(&self) -> Sourced<Vec<Product>> {
        match self.cache.get_any::<Vec<Product>>(PRODUCTS_KEY) {
            Some(cached) => Sourced::new(cached.data, stale_source(cached.is_expired)),
            None => {
                tracing::warn!("No cached products, showing bundled catalog");
                Sourced::new(fallback_products(), DataSource::Fallback)
            }
        }
    }

    async fn fetch_live_products(&self) -> Result<Vec<Product>, Arc<ApiError>> {
        let client = self.client.clone();
        let cache = Arc::clone(&self.cache);
        let settings = self.settings.clone();
        self.list_requests
            .run(PRODUCTS_KEY, move || async move {
                let products = client.fetch_products().await?;
                store_listing(&cache, &products, &settings);
                Ok::<_, ApiError>(products)
            })
            .await
    }

    async fn fetch_live_product(&self, id: &str) -> Result<Product, Arc<ApiError>> {
        let key = product_key(id);
        let client = self.client.clone();
        let cache = Arc::clone(&self.cache);
        let ttl = self.settings.product_ttl;
        let id = id.to_string();
        self.product_requests
            .run(&key, move || async move {
                let product = client.fetch_product(&id).await?;
                store(&cache, &product_key(&id), &product, ttl);
                Ok::<_, ApiError>(product)
            })
            .await
    }
}

fn stale_source(is_expired: bool) -> DataSource {
    if is_expired {
        DataSource::Stale
    } else {
        DataSource::Cached
    }
}

fn log_degraded(error: &ApiError, what: &str) {
    if error.is_unavailable() {
        tracing::warn!(error = %error, "Live {} fetch failed, degrading", what);
    } else {
        tracing::error!(error = %error, "Live {} fetch rejected, degrading", what);
    }
}

/// Caches the listing and warms each product's own entry
fn store_listing(cache: &TieredCache, products: &[Product], settings: &CatalogSettings) {
    store(cache, PRODUCTS_KEY, &products, settings.products_ttl);
    for product in products {
        store(cache, &product_key(&product.id), product, settings.product_ttl);
    }
}

fn store<T: serde::Serialize>(cache: &TieredCache, key: &str, data: &T, ttl: Duration) {
    if let Err(e) = cache.set(key, data, ttl) {
        tracing::warn!(key, error = %e, "Failed to persist cache entry");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheManager, MemoryCache};
    use tempfile::TempDir;

    fn offline_service(cache: TieredCache) -> CatalogService {
        let client = ApiClient::new("http://127.0.0.1:9/api", Duration::from_millis(200)).unwrap();
        let settings = CatalogSettings {
            offline: true,
            ..CatalogSettings::default()
        };
        CatalogService::new(client, cache, settings)
    }

    fn sample(id: &str, inventory: u32) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {}", id),
            description: String::new(),
            price_cents: 1000,
            category: "apparel".to_string(),
            image_url: None,
            inventory,
            is_active: true,
        }
    }

    #[test]
    fn test_product_key_format() {
        assert_eq!(product_key("tote-bag"), "product:tote-bag");
    }

    #[tokio::test]
    async fn test_offline_without_cache_uses_fallback() {
        let service = offline_service(TieredCache::memory_only());

        let products = service.products().await;

        assert_eq!(products.source, DataSource::Fallback);
        assert_eq!(products.data, fallback_products());
    }

    #[tokio::test]
    async fn test_offline_serves_expired_cache_as_stale() {
        let cache = TieredCache::memory_only();
        cache.set(PRODUCTS_KEY, &vec![sample("a", 1)], Duration::ZERO).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let service = offline_service(cache);

        let products = service.products().await;

        assert_eq!(products.source, DataSource::Stale);
        assert_eq!(products.data[0].id, "a");
    }

    #[tokio::test]
    async fn test_fresh_cache_is_served_without_fetch() {
        let cache = TieredCache::memory_only();
        cache.set(PRODUCTS_KEY, &vec![sample("a", 1)], Duration::from_secs(60)).unwrap();
        let service = offline_service(cache);

        let products = service.products().await;

        assert_eq!(products.source, DataSource::Cached);
        assert_eq!(service.dedup_stats().0.launched, 0);
    }

    #[tokio::test]
    async fn test_product_found_in_fresh_listing() {
        let cache = TieredCache::memory_only();
        cache
            .set(PRODUCTS_KEY, &vec![sample("a", 1), sample("b", 2)], Duration::from_secs(60))
            .unwrap();
        let service = offline_service(cache);

        let product = service.product("b").await.unwrap();

        assert_eq!(product.source, DataSource::Cached);
        assert_eq!(product.data.inventory, 2);
    }

    #[tokio::test]
    async fn test_offline_product_falls_back_to_bundled() {
        let service = offline_service(TieredCache::memory_only());

        let product = service.product("logo-tee").await.unwrap();
        assert_eq!(product.source, DataSource::Fallback);

        let missing = service.product("nope").await;
        assert!(matches!(missing, Err(ServiceError::NotFound(id)) if id == "nope"));
    }

    #[tokio::test]
    async fn test_offline_products_persist_across_services() {
        let temp_dir = TempDir::new().unwrap();
        let disk = || Some(CacheManager::with_dir(temp_dir.path().to_path_buf()));

        let first = offline_service(TieredCache::new(MemoryCache::default(), disk()));
        store_listing(first.cache(), &[sample("a", 3)], &CatalogSettings::default());

        let second = offline_service(TieredCache::new(MemoryCache::default(), disk()));
        let product = second.product("a").await.unwrap();
        assert_eq!(product.source, DataSource::Cached);
    }

    #[tokio::test]
    async fn test_offline_live_lookup_is_not_live() {
        let service = offline_service(TieredCache::memory_only());

        let result = service.live_products_for(&["tote-bag".to_string()]).await;

        assert_eq!(result.source, DataSource::Fallback);
        assert_eq!(result.data.len(), 1);
    }

    #[tokio::test]
    async fn test_products_in_category() {
        let service = offline_service(TieredCache::memory_only());

        let apparel = service.products_in("APPAREL").await;

        assert!(!apparel.data.is_empty());
        assert!(apparel.data.iter().all(|p| p.category == "apparel"));
    }
}
