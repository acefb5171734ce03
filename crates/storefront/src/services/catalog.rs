//! Product catalog over the `products` table.
//!
//! Listings are cached in-memory via `moka` (5-minute TTL) because the
//! dashboard re-requests them on every visit; writes invalidate the cache.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, instrument};

use kiosk_core::ProductId;

use crate::gateway::{GatewayError, RemoteGateway, decode};
use crate::models::Product;

/// Table products are stored in.
pub const PRODUCTS_TABLE: &str = "products";

/// Bucket product images are uploaded to.
pub const PRODUCT_IMAGE_BUCKET: &str = "product-images";

/// Cache TTL for product listings.
const CACHE_TTL: Duration = Duration::from_secs(300); // 5 minutes

/// Cache key for the full listing; the catalog is small enough to cache
/// whole.
const LISTING_KEY: &str = "products";

/// Read-mostly product catalog with a cached listing.
pub struct ProductCatalog {
    gateway: Arc<dyn RemoteGateway>,
    cache: Cache<&'static str, Arc<Vec<Product>>>,
}

impl ProductCatalog {
    /// Create a catalog client.
    #[must_use]
    pub fn new(gateway: Arc<dyn RemoteGateway>) -> Self {
        let cache = Cache::builder()
            .max_capacity(8)
            .time_to_live(CACHE_TTL)
            .build();
        Self { gateway, cache }
    }

    /// List all products, served from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the listing cannot be fetched.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Arc<Vec<Product>>, GatewayError> {
        if let Some(products) = self.cache.get(LISTING_KEY).await {
            return Ok(products);
        }

        let rows = self.gateway.find_all(PRODUCTS_TABLE, None).await?;
        let products: Vec<Product> = rows
            .into_iter()
            .map(decode::<Product>)
            .collect::<Result<_, _>>()?;
        debug!(count = products.len(), "fetched product listing");

        let products = Arc::new(products);
        self.cache.insert(LISTING_KEY, Arc::clone(&products)).await;
        Ok(products)
    }

    /// Look up a product by id.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the listing cannot be fetched.
    pub async fn get(&self, id: &ProductId) -> Result<Option<Product>, GatewayError> {
        let products = self.list().await?;
        Ok(products.iter().find(|p| &p.id == id).cloned())
    }

    /// Drop the cached listing and fetch a fresh one.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the listing cannot be fetched.
    pub async fn refresh(&self) -> Result<Arc<Vec<Product>>, GatewayError> {
        self.cache.invalidate(LISTING_KEY).await;
        self.list().await
    }

    /// Insert a product and invalidate the cached listing.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the insert fails.
    #[instrument(skip(self, product), fields(id = %product.id))]
    pub async fn insert(&self, product: &Product) -> Result<(), GatewayError> {
        let record = serde_json::to_value(product)?;
        self.gateway.insert(PRODUCTS_TABLE, record).await?;
        self.cache.invalidate(LISTING_KEY).await;
        Ok(())
    }

    /// Update a product in place and invalidate the cached listing.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the update fails.
    #[instrument(skip(self, product), fields(id = %product.id))]
    pub async fn update(&self, product: &Product) -> Result<(), GatewayError> {
        let patch = serde_json::to_value(product)?;
        self.gateway
            .update(PRODUCTS_TABLE, "id", product.id.as_str(), patch)
            .await?;
        self.cache.invalidate(LISTING_KEY).await;
        Ok(())
    }

    /// Upload a product image under `{product_id}/{file_name}` and return
    /// its public URL.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the upload fails.
    #[instrument(skip(self, bytes), fields(id = %product_id, len = bytes.len()))]
    pub async fn upload_image(
        &self,
        product_id: &ProductId,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, GatewayError> {
        let path = format!("{product_id}/{file_name}");
        self.gateway
            .upload_object(PRODUCT_IMAGE_BUCKET, &path, bytes, true)
            .await?;
        Ok(self.gateway.public_url(PRODUCT_IMAGE_BUCKET, &path))
    }

    /// Public URL for a product's image, derived from the stored path.
    #[must_use]
    pub fn image_url(&self, product: &Product) -> Option<String> {
        product
            .image_path
            .as_ref()
            .map(|path| self.gateway.public_url(PRODUCT_IMAGE_BUCKET, path))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use crate::gateway::MemoryGateway;

    use super::*;

    fn seeded_gateway() -> Arc<MemoryGateway> {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.seed(
            PRODUCTS_TABLE,
            json!({"id": "p1", "name": "Succulent Plant", "price_cents": 1250}),
        );
        gateway.seed(
            PRODUCTS_TABLE,
            json!({"id": "p2", "name": "Mobile Lens", "price_cents": 9900}),
        );
        gateway
    }

    #[tokio::test]
    async fn test_second_list_is_served_from_cache() {
        let gateway = seeded_gateway();
        let catalog = ProductCatalog::new(Arc::clone(&gateway) as Arc<dyn RemoteGateway>);

        let first = catalog.list().await.unwrap();
        let second = catalog.list().await.unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        assert_eq!(gateway.calls_to("find_all"), 1);
    }

    #[tokio::test]
    async fn test_refresh_bypasses_cache() {
        let gateway = seeded_gateway();
        let catalog = ProductCatalog::new(Arc::clone(&gateway) as Arc<dyn RemoteGateway>);

        catalog.list().await.unwrap();
        gateway.seed(
            PRODUCTS_TABLE,
            json!({"id": "p3", "name": "Toy Car", "price_cents": 500}),
        );

        // Still cached.
        assert_eq!(catalog.list().await.unwrap().len(), 2);
        // Refresh sees the new row.
        assert_eq!(catalog.refresh().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let catalog = ProductCatalog::new(seeded_gateway());
        let product = catalog.get(&ProductId::from("p2")).await.unwrap().unwrap();
        assert_eq!(product.name, "Mobile Lens");
        assert!(catalog.get(&ProductId::from("ghost")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_invalidates_cache() {
        let gateway = seeded_gateway();
        let catalog = ProductCatalog::new(Arc::clone(&gateway) as Arc<dyn RemoteGateway>);
        catalog.list().await.unwrap();

        let product = Product {
            id: ProductId::from("p9"),
            name: "Blue Speaker".to_owned(),
            price_cents: 4200,
            description: String::new(),
            image_path: None,
        };
        catalog.insert(&product).await.unwrap();

        assert_eq!(catalog.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_image_upload_returns_public_url_containing_path() {
        let gateway = seeded_gateway();
        let catalog = ProductCatalog::new(Arc::clone(&gateway) as Arc<dyn RemoteGateway>);

        let url = catalog
            .upload_image(&ProductId::from("p1"), "front.png", vec![1, 2])
            .await
            .unwrap();

        assert!(url.contains("p1/front.png"));
        assert_eq!(
            gateway.object(PRODUCT_IMAGE_BUCKET, "p1/front.png"),
            Some(vec![1, 2])
        );
    }
}
