use thiserror::Error;

use crate::db_types::{
    NewProduct,
    NewVariation,
    NewVendor,
    Product,
    ProductId,
    ProductUpdate,
    Variation,
    VariationId,
    Vendor,
    VendorId,
};

#[derive(Debug, Clone, Error)]
pub enum InventoryError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("The requested {0} does not exist")]
    VendorNotFound(VendorId),
    #[error("The requested {0} does not exist")]
    ProductNotFound(ProductId),
    #[error("The requested {0} does not exist")]
    VariationNotFound(VariationId),
    #[error("A vendor with the e-mail address {0} already exists")]
    VendorAlreadyExists(String),
}

impl From<sqlx::Error> for InventoryError {
    fn from(e: sqlx::Error) -> Self {
        InventoryError::DatabaseError(e.to_string())
    }
}

/// The inventory ledger: vendors, the products they list, and the purchasable variations of those products.
///
/// Stock levels are only *decremented* through [`crate::traits::MarketplaceDatabase::insert_order`], which does it
/// atomically with order creation.
#[allow(async_fn_in_trait)]
pub trait InventoryManagement {
    async fn insert_vendor(&self, vendor: NewVendor) -> Result<Vendor, InventoryError>;

    async fn fetch_vendor(&self, vendor_id: VendorId) -> Result<Option<Vendor>, InventoryError>;

    async fn fetch_vendor_by_account(&self, account_id: &str) -> Result<Option<Vendor>, InventoryError>;

    /// Links the vendor to a connected account with the payment processor. The account starts out inactive.
    async fn set_connected_account(&self, vendor_id: VendorId, account_id: &str) -> Result<Vendor, InventoryError>;

    /// Records whether the connected account can accept charges. Returns `None` if no vendor owns the account.
    async fn set_connected_account_status(
        &self,
        account_id: &str,
        active: bool,
    ) -> Result<Option<Vendor>, InventoryError>;

    async fn insert_product(&self, vendor_id: VendorId, product: NewProduct) -> Result<Product, InventoryError>;

    async fn fetch_product(&self, product_id: ProductId) -> Result<Option<Product>, InventoryError>;

    async fn update_product(&self, product_id: ProductId, update: ProductUpdate) -> Result<Product, InventoryError>;

    /// Hides the product from the catalog. Archived products stay in the database, since orders refer to them.
    async fn archive_product(&self, product_id: ProductId) -> Result<Product, InventoryError>;

    /// The vendor's products that have not been archived. Inactive products are only included if
    /// `include_inactive` is set.
    async fn fetch_products_for_vendor(
        &self,
        vendor_id: VendorId,
        include_inactive: bool,
    ) -> Result<Vec<Product>, InventoryError>;

    async fn insert_variation(
        &self,
        product_id: ProductId,
        variation: NewVariation,
    ) -> Result<Variation, InventoryError>;

    /// Replaces the variation's descriptor, prices, stock and purchase option.
    async fn update_variation(
        &self,
        variation_id: VariationId,
        variation: NewVariation,
    ) -> Result<Variation, InventoryError>;

    async fn archive_variation(&self, variation_id: VariationId) -> Result<Variation, InventoryError>;

    async fn fetch_variation(&self, variation_id: VariationId) -> Result<Option<Variation>, InventoryError>;

    async fn fetch_variations_for_product(&self, product_id: ProductId) -> Result<Vec<Variation>, InventoryError>;
}
