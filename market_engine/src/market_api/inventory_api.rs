use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{
        NewProduct,
        NewVariation,
        NewVendor,
        Product,
        ProductId,
        ProductUpdate,
        ProductWithVariations,
        PurchaseOption,
        Variation,
        VariationId,
        VariationUpdate,
        Vendor,
        VendorId,
    },
    helpers::{is_valid_email, validate_new_variation},
    market_api::errors::OrderFlowError,
    traits::{InventoryManagement, OnboardingSession, PaymentGateway, VendorProfile},
};

/// Vendor onboarding and catalog maintenance.
pub struct InventoryApi<B, G> {
    db: B,
    gateway: G,
}

impl<B, G> Debug for InventoryApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InventoryApi")
    }
}

impl<B, G> InventoryApi<B, G> {
    pub fn new(db: B, gateway: G) -> Self {
        Self { db, gateway }
    }
}

impl<B, G> InventoryApi<B, G>
where
    B: InventoryManagement,
    G: PaymentGateway,
{
    pub async fn create_vendor(&self, vendor: NewVendor) -> Result<Vendor, OrderFlowError> {
        if vendor.store.trim().is_empty() {
            return Err(OrderFlowError::invalid_input("Store name is required"));
        }
        if vendor.owner.trim().is_empty() {
            return Err(OrderFlowError::invalid_input("Invalid name"));
        }
        if !is_valid_email(&vendor.email) {
            return Err(OrderFlowError::invalid_input("Invalid email"));
        }
        let vendor = self.db.insert_vendor(vendor).await?;
        info!("🗃️ New vendor {} ({}) created", vendor.store, vendor.id);
        Ok(vendor)
    }

    pub async fn vendor(&self, vendor_id: VendorId) -> Result<Vendor, OrderFlowError> {
        self.db.fetch_vendor(vendor_id).await?.ok_or_else(|| OrderFlowError::not_found(vendor_id))
    }

    /// Creates the vendor's connected account with the payment processor if it does not have one yet, and opens an
    /// onboarding session for it.
    pub async fn connect_vendor(&self, vendor_id: VendorId) -> Result<OnboardingSession, OrderFlowError> {
        let vendor = self.vendor(vendor_id).await?;
        let account_id = match vendor.connected_account_id {
            Some(id) => id,
            None => {
                let profile = VendorProfile { store: vendor.store.clone(), email: vendor.email.clone() };
                let account = self.gateway.create_connected_account(&profile).await?;
                self.db.set_connected_account(vendor_id, &account.id).await?;
                info!("💳️ Created payment account {} for {vendor_id}", account.id);
                account.id
            },
        };
        let session = self.gateway.create_onboarding_session(&account_id).await?;
        debug!("💳️ Onboarding session opened for {vendor_id}");
        Ok(session)
    }

    pub async fn set_account_status(&self, account_id: &str, active: bool) -> Result<Option<Vendor>, OrderFlowError> {
        let vendor = self.db.set_connected_account_status(account_id, active).await?;
        Ok(vendor)
    }

    pub async fn create_product(&self, vendor_id: VendorId, product: NewProduct) -> Result<Product, OrderFlowError> {
        if product.name.trim().is_empty() {
            return Err(OrderFlowError::invalid_input("Product name is required"));
        }
        let vendor = self.vendor(vendor_id).await?;
        let product = self.db.insert_product(vendor.id, product).await?;
        debug!("🗃️ {vendor_id} added {} ({})", product.name, product.id);
        Ok(product)
    }

    /// Adds a variation to one of the vendor's products. Vendors that cannot take online payments yet can only list
    /// their variations, so the purchase option is downgraded to [`PurchaseOption::List`] for them.
    pub async fn add_variation(
        &self,
        vendor_id: VendorId,
        product_id: ProductId,
        mut variation: NewVariation,
    ) -> Result<Variation, OrderFlowError> {
        validate_new_variation(&variation)?;
        self.owned_product(vendor_id, product_id).await?;
        self.coerce_purchase_option(vendor_id, &mut variation).await?;
        let variation = self.db.insert_variation(product_id, variation).await?;
        Ok(variation)
    }

    /// Changes some of a product's catalog fields. Only the owning vendor may do so.
    pub async fn update_product(
        &self,
        vendor_id: VendorId,
        product_id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, OrderFlowError> {
        if update.is_empty() {
            return Err(OrderFlowError::invalid_input("Nothing to update"));
        }
        if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(OrderFlowError::invalid_input("Product name is required"));
        }
        self.owned_product(vendor_id, product_id).await?;
        let product = self.db.update_product(product_id, update).await?;
        debug!("🗃️ {vendor_id} updated {} ({product_id})", product.name);
        Ok(product)
    }

    /// Takes a product off sale for good. Existing orders keep their snapshot of it.
    pub async fn archive_product(&self, vendor_id: VendorId, product_id: ProductId) -> Result<Product, OrderFlowError> {
        self.owned_product(vendor_id, product_id).await?;
        let product = self.db.archive_product(product_id).await?;
        info!("🗃️ {vendor_id} archived {} ({product_id})", product.name);
        Ok(product)
    }

    /// Changes some of a variation's fields. The result is validated like a new variation, and is downgraded to
    /// [`PurchaseOption::List`] if the vendor cannot sell online yet.
    pub async fn update_variation(
        &self,
        vendor_id: VendorId,
        variation_id: VariationId,
        update: VariationUpdate,
    ) -> Result<Variation, OrderFlowError> {
        if update.is_empty() {
            return Err(OrderFlowError::invalid_input("Nothing to update"));
        }
        let current = self.owned_variation(vendor_id, variation_id).await?;
        let mut variation = update.apply_to(&current);
        validate_new_variation(&variation)?;
        self.coerce_purchase_option(vendor_id, &mut variation).await?;
        let variation = self.db.update_variation(variation_id, variation).await?;
        debug!("🗃️ {vendor_id} updated {variation_id}");
        Ok(variation)
    }

    pub async fn archive_variation(
        &self,
        vendor_id: VendorId,
        variation_id: VariationId,
    ) -> Result<Variation, OrderFlowError> {
        self.owned_variation(vendor_id, variation_id).await?;
        let variation = self.db.archive_variation(variation_id).await?;
        info!("🗃️ {vendor_id} archived {variation_id} ({})", variation.descriptor);
        Ok(variation)
    }

    /// The storefront of a vendor: its active, non-archived products along with the variations still on sale.
    pub async fn vendor_catalog(&self, vendor_id: VendorId) -> Result<Vec<ProductWithVariations>, OrderFlowError> {
        let vendor = self.vendor(vendor_id).await?;
        if !vendor.active {
            return Err(OrderFlowError::not_found(vendor_id));
        }
        let products = self.db.fetch_products_for_vendor(vendor_id, false).await?;
        let mut catalog = Vec::with_capacity(products.len());
        for product in products {
            let variations = self.db.fetch_variations_for_product(product.id).await?;
            let variations = variations.into_iter().filter(|v| !v.archived).collect();
            catalog.push(ProductWithVariations { product, variations });
        }
        trace!("🗃️ {} products in the catalog of {vendor_id}", catalog.len());
        Ok(catalog)
    }

    /// Everything the vendor has not archived, including inactive products.
    pub async fn own_products(&self, vendor_id: VendorId) -> Result<Vec<Product>, OrderFlowError> {
        let products = self.db.fetch_products_for_vendor(vendor_id, true).await?;
        Ok(products)
    }

    pub async fn product(&self, product_id: ProductId) -> Result<ProductWithVariations, OrderFlowError> {
        let product = self.db.fetch_product(product_id).await?.ok_or_else(|| OrderFlowError::not_found(product_id))?;
        let variations = self.db.fetch_variations_for_product(product_id).await?;
        Ok(ProductWithVariations { product, variations })
    }

    async fn owned_product(&self, vendor_id: VendorId, product_id: ProductId) -> Result<Product, OrderFlowError> {
        let product = self.db.fetch_product(product_id).await?.ok_or_else(|| OrderFlowError::not_found(product_id))?;
        if product.vendor_id != vendor_id {
            warn!("🗃️ {vendor_id} tried to modify {product_id}, which belongs to {}", product.vendor_id);
            return Err(OrderFlowError::Forbidden);
        }
        Ok(product)
    }

    async fn owned_variation(&self, vendor_id: VendorId, variation_id: VariationId) -> Result<Variation, OrderFlowError> {
        let variation =
            self.db.fetch_variation(variation_id).await?.ok_or_else(|| OrderFlowError::not_found(variation_id))?;
        self.owned_product(vendor_id, variation.product_id).await?;
        Ok(variation)
    }

    async fn coerce_purchase_option(
        &self,
        vendor_id: VendorId,
        variation: &mut NewVariation,
    ) -> Result<(), OrderFlowError> {
        let vendor = self.vendor(vendor_id).await?;
        if !vendor.can_sell_online() && variation.purchase_option != PurchaseOption::List {
            debug!("🗃️ {vendor_id} cannot sell online yet. Listing '{}' only.", variation.descriptor);
            variation.purchase_option = PurchaseOption::List;
        }
        Ok(())
    }
}
