use chrono::{TimeZone, Utc};

use crate::db_types::{
    AccessToken,
    Cents,
    CustomerInfo,
    NewVariation,
    NewProduct,
    NewVendor,
    Order,
    OrderId,
    OrderItem,
    OrderStatusType,
    ProductId,
    PurchaseOption,
    VariationId,
    Vendor,
    VendorId,
};

pub fn sample_vendor() -> Vendor {
    let created = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    Vendor {
        id: VendorId(1),
        store: "Blue Pottery".into(),
        owner: "Maria".into(),
        email: "maria@bluepottery.example".into(),
        connected_account_id: Some("acct_blue".into()),
        connected_account_active: true,
        notify_new_orders: true,
        active: true,
        created_at: created,
        updated_at: created,
    }
}

pub fn new_vendor(store: &str, email: &str) -> NewVendor {
    NewVendor { store: store.into(), owner: format!("Owner of {store}"), email: email.into(), notify_new_orders: true }
}

pub fn new_product(name: &str) -> NewProduct {
    NewProduct {
        name: name.into(),
        description: String::new(),
        tags: vec![],
        images: vec![],
        active: true,
        external_product_id: None,
    }
}

pub fn new_variation(descriptor: &str, price: i64, shipping: i64, quantity: i64, option: PurchaseOption) -> NewVariation {
    NewVariation {
        descriptor: descriptor.into(),
        price: Cents::from(price),
        shipping: Cents::from(shipping),
        quantity,
        purchase_option: option,
        external_price_id: None,
    }
}

pub fn sample_customer() -> CustomerInfo {
    CustomerInfo { name: "Ada Lovelace".into(), address: "12 Analytical Way, London".into(), email: "ada@example.com".into() }
}

/// An incomplete order for two blue mugs at $20.00 each plus $5.00 shipping each.
pub fn sample_order() -> Order {
    let created = Utc.with_ymd_and_hms(2024, 3, 10, 14, 30, 0).unwrap();
    Order {
        id: OrderId(1),
        vendor_id: VendorId(1),
        order_number: "2403101430-0001".into(),
        access_token: AccessToken::from("4b1f3e0e-4f7a-4d55-9a8e-0d8c7c2f9b11".to_string()),
        customer: sample_customer(),
        items: vec![OrderItem {
            product_id: ProductId(1),
            variation_id: VariationId(1),
            product_name: "Mug".into(),
            descriptor: "Blue".into(),
            unit_price: Cents::from(2000),
            unit_shipping: Cents::from(500),
            quantity: 2,
        }],
        sub_total: Cents::from(4000),
        shipping: Cents::from(1000),
        total: Cents::from(5000),
        status: OrderStatusType::Incomplete,
        vendor_note: None,
        payment_intent: "pi_sample".into(),
        paid_at: None,
        refunds: vec![],
        created_at: created,
        updated_at: created,
    }
}
