use crate::models::{DeliveryStatus, Order, OrderItem, PaymentStatus, ShippingAddress};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, message = "order must contain at least one item"), nested)]
    pub items: Vec<OrderItemRequest>,
    /// Total in minor currency units. Must equal the sum of the items.
    #[validate(range(min = 0))]
    pub total_amount: i64,
    #[validate(nested)]
    pub shipping_address: ShippingAddressRequest,
    #[validate(length(min = 1))]
    pub payment_method: String,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct OrderItemRequest {
    #[validate(length(min = 1))]
    pub product_id: String,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(range(min = 1))]
    pub quantity: u32,
    #[validate(range(min = 0))]
    pub unit_price: i64,
    pub size: Option<String>,
    pub color: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ShippingAddressRequest {
    #[validate(length(min = 1))]
    pub street: String,
    #[validate(length(min = 1))]
    pub city: String,
    pub state: Option<String>,
    #[validate(length(min = 1))]
    pub zip: String,
    #[validate(length(min = 1))]
    pub country: String,
}

impl From<OrderItemRequest> for OrderItem {
    fn from(item: OrderItemRequest) -> Self {
        Self {
            product_id: item.product_id,
            name: item.name,
            quantity: item.quantity,
            unit_price: item.unit_price,
            size: item.size,
            color: item.color,
            image: item.image,
        }
    }
}

impl From<ShippingAddressRequest> for ShippingAddress {
    fn from(address: ShippingAddressRequest) -> Self {
        Self {
            street: address.street,
            city: address.city,
            state: address.state,
            zip: address.zip,
            country: address.country,
        }
    }
}

/// Body of the admin status mutations. The raw string is parsed against
/// the respective enum so out-of-range values surface as a 400 with the
/// offending value named.
#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct OrderListParams {
    pub payment_status: Option<PaymentStatus>,
    pub delivery_status: Option<DeliveryStatus>,
    pub q: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub client_name: String,
    pub client_email: String,
    pub items: Vec<OrderItem>,
    pub total_amount: i64,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub payment_proof: Option<String>,
    pub payment_status: PaymentStatus,
    pub delivery_status: DeliveryStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            client_name: order.client_name,
            client_email: order.client_email,
            items: order.items,
            total_amount: order.total_amount,
            shipping_address: order.shipping_address,
            payment_method: order.payment_method,
            payment_proof: order.payment_proof,
            payment_status: order.payment_status,
            delivery_status: order.delivery_status,
            created_at: order.created_at.to_rfc3339(),
            updated_at: order.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderListResponse {
    pub orders: Vec<OrderResponse>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}
