pub mod orders;

pub use orders::{
    CreateOrderRequest, OrderItemRequest, OrderListParams, OrderListResponse, OrderResponse,
    ShippingAddressRequest, StatusUpdateRequest,
};
