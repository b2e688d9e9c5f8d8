pub mod order;

pub use order::{DeliveryStatus, Order, OrderItem, PaymentStatus, ShippingAddress};
