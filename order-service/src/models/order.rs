use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "approved" => Ok(PaymentStatus::Approved),
            "rejected" => Ok(PaymentStatus::Rejected),
            other => Err(format!("invalid payment status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Processing => "processing",
            DeliveryStatus::Shipped => "shipped",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Cancelled)
    }

    /// Position in the forward progression. Cancelled sits outside it.
    fn rank(&self) -> Option<u8> {
        match self {
            DeliveryStatus::Pending => Some(0),
            DeliveryStatus::Processing => Some(1),
            DeliveryStatus::Shipped => Some(2),
            DeliveryStatus::Delivered => Some(3),
            DeliveryStatus::Cancelled => None,
        }
    }

    /// Delivery moves forward only: pending -> processing -> shipped ->
    /// delivered, skips allowed. Cancellation is reachable from any
    /// non-terminal state. Delivered and cancelled accept nothing further.
    pub fn can_transition_to(&self, next: DeliveryStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == DeliveryStatus::Cancelled {
            return true;
        }
        match (self.rank(), next.rank()) {
            (Some(from), Some(to)) => to > from,
            _ => false,
        }
    }
}

impl std::str::FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DeliveryStatus::Pending),
            "processing" => Ok(DeliveryStatus::Processing),
            "shipped" => Ok(DeliveryStatus::Shipped),
            "delivered" => Ok(DeliveryStatus::Delivered),
            "cancelled" => Ok(DeliveryStatus::Cancelled),
            other => Err(format!("invalid delivery status: {}", other)),
        }
    }
}

/// Line item embedded in an order. Not independently addressable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    /// Unit price in minor currency units (cents).
    pub unit_price: i64,
    pub size: Option<String>,
    pub color: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    pub state: Option<String>,
    pub zip: String,
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub client_name: String,
    pub client_email: String,
    pub items: Vec<OrderItem>,
    /// Total in minor currency units. Equals the sum of quantity x
    /// unit_price over items.
    pub total_amount: i64,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    /// Storage key of the uploaded payment proof, relative to the
    /// static-served uploads directory.
    pub payment_proof: Option<String>,
    pub payment_status: PaymentStatus,
    pub delivery_status: DeliveryStatus,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: String,
        client_name: String,
        client_email: String,
        items: Vec<OrderItem>,
        total_amount: i64,
        shipping_address: ShippingAddress,
        payment_method: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            client_name,
            client_email,
            items,
            total_amount,
            shipping_address,
            payment_method,
            payment_proof: None,
            payment_status: PaymentStatus::Pending,
            delivery_status: DeliveryStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sum of quantity x unit_price over the line items.
    pub fn items_total(items: &[OrderItem]) -> i64 {
        items
            .iter()
            .map(|item| i64::from(item.quantity) * item.unit_price)
            .sum()
    }
}
