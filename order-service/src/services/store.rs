use crate::models::{DeliveryStatus, Order, PaymentStatus};
use async_trait::async_trait;
use chrono::Utc;
use service_core::error::AppError;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Admin listing filter. Mirrors what the storefront's admin table filters
/// on client-side: status facets, free text over client name/email, and
/// pagination.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub payment_status: Option<PaymentStatus>,
    pub delivery_status: Option<DeliveryStatus>,
    pub q: Option<String>,
    pub page: u64,
    pub page_size: u64,
}

#[derive(Debug)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub total: u64,
}

/// Persistence seam for orders. Backed by MongoDB in production and by an
/// in-memory map for development and the test suite; selected through
/// `DatabaseConfig::backend`.
///
/// Every mutation is a single read-modify-write with last-write-wins
/// semantics; there is no optimistic concurrency control.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: &Order) -> Result<(), AppError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Order>, AppError>;

    /// Orders owned by `user_id`, newest first.
    async fn list_for_owner(&self, user_id: &str) -> Result<Vec<Order>, AppError>;

    /// All orders matching `filter`, newest first.
    async fn list_all(&self, filter: &OrderFilter) -> Result<OrderPage, AppError>;

    async fn set_payment_status(&self, id: &str, status: PaymentStatus) -> Result<(), AppError>;

    async fn set_delivery_status(&self, id: &str, status: DeliveryStatus) -> Result<(), AppError>;

    /// Records the proof storage key and resets payment status to pending.
    /// Returns the key of the proof being replaced, if any.
    async fn set_payment_proof(&self, id: &str, key: &str) -> Result<Option<String>, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}

/// In-memory order store. Holds everything in a map behind an RwLock;
/// data does not survive a restart.
#[derive(Default)]
pub struct MemoryStore {
    orders: RwLock<HashMap<String, Order>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn matches(order: &Order, filter: &OrderFilter) -> bool {
        if let Some(status) = filter.payment_status {
            if order.payment_status != status {
                return false;
            }
        }
        if let Some(status) = filter.delivery_status {
            if order.delivery_status != status {
                return false;
            }
        }
        if let Some(q) = &filter.q {
            let q = q.to_lowercase();
            if !order.client_name.to_lowercase().contains(&q)
                && !order.client_email.to_lowercase().contains(&q)
            {
                return false;
            }
        }
        true
    }
}

fn newest_first(orders: &mut [Order]) {
    // Tie-break on id so pagination stays stable for equal timestamps.
    orders.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert(&self, order: &Order) -> Result<(), AppError> {
        self.orders
            .write()
            .await
            .insert(order.id.clone(), order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Order>, AppError> {
        Ok(self.orders.read().await.get(id).cloned())
    }

    async fn list_for_owner(&self, user_id: &str) -> Result<Vec<Order>, AppError> {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .await
            .values()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut orders);
        Ok(orders)
    }

    async fn list_all(&self, filter: &OrderFilter) -> Result<OrderPage, AppError> {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .await
            .values()
            .filter(|order| Self::matches(order, filter))
            .cloned()
            .collect();
        newest_first(&mut orders);

        let total = orders.len() as u64;
        let skip = (filter.page.saturating_sub(1) * filter.page_size) as usize;
        let orders = orders
            .into_iter()
            .skip(skip)
            .take(filter.page_size as usize)
            .collect();

        Ok(OrderPage { orders, total })
    }

    async fn set_payment_status(&self, id: &str, status: PaymentStatus) -> Result<(), AppError> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Order not found")))?;
        order.payment_status = status;
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn set_delivery_status(&self, id: &str, status: DeliveryStatus) -> Result<(), AppError> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Order not found")))?;
        order.delivery_status = status;
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn set_payment_proof(&self, id: &str, key: &str) -> Result<Option<String>, AppError> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Order not found")))?;
        let previous = order.payment_proof.replace(key.to_string());
        order.payment_status = PaymentStatus::Pending;
        order.updated_at = Utc::now();
        Ok(previous)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}
