use crate::models::{DeliveryStatus, Order, PaymentStatus};
use crate::services::store::{OrderFilter, OrderPage, OrderStore};
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument},
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(uri = %uri, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB at {}: {}", uri, e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for order-service");

        let orders = self.orders();

        // Compound index on (user_id, created_at desc) for the "my orders"
        // listing, which is always newest first.
        let owner_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("owner_recency_lookup".to_string())
                    .build(),
            )
            .build();

        orders.create_index(owner_index, None).await.map_err(|e| {
            tracing::error!("Failed to create owner index on orders collection: {}", e);
            AppError::from(e)
        })?;
        tracing::info!("Created index on orders.(user_id, created_at)");

        // Recency index for the admin listing.
        let recency_index = IndexModel::builder()
            .keys(doc! { "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("recency_lookup".to_string())
                    .build(),
            )
            .build();

        orders.create_index(recency_index, None).await.map_err(|e| {
            tracing::error!(
                "Failed to create recency index on orders collection: {}",
                e
            );
            AppError::from(e)
        })?;
        tracing::info!("Created index on orders.created_at");

        Ok(())
    }

    pub fn orders(&self) -> Collection<Order> {
        self.db.collection("orders")
    }

    pub fn client(&self) -> &MongoClient {
        &self.client
    }
}

fn status_bson<T: serde::Serialize>(status: &T) -> Result<Bson, AppError> {
    mongodb::bson::to_bson(status)
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to serialize status: {}", e)))
}

fn filter_document(filter: &OrderFilter) -> Result<Document, AppError> {
    let mut document = doc! {};

    if let Some(status) = &filter.payment_status {
        document.insert("payment_status", status_bson(status)?);
    }
    if let Some(status) = &filter.delivery_status {
        document.insert("delivery_status", status_bson(status)?);
    }
    if let Some(q) = &filter.q {
        document.insert(
            "$or",
            vec![
                doc! { "client_name": { "$regex": q, "$options": "i" } },
                doc! { "client_email": { "$regex": q, "$options": "i" } },
            ],
        );
    }

    Ok(document)
}

#[async_trait]
impl OrderStore for MongoDb {
    async fn insert(&self, order: &Order) -> Result<(), AppError> {
        self.orders()
            .insert_one(order, None)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Order>, AppError> {
        self.orders()
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(AppError::from)
    }

    async fn list_for_owner(&self, user_id: &str) -> Result<Vec<Order>, AppError> {
        let find_options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();

        let mut cursor = self
            .orders()
            .find(doc! { "user_id": user_id }, find_options)
            .await
            .map_err(AppError::from)?;

        let mut orders = Vec::new();
        while let Some(order) = cursor.try_next().await.map_err(AppError::from)? {
            orders.push(order);
        }
        Ok(orders)
    }

    async fn list_all(&self, filter: &OrderFilter) -> Result<OrderPage, AppError> {
        let document = filter_document(filter)?;

        let total = self
            .orders()
            .count_documents(document.clone(), None)
            .await
            .map_err(AppError::from)?;

        let skip = filter.page.saturating_sub(1) * filter.page_size;
        let find_options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .skip(skip)
            .limit(filter.page_size as i64)
            .build();

        let mut cursor = self
            .orders()
            .find(document, find_options)
            .await
            .map_err(AppError::from)?;

        let mut orders = Vec::new();
        while let Some(order) = cursor.try_next().await.map_err(AppError::from)? {
            orders.push(order);
        }

        Ok(OrderPage { orders, total })
    }

    async fn set_payment_status(&self, id: &str, status: PaymentStatus) -> Result<(), AppError> {
        let result = self
            .orders()
            .update_one(
                doc! { "_id": id },
                doc! { "$set": {
                    "payment_status": status_bson(&status)?,
                    "updated_at": Bson::DateTime(mongodb::bson::DateTime::now()),
                } },
                None,
            )
            .await
            .map_err(AppError::from)?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(anyhow::anyhow!("Order not found")));
        }
        Ok(())
    }

    async fn set_delivery_status(&self, id: &str, status: DeliveryStatus) -> Result<(), AppError> {
        let result = self
            .orders()
            .update_one(
                doc! { "_id": id },
                doc! { "$set": {
                    "delivery_status": status_bson(&status)?,
                    "updated_at": Bson::DateTime(mongodb::bson::DateTime::now()),
                } },
                None,
            )
            .await
            .map_err(AppError::from)?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(anyhow::anyhow!("Order not found")));
        }
        Ok(())
    }

    async fn set_payment_proof(&self, id: &str, key: &str) -> Result<Option<String>, AppError> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::Before)
            .build();

        let previous = self
            .orders()
            .find_one_and_update(
                doc! { "_id": id },
                doc! { "$set": {
                    "payment_proof": key,
                    "payment_status": status_bson(&PaymentStatus::Pending)?,
                    "updated_at": Bson::DateTime(mongodb::bson::DateTime::now()),
                } },
                options,
            )
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Order not found")))?;

        Ok(previous.payment_proof)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }
}
