use crate::dtos::{
    CreateOrderRequest, OrderListParams, OrderListResponse, OrderResponse, StatusUpdateRequest,
};
use crate::middleware::{require_admin, AuthUser};
use crate::models::{DeliveryStatus, Order, OrderItem, PaymentStatus};
use crate::services::{OrderFilter, OrderStore, Storage};
use crate::startup::AppState;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;
use validator::Validate;

/// Server-side cap on an individual proof file.
pub const MAX_PAYMENT_PROOF_BYTES: usize = 5 * 1024 * 1024;

/// Request body cap. Slightly above the proof cap to leave room for the
/// multipart framing, so oversized files fail our check rather than the
/// transport's.
pub const PROOF_BODY_LIMIT_BYTES: usize = 6 * 1024 * 1024;

pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let items: Vec<OrderItem> = payload.items.into_iter().map(OrderItem::from).collect();

    let items_total = Order::items_total(&items);
    if payload.total_amount != items_total {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "total_amount {} does not match the sum of line items {}",
            payload.total_amount,
            items_total
        )));
    }

    let order = Order::new(
        user.0.sub,
        user.0.name,
        user.0.email,
        items,
        payload.total_amount,
        payload.shipping_address.into(),
        payload.payment_method,
    );

    state.store.insert(&order).await.map_err(|e| {
        tracing::error!("Failed to insert order {}: {}", order.id, e);
        e
    })?;

    metrics::counter!("orders_created_total").increment(1);
    tracing::info!(
        order_id = %order.id,
        user_id = %order.user_id,
        total_amount = order.total_amount,
        "Order created"
    );

    Ok((StatusCode::CREATED, Json(OrderResponse::from(order))))
}

pub async fn list_my_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let orders = state.store.list_for_owner(&user.0.sub).await?;
    let orders: Vec<OrderResponse> = orders.into_iter().map(OrderResponse::from).collect();
    Ok(Json(orders))
}

pub async fn list_all_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<OrderListParams>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&user.0)?;

    let page = params.page.unwrap_or(1).max(1);
    let page_size = params.page_size.unwrap_or(20).clamp(1, 100);

    let filter = OrderFilter {
        payment_status: params.payment_status,
        delivery_status: params.delivery_status,
        q: params.q,
        page,
        page_size,
    };

    let page_result = state.store.list_all(&filter).await?;
    let total_pages = page_result.total.div_ceil(page_size);

    Ok(Json(OrderListResponse {
        orders: page_result
            .orders
            .into_iter()
            .map(OrderResponse::from)
            .collect(),
        total: page_result.total,
        page,
        page_size,
        total_pages,
    }))
}

pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let order = state
        .store
        .find_by_id(&order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Order not found")))?;

    if !user.0.role.is_admin() && order.user_id != user.0.sub {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Not the owner of this order"
        )));
    }

    Ok(Json(OrderResponse::from(order)))
}

pub async fn update_payment_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<String>,
    Json(payload): Json<StatusUpdateRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&user.0)?;

    let status: PaymentStatus = payload
        .status
        .parse()
        .map_err(|e: String| AppError::BadRequest(anyhow::anyhow!(e)))?;

    state.store.set_payment_status(&order_id, status).await?;

    metrics::counter!("order_payment_status_updates_total", "status" => status.as_str())
        .increment(1);
    tracing::info!(
        order_id = %order_id,
        status = status.as_str(),
        "Payment status updated"
    );

    let order = state
        .store
        .find_by_id(&order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Order not found")))?;

    Ok(Json(OrderResponse::from(order)))
}

pub async fn update_delivery_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<String>,
    Json(payload): Json<StatusUpdateRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&user.0)?;

    let status: DeliveryStatus = payload
        .status
        .parse()
        .map_err(|e: String| AppError::BadRequest(anyhow::anyhow!(e)))?;

    let order = state
        .store
        .find_by_id(&order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Order not found")))?;

    if !order.delivery_status.can_transition_to(status) {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "illegal delivery transition: {} -> {}",
            order.delivery_status.as_str(),
            status.as_str()
        )));
    }

    state.store.set_delivery_status(&order_id, status).await?;

    metrics::counter!("order_delivery_status_updates_total", "status" => status.as_str())
        .increment(1);
    tracing::info!(
        order_id = %order_id,
        status = status.as_str(),
        "Delivery status updated"
    );

    let order = state
        .store
        .find_by_id(&order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Order not found")))?;

    Ok(Json(OrderResponse::from(order)))
}

fn proof_extension(content_type: &str) -> Result<&'static str, AppError> {
    match content_type {
        "image/png" => Ok("png"),
        "image/jpeg" => Ok("jpg"),
        "image/webp" => Ok("webp"),
        "application/pdf" => Ok("pdf"),
        other => Err(AppError::BadRequest(anyhow::anyhow!(
            "unsupported payment proof type {}; expected an image or PDF",
            other
        ))),
    }
}

pub async fn upload_payment_proof(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let order = state
        .store
        .find_by_id(&order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Order not found")))?;

    if order.user_id != user.0.sub {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Only the order owner can attach a payment proof"
        )));
    }

    let mut proof = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e))
    })? {
        if field.name() == Some("paymentProof") {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field.bytes().await.map_err(|e| {
                AppError::BadRequest(anyhow::anyhow!("Failed to read file bytes: {}", e))
            })?;
            proof = Some((content_type, data));
            break;
        }
    }

    let (content_type, data) =
        proof.ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Missing paymentProof field")))?;

    let extension = proof_extension(&content_type)?;

    if data.len() > MAX_PAYMENT_PROOF_BYTES {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Payment proof too large (max 5MB)"
        )));
    }

    // Deterministic key: order id plus upload timestamp.
    let storage_key = format!(
        "payment-proofs/{}/{}.{}",
        order_id,
        Utc::now().timestamp_millis(),
        extension
    );

    state
        .storage
        .upload(&storage_key, data.to_vec())
        .await
        .map_err(|e| {
            tracing::error!("Failed to store payment proof {}: {}", storage_key, e);
            e
        })?;

    let previous = state.store.set_payment_proof(&order_id, &storage_key).await?;

    // A replaced proof is unreferenced from here on; failing to remove it
    // leaves garbage but not an inconsistent order.
    if let Some(previous) = previous {
        if previous != storage_key {
            if let Err(e) = state.storage.delete(&previous).await {
                tracing::warn!(
                    order_id = %order_id,
                    storage_key = %previous,
                    error = %e,
                    "Failed to remove replaced payment proof"
                );
            }
        }
    }

    metrics::counter!("payment_proofs_uploaded_total").increment(1);
    tracing::info!(
        order_id = %order_id,
        storage_key = %storage_key,
        size = data.len(),
        "Payment proof attached"
    );

    let order = state
        .store
        .find_by_id(&order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Order not found")))?;

    Ok(Json(OrderResponse::from(order)))
}
