// src/services/inventory_service.rs

use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::InventoryRepository,
    models::inventory::{
        CreateCategoryPayload, CreateProductPayload, MovementKind, PartCategory, ProductView, RecordMovementPayload,
        StockMovement,
    },
    realtime::{EntityChange, NotificationBus},
};

/// Estoque resultante de uma movimentação.
/// `Ajuste` define o valor absoluto; `Salida` nunca deixa o estoque negativo.
pub fn apply_movement(kind: MovementKind, current: Decimal, quantity: Decimal) -> Result<Decimal, AppError> {
    match kind {
        MovementKind::Ajuste if quantity < Decimal::ZERO => Err(AppError::ValidationError(
            "O estoque ajustado não pode ser negativo".into(),
        )),
        MovementKind::Ajuste => Ok(quantity),
        _ if quantity <= Decimal::ZERO => Err(AppError::ValidationError(
            "A quantidade deve ser maior que zero".into(),
        )),
        MovementKind::Entrada => Ok(current + quantity),
        MovementKind::Salida if quantity > current => Err(AppError::PreconditionFailed(format!(
            "Estoque insuficiente: disponível {}, solicitado {}",
            current, quantity
        ))),
        MovementKind::Salida => Ok(current - quantity),
    }
}

#[derive(Clone)]
pub struct InventoryService {
    inventory_repo: InventoryRepository,
    pool: PgPool,
    bus: NotificationBus,
}

impl InventoryService {
    pub fn new(inventory_repo: InventoryRepository, pool: PgPool, bus: NotificationBus) -> Self {
        Self {
            inventory_repo,
            pool,
            bus,
        }
    }

    // --- Categorias ---

    pub async fn list_categories(&self) -> Result<Vec<PartCategory>, AppError> {
        self.inventory_repo.list_categories().await
    }

    pub async fn create_category(&self, payload: CreateCategoryPayload) -> Result<PartCategory, AppError> {
        let category = self.inventory_repo.create_category(&self.pool, &payload).await?;
        self.bus.publish_entity(
            "part_category",
            EntityChange::Created,
            json!({ "id": category.id, "code": category.code }),
            Some(format!("Categoria {} criada", category.name)),
        );
        Ok(category)
    }

    // --- Produtos ---

    pub async fn list_products(&self) -> Result<Vec<ProductView>, AppError> {
        let products = self.inventory_repo.list_products().await?;
        Ok(products.into_iter().map(ProductView::from).collect())
    }

    pub async fn create_product(&self, payload: CreateProductPayload) -> Result<ProductView, AppError> {
        if payload.min_stock < Decimal::ZERO || payload.unit_price < Decimal::ZERO {
            return Err(AppError::ValidationError(
                "Estoque mínimo e preço não podem ser negativos".into(),
            ));
        }
        let product = self.inventory_repo.create_product(&self.pool, &payload).await?;

        tracing::info!("📦 Produto {} ({}) criado", product.name, product.code);
        self.bus.publish_entity(
            "product",
            EntityChange::Created,
            json!({ "id": product.id, "code": product.code }),
            Some(format!("Produto {} criado", product.name)),
        );
        Ok(product.into())
    }

    // --- Movimentações ---

    pub async fn list_movements(&self, product_id: Option<i64>) -> Result<Vec<StockMovement>, AppError> {
        self.inventory_repo.list_movements(product_id).await
    }

    /// Estoque anterior, novo estoque e o registro da movimentação na mesma transação.
    pub async fn record_movement(
        &self,
        user_id: i64,
        payload: RecordMovementPayload,
    ) -> Result<StockMovement, AppError> {
        let mut tx = self.pool.begin().await?;

        let product = self
            .inventory_repo
            .lock_product(&mut *tx, payload.product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Produto".into()))?;

        let new_stock = apply_movement(payload.kind, product.stock, payload.quantity)?;
        let updated = self
            .inventory_repo
            .set_stock(&mut *tx, product.id, new_stock)
            .await?;
        let movement = self
            .inventory_repo
            .insert_movement(
                &mut *tx,
                product.id,
                user_id,
                payload.kind,
                payload.quantity,
                product.stock,
                new_stock,
                payload.reason.as_deref(),
                payload.notes.as_deref(),
                payload.reference_document.as_deref(),
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            "📦 {:?} de {} em {}: {} -> {}",
            payload.kind,
            payload.quantity,
            product.code,
            product.stock,
            new_stock
        );
        if updated.needs_restock() {
            tracing::warn!("⚠️ Produto {} abaixo do estoque mínimo ({})", updated.code, updated.min_stock);
        }
        self.bus.publish_entity(
            "product",
            EntityChange::Updated,
            json!({ "id": updated.id, "stock": updated.stock, "needsRestock": updated.needs_restock() }),
            Some(format!("Estoque de {} atualizado", updated.name)),
        );
        Ok(movement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    #[test]
    fn entrada_adds_to_stock() {
        assert_eq!(apply_movement(MovementKind::Entrada, d("5"), d("2.5")).unwrap(), d("7.5"));
    }

    #[test]
    fn salida_cannot_go_below_zero() {
        assert_eq!(apply_movement(MovementKind::Salida, d("5"), d("5")).unwrap(), d("0"));
        let err = apply_movement(MovementKind::Salida, d("5"), d("6")).unwrap_err();
        assert!(matches!(err, AppError::PreconditionFailed(_)));
    }

    #[test]
    fn ajuste_sets_the_absolute_value() {
        assert_eq!(apply_movement(MovementKind::Ajuste, d("40"), d("12")).unwrap(), d("12"));
        assert_eq!(apply_movement(MovementKind::Ajuste, d("40"), d("0")).unwrap(), d("0"));
        assert!(matches!(
            apply_movement(MovementKind::Ajuste, d("40"), d("-1")),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn non_positive_quantities_are_rejected() {
        for kind in [MovementKind::Entrada, MovementKind::Salida] {
            assert!(matches!(
                apply_movement(kind, d("10"), d("0")),
                Err(AppError::ValidationError(_))
            ));
            assert!(matches!(
                apply_movement(kind, d("10"), d("-3")),
                Err(AppError::ValidationError(_))
            ));
        }
    }
}
