// src/db/inventory_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    models::inventory::{
        CreateCategoryPayload, CreateProductPayload, MovementKind, PartCategory, Product, StockMovement,
    },
};

#[derive(Clone)]
pub struct InventoryRepository {
    pool: PgPool,
}

impl InventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Funções de "Leitura" (Getters)
    // ---
    // Funções de leitura são simples e podem usar a pool principal.

    pub async fn list_categories(&self) -> Result<Vec<PartCategory>, AppError> {
        let categories = sqlx::query_as::<_, PartCategory>(
            "SELECT * FROM part_categories WHERE active ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE active ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    pub async fn list_movements(&self, product_id: Option<i64>) -> Result<Vec<StockMovement>, AppError> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT * FROM stock_movements
            WHERE ($1::BIGINT IS NULL OR product_id = $1)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(movements)
    }

    // ---
    // Escrita (sempre com executor, para rodar dentro da transação do serviço)
    // ---

    pub async fn create_category<'e, E>(
        &self,
        executor: E,
        payload: &CreateCategoryPayload,
    ) -> Result<PartCategory, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let category = sqlx::query_as::<_, PartCategory>(
            "INSERT INTO part_categories (code, name, description) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(payload.code.to_uppercase())
        .bind(&payload.name)
        .bind(&payload.description)
        .fetch_one(executor)
        .await?;
        Ok(category)
    }

    pub async fn create_product<'e, E>(
        &self,
        executor: E,
        payload: &CreateProductPayload,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (code, name, description, category_id, unit, min_stock, unit_price, location)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&payload.code)
        .bind(&payload.name)
        .bind(&payload.description)
        .bind(payload.category_id)
        .bind(&payload.unit)
        .bind(payload.min_stock)
        .bind(payload.unit_price)
        .bind(&payload.location)
        .fetch_one(executor)
        .await?;
        Ok(product)
    }

    /// Lê o produto travando a linha até o fim da transação.
    pub async fn lock_product<'e, E>(&self, executor: E, product_id: i64) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 FOR UPDATE")
            .bind(product_id)
            .fetch_optional(executor)
            .await?;
        Ok(product)
    }

    pub async fn set_stock<'e, E>(&self, executor: E, product_id: i64, stock: Decimal) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(
            "UPDATE products SET stock = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(product_id)
        .bind(stock)
        .fetch_one(executor)
        .await?;
        Ok(product)
    }

    pub async fn insert_movement<'e, E>(
        &self,
        executor: E,
        product_id: i64,
        user_id: i64,
        kind: MovementKind,
        quantity: Decimal,
        previous_stock: Decimal,
        new_stock: Decimal,
        reason: Option<&str>,
        notes: Option<&str>,
        reference_document: Option<&str>,
    ) -> Result<StockMovement, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let movement = sqlx::query_as::<_, StockMovement>(
            r#"
            INSERT INTO stock_movements (
                product_id, user_id, kind, quantity, previous_stock, new_stock,
                reason, notes, reference_document
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(product_id)
        .bind(user_id)
        .bind(kind)
        .bind(quantity)
        .bind(previous_stock)
        .bind(new_stock)
        .bind(reason)
        .bind(notes)
        .bind(reference_document)
        .fetch_one(executor)
        .await?;
        Ok(movement)
    }
}
