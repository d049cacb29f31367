// src/db/catalog_repo.rs

use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    models::catalog::{ExtinguisherBrand, ExtinguisherCapacity, ExtinguisherType, UpdateTypePayload},
};

/// Tabelas que o catálogo sabe apagar. Evita montar SQL a partir de texto livre.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogTable {
    Types,
    Capacities,
    Brands,
}

impl CatalogTable {
    pub fn table(&self) -> &'static str {
        match self {
            CatalogTable::Types => "extinguisher_types",
            CatalogTable::Capacities => "extinguisher_capacities",
            CatalogTable::Brands => "extinguisher_brands",
        }
    }

    /// Nome da entidade nos eventos globais.
    pub fn entity(&self) -> &'static str {
        match self {
            CatalogTable::Types => "extinguisher_type",
            CatalogTable::Capacities => "extinguisher_capacity",
            CatalogTable::Brands => "extinguisher_brand",
        }
    }
}

#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Leitura (somente ativos)
    // ---

    pub async fn list_types(&self) -> Result<Vec<ExtinguisherType>, AppError> {
        let types = sqlx::query_as::<_, ExtinguisherType>(
            "SELECT * FROM extinguisher_types WHERE active ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(types)
    }

    pub async fn list_capacities(&self) -> Result<Vec<ExtinguisherCapacity>, AppError> {
        let capacities = sqlx::query_as::<_, ExtinguisherCapacity>(
            "SELECT * FROM extinguisher_capacities WHERE active ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(capacities)
    }

    pub async fn list_brands(&self) -> Result<Vec<ExtinguisherBrand>, AppError> {
        let brands = sqlx::query_as::<_, ExtinguisherBrand>(
            "SELECT * FROM extinguisher_brands WHERE active ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(brands)
    }

    // ---
    // Escrita
    // ---

    pub async fn create_type<'e, E>(
        &self,
        executor: E,
        name: &str,
        full_name: &str,
        fire_class: Option<&str>,
        description: Option<&str>,
        color: &str,
    ) -> Result<ExtinguisherType, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let created = sqlx::query_as::<_, ExtinguisherType>(
            r#"
            INSERT INTO extinguisher_types (name, full_name, fire_class, description, color)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(full_name)
        .bind(fire_class)
        .bind(description)
        .bind(color)
        .fetch_one(executor)
        .await?;
        Ok(created)
    }

    pub async fn create_capacity<'e, E>(
        &self,
        executor: E,
        capacity: &str,
        unit: &str,
    ) -> Result<ExtinguisherCapacity, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let created = sqlx::query_as::<_, ExtinguisherCapacity>(
            "INSERT INTO extinguisher_capacities (capacity, unit) VALUES ($1, $2) RETURNING *",
        )
        .bind(capacity)
        .bind(unit)
        .fetch_one(executor)
        .await?;
        Ok(created)
    }

    pub async fn create_brand<'e, E>(
        &self,
        executor: E,
        name: &str,
        origin: Option<&str>,
    ) -> Result<ExtinguisherBrand, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let created = sqlx::query_as::<_, ExtinguisherBrand>(
            "INSERT INTO extinguisher_brands (name, origin) VALUES ($1, $2) RETURNING *",
        )
        .bind(name)
        .bind(origin)
        .fetch_one(executor)
        .await?;
        Ok(created)
    }

    // COALESCE: parâmetro NULL mantém a coluna como está.
    pub async fn update_type<'e, E>(
        &self,
        executor: E,
        id: i64,
        changes: &UpdateTypePayload,
    ) -> Result<Option<ExtinguisherType>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let updated = sqlx::query_as::<_, ExtinguisherType>(
            r#"
            UPDATE extinguisher_types SET
                name = COALESCE($2, name),
                full_name = COALESCE($3, full_name),
                fire_class = COALESCE($4, fire_class),
                description = COALESCE($5, description),
                color = COALESCE($6, color)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.full_name.as_deref())
        .bind(changes.fire_class.as_deref())
        .bind(changes.description.as_deref())
        .bind(changes.color.as_deref())
        .fetch_optional(executor)
        .await?;
        Ok(updated)
    }

    pub async fn update_capacity<'e, E>(
        &self,
        executor: E,
        id: i64,
        capacity: Option<&str>,
        unit: Option<&str>,
    ) -> Result<Option<ExtinguisherCapacity>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let updated = sqlx::query_as::<_, ExtinguisherCapacity>(
            r#"
            UPDATE extinguisher_capacities SET
                capacity = COALESCE($2, capacity),
                unit = COALESCE($3, unit)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(capacity)
        .bind(unit)
        .fetch_optional(executor)
        .await?;
        Ok(updated)
    }

    pub async fn update_brand<'e, E>(
        &self,
        executor: E,
        id: i64,
        name: Option<&str>,
        origin: Option<&str>,
    ) -> Result<Option<ExtinguisherBrand>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let updated = sqlx::query_as::<_, ExtinguisherBrand>(
            r#"
            UPDATE extinguisher_brands SET
                name = COALESCE($2, name),
                origin = COALESCE($3, origin)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(origin)
        .fetch_optional(executor)
        .await?;
        Ok(updated)
    }

    pub async fn delete<'e, E>(&self, executor: E, table: CatalogTable, id: i64) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("DELETE FROM {} WHERE id = $1", table.table());
        let result = sqlx::query(&sql).bind(id).execute(executor).await?;
        Ok(result.rows_affected() > 0)
    }
}
