// src/db/store.rs

use async_trait::async_trait;
use std::collections::HashMap;

use crate::{
    common::error::AppError,
    models::{
        catalog::{ExtinguisherCapacity, ExtinguisherType},
        orders::{ExtinguisherRecord, LineItemInput, NewExtinguisher, NewOrder, Order, OrderLineDetail},
        photos::{NewPhoto, Photo, PhotoKind},
    },
};

/// Ponto de entrada do armazenamento usado pelo motor de ordens e pelo
/// rastreador de fotos. Cada operação lógica abre exatamente uma transação.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, AppError>;
}

/// Uma transação aberta. Se for descartada sem `commit`, tudo é desfeito.
#[async_trait]
pub trait StoreTx: Send {
    // --- Ordens ---
    async fn max_order_id(&mut self) -> Result<i64, AppError>;
    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, AppError>;
    async fn find_order(&mut self, order_id: i64) -> Result<Option<Order>, AppError>;
    async fn update_order(&mut self, order: &Order) -> Result<(), AppError>;
    async fn delete_order(&mut self, order_id: i64) -> Result<(), AppError>;
    async fn list_orders(&mut self) -> Result<Vec<Order>, AppError>;
    /// Quantidade de extintores com série preenchida, por ordem.
    async fn registered_counts(&mut self) -> Result<HashMap<i64, i64>, AppError>;

    // --- Detalhes (tipo/capacidade/quantidade) ---
    async fn insert_line_detail(
        &mut self,
        order_id: i64,
        item: &LineItemInput,
    ) -> Result<OrderLineDetail, AppError>;
    async fn list_line_details(&mut self, order_id: i64) -> Result<Vec<OrderLineDetail>, AppError>;

    // --- Extintores ---
    async fn insert_extinguisher(
        &mut self,
        client_id: i64,
        order_id: i64,
        fields: &NewExtinguisher,
    ) -> Result<ExtinguisherRecord, AppError>;
    async fn list_extinguishers(&mut self, order_id: i64) -> Result<Vec<ExtinguisherRecord>, AppError>;
    async fn find_extinguisher(&mut self, extinguisher_id: i64) -> Result<Option<ExtinguisherRecord>, AppError>;
    async fn update_extinguisher(&mut self, record: &ExtinguisherRecord) -> Result<(), AppError>;
    async fn delete_extinguisher(&mut self, extinguisher_id: i64) -> Result<(), AppError>;
    async fn delete_blank_extinguishers(&mut self, order_id: i64) -> Result<u64, AppError>;
    async fn delete_order_extinguishers(&mut self, order_id: i64) -> Result<u64, AppError>;

    // --- Fotos (evidência e guia) ---
    async fn insert_photo(&mut self, kind: PhotoKind, photo: &NewPhoto) -> Result<Photo, AppError>;
    async fn find_photo(&mut self, kind: PhotoKind, photo_id: i64) -> Result<Option<Photo>, AppError>;
    /// Mais recentes primeiro.
    async fn list_photos(&mut self, kind: PhotoKind, order_id: i64) -> Result<Vec<Photo>, AppError>;
    async fn count_photos(&mut self, kind: PhotoKind, order_id: i64) -> Result<i64, AppError>;
    async fn delete_photo(&mut self, kind: PhotoKind, photo_id: i64) -> Result<(), AppError>;
    async fn delete_order_photos(&mut self, kind: PhotoKind, order_id: i64) -> Result<u64, AppError>;
    async fn set_photo_flag(&mut self, kind: PhotoKind, order_id: i64, value: bool) -> Result<(), AppError>;

    // --- Referências externas ---
    async fn find_type(&mut self, type_id: i64) -> Result<Option<ExtinguisherType>, AppError>;
    async fn find_capacity(&mut self, capacity_id: i64) -> Result<Option<ExtinguisherCapacity>, AppError>;
    async fn client_exists(&mut self, client_id: i64) -> Result<bool, AppError>;

    async fn commit(&mut self) -> Result<(), AppError>;
}
