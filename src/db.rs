pub mod store;
pub use store::{RecordStore, StoreTx};
pub mod order_repo;
pub use order_repo::PgRecordStore;
pub mod user_repo;
pub use user_repo::UserRepository;
pub mod client_repo;
pub use client_repo::ClientRepository;
pub mod catalog_repo;
pub use catalog_repo::{CatalogRepository, CatalogTable};
pub mod maintenance_repo;
pub use maintenance_repo::MaintenanceRepository;
pub mod inventory_repo;
pub use inventory_repo::InventoryRepository;
pub mod extinguisher_repo;
pub use extinguisher_repo::ExtinguisherRepository;
pub mod dashboard_repo;
pub use dashboard_repo::DashboardRepository;

#[cfg(test)]
pub mod memory;
