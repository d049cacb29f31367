pub mod auth;
pub mod catalog_service;
pub mod client_service;
pub mod dashboard_service;
pub mod evidence_service;
pub mod extinguisher_service;
pub mod inventory_service;
pub mod lifecycle;
pub mod maintenance_service;
pub mod order_service;
