pub mod auth;
pub mod catalog;
pub mod clients;
pub mod dashboard;
pub mod extinguishers;
pub mod inventory;
pub mod maintenance;
pub mod orders;
pub mod photos;
