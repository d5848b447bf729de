pub mod cache;
pub mod inventory_api;
