//! Startup wiring for the worktime server
//!
//! - Configuration loading
//! - Database initialization
//! - Service construction
//! - Administrator bootstrap

pub mod config;
pub mod database;
pub mod services;
pub mod user;

pub use config::load_config;
pub use database::init_database;
pub use services::{init_services, Services};
pub use user::bootstrap_admin_user;
