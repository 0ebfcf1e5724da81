//! HTTP API handlers for rfmt-server

pub mod health;
pub mod import;
pub mod rfmts;
pub mod units;

pub use health::health_routes;
pub use import::import_routes;
pub use rfmts::rfmt_routes;
pub use units::unit_routes;
