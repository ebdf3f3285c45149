// API module - HTTP endpoints

pub mod auth;
pub mod customers;
pub mod health;
pub mod memberships;
pub mod middleware;
pub mod panel;
pub mod vouchers;
