pub mod auth;
pub mod children;
pub mod devices;
pub mod family;
pub mod health;
pub mod link_requests;
pub mod metrics;
pub mod parents;
pub mod websocket;
