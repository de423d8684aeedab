pub mod auth;
pub mod child;
pub mod device;
pub mod group;
pub mod link_request;
pub mod parent;
