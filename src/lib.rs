pub mod acl;
pub mod api;
pub mod cache;
pub mod config;
pub mod messages;
pub mod router;
pub mod shared;
pub mod telegram;
pub mod workflow;
