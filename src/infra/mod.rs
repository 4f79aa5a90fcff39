//! Adapters for the core's collaborator interfaces
pub mod gateway;
pub mod memory;
pub mod notify;
pub mod postgres;
