pub mod factory;
pub mod memory;
pub mod notifications;
pub mod repositories;
