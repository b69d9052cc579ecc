// Adapters layer: concrete stores behind the domain ports.

pub mod memory_store;
pub mod rest_store;
