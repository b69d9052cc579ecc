// Domain layer: records, the contact query and the store ports.

pub mod model;
pub mod ports;
pub mod query;
