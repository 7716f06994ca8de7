// Domain layer: table contracts, key scheme, datasets and ports (interfaces).

pub mod keys;
pub mod model;
pub mod ports;
pub mod schema;
