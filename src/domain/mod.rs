// Domain layer: core models and ports (interfaces) for the store and auth backends.

pub mod model;
pub mod ports;
