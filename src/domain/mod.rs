pub mod errors;
pub mod market;
pub mod ports;
pub mod repositories;
pub mod signal;
