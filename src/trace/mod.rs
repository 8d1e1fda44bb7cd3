//! Action traces and the adapter that fetches them from the algorithm backend.

pub mod model;
pub mod transport;
