//! Persistence layer: schema, models, connection pooling and query builders.

pub mod db;
pub mod error;
pub mod model;
