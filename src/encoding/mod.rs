//! Feature encoding: candidate records to fixed-width numeric vectors.
//!
//! Layout of an encoded vector is `[numeric | categorical | text]`, each
//! block ordered by the configured field list.

pub mod categorical;
pub mod encoder;
pub mod numeric;
pub mod schema;
pub mod text;

pub use encoder::FeatureEncoder;
pub use schema::{EncodingSchema, FeatureOrigin, SCHEMA_FORMAT_VERSION, SchemaLayout};
