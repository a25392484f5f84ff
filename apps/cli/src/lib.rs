//! Postman collection → curl script generator for FHIR setup requests.
//!
//! XML request bodies are converted to FHIR JSON with `ferrum-xmljson`,
//! Patient extensions are swapped for a configured set, and every resource
//! missing a narrative gets a generated one.

pub mod collection;
pub mod config;
pub mod generate;
pub mod script;

pub use crate::config::{Args, Config};
pub use generate::{Generator, PreparedBody, Summary};
