pub mod adapters;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod reliability;
pub mod request_normalizer;
pub mod router;
pub mod types;
