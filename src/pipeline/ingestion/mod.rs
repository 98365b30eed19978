// Ingestion helpers shared by the network-facing stages

pub mod rate_limiter;

pub use rate_limiter::{Limits, RateLimiter, RequestPermit};
