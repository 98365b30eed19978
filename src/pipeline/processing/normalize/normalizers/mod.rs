// Base trait and utilities for source-specific normalizers
pub mod base;

// Profile-driven normalizer and the built-in provider profiles
pub mod profile;
pub mod providers;

// Re-export the main components
pub use base::{NormalizerUtils, SourceNormalizer};
pub use profile::{ProfileNormalizer, ProviderProfile};
