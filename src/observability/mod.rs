//! Observability: subscriber setup and request tracing helpers.

pub mod tracing;

pub use self::tracing::{
    OutputFormat, ProviderTracer, TracingConfig, init_tracing, mask_sensitive_value,
};
