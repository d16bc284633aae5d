//! Core abstractions shared by every backend.

pub mod provider_spec;

pub use provider_spec::{ProviderContext, ProviderSpec, build_transport_request, spec_for};
