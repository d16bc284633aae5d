//! Capability traits and registries.

pub mod capabilities;

pub use capabilities::{
    Feature, ProviderCapabilities, capabilities, check_request, warn_if_unsupported,
};
