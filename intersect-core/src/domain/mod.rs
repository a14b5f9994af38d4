//! Domain types for the Intersect CI pipeline

pub mod credentials;
pub mod environment;
pub mod image;
pub mod publish;
pub mod service;
pub mod source;

pub use credentials::{RegistryCredentials, Secret};
pub use environment::{ExecEnvironment, ExecStep, Mount};
pub use image::{BuildArg, Image, ImageRecipe, Provenance};
pub use publish::{
    PublishMode, PublishOutcome, TagSet, image_reference, is_default_registry, validate_tag,
};
pub use service::Service;
pub use source::SourceTree;
