/// Static pipeline definitions: measures, resources, cluster constants
pub mod constants;

/// Task graph assembly
mod builder;
pub use builder::{GraphBuilder, PipelineRun};

/// Task templates for the five pipeline stages
mod templates;
pub use templates::Templates;
