pub mod camera;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod description;
pub mod error;
pub mod executor;
pub mod feedback;
pub mod hamming;
pub mod matcher;
pub mod metrics;
pub mod storage;
pub mod task;

pub use camera::{Camera, Capture};
pub use catalog::{Catalog, Match, OrbSimilarity, Similarity};
pub use config::{MatchingOptions, Opts};
pub use description::{Description, DescriptorSet, Frame, KeyPoint};
pub use error::{Error, Result};
pub use executor::{Lighthouse, Outcome};
pub use feedback::Feedback;
pub use matcher::{Extractor, ImageMatcher};
pub use storage::{Asset, DataDir};
pub use task::{Task, TaskCell, TaskToken};
