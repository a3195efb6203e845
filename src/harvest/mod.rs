//! Harvest module - post extraction and run orchestration.
//!
//! - **Comments**: recursive comment-forest conversion via [`extract_comments`]
//! - **Posts**: one submission into one record via [`extract_post_details`]
//! - **Pipeline**: the full run via [`pipeline::HarvestPipeline`]

pub mod comments;
pub mod pipeline;
pub mod post;

pub use comments::extract_comments;
pub use pipeline::{HarvestError, HarvestPipeline, HarvestReport, HarvestStats};
pub use post::{extract_post_details, format_utc};
