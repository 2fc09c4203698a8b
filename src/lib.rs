pub mod analysis;
pub mod api;
pub mod browser;
pub mod config;
pub mod dataset;
pub mod error;
pub mod inference;
pub mod navigator;
pub mod normalize;
pub mod pipeline;
