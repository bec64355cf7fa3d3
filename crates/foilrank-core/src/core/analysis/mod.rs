pub mod efficiency;
pub mod metrics;
pub mod normalize;
pub mod pressure;
pub mod regression;
pub mod scoring;
pub mod stall;
