// src/drivers/mod.rs
pub mod buffer;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod plot;
pub mod source;
pub mod stats;
pub use buffer::SessionBuffer;
pub use error::MonitorError;
pub use http::{CsvLogSource, Endpoint, LiveJsonSource};
pub use pipeline::SamplePipeline;
pub use plot::{render_chart_png, PlotStyle};
#[cfg(test)]
pub use source::ManualSource;
pub use source::{SampleSource, SimulatedSource};
pub use stats::{format_elapsed, Quality};
