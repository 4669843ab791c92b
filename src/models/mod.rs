pub mod advisory;
pub mod filters;
pub mod forecast;
pub mod heatmap;

pub use advisory::*;
pub use filters::*;
pub use forecast::*;
pub use heatmap::*;
