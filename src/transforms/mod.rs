//! Transform stages shared by the output generators.

pub mod normalize;
pub mod otel;
pub mod reduce;
pub mod remap;
pub mod route;

pub use reduce::{MergeStrategy, Reduce, ReduceWindow};
pub use remap::Remap;
pub use route::Route;
