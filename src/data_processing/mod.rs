mod batcher;
mod corpus;
mod dataset;
mod error;
mod merge;
mod sampler;
mod split;

pub use batcher::*;
pub use corpus::*;
pub use dataset::*;
pub use error::*;
pub use merge::*;
pub use sampler::*;
pub use split::*;
