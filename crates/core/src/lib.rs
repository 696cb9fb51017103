pub mod combiner;
pub mod config;
pub mod error;
pub mod queue;
pub mod seed;
pub mod work;

pub use combiner::{Combiner, Convolution};
pub use config::RunConfig;
pub use error::CoreError;
pub use queue::WorkQueue;
pub use work::{Coefficient, WorkItem};
