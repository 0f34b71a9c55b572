mod build;

pub use build::{BUILD_EXAMPLES, BuildArgs, build};
