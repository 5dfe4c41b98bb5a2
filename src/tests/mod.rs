//! Cross-module tests exercising the pipeline and session flows together.

mod pipeline;
