//! Binary-side tests: argument parsing and whole-frame pipelines driven
//! through the public library API with in-memory collaborators.

mod pipeline_tests;
