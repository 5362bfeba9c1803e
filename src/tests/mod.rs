//! Cross-module integration tests for the compilation pipeline.

mod helpers;
