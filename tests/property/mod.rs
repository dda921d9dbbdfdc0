//! Property-based tests for the resolution pipeline
