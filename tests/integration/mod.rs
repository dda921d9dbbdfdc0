//! Integration tests for the strata configuration resolution engine

mod test_utils;

mod integrity_report;
mod overlap_detection;
mod progress_events;
mod reference_resolution;
mod settings_integration;
mod writeback_roundtrip;
