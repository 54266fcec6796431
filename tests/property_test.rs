// tests/property_test.rs

//! Property-based tests for the control and fast-reload subsystem.

#[path = "integration/test_helpers.rs"]
mod test_helpers;

mod property {
    pub mod cache_test;
    pub mod capacity_test;
    pub mod config_test;
}
