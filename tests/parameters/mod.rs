//! Integration tests for the parameter system
//!
//! These tests verify that the parameter system behaves correctly in various scenarios.
