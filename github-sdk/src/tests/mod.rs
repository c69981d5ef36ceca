//! Unit tests for the GitHub SDK
//!
//! This module contains tests for various components of the SDK.

pub mod client_mock_tests;
pub mod error_tests;
