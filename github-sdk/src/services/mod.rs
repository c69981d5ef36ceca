//! Endpoint groups of the GitHub REST API
//!
//! Each module extends `GitHubClient` with the typed calls of one API area.

pub mod common;

pub mod actions;
pub mod issues;
pub mod pulls;
pub mod repos;
