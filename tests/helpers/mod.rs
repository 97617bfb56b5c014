//! Shared test helpers.

#![allow(dead_code)]

pub mod diagnostic_helpers;
pub mod source_fixtures;
pub mod workspace;
