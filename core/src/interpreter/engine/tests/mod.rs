//! Tests for the engine
//!
//! Organized by feature area. Scripts are built with the node builders in
//! `helpers`; the comment at the top of each test shows the script in
//! surface syntax.

pub mod helpers;

mod basic_tests;
mod return_tests;
