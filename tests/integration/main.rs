//! Integration test driver for `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file exercising the controller against the
//! scripted mock plant. Everything here runs on the host with no real
//! plant attached.

mod scenario_tests;
