//! Unit tests for the control loop.

mod control_tests;
