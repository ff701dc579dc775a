//! Test suites for editing sessions.

mod support;
