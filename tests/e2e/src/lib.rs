//! End-to-end test support for mnema.
//!
//! The harness owns isolated temporary databases; fixtures build card
//! inputs and canned oracle implementations shared across the journey and
//! property suites.
