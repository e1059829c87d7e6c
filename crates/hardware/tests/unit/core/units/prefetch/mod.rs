//! PREFETCH unit tests.

pub mod next_line;
