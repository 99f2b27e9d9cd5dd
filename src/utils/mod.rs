//! Utility functions.

mod math;

pub(crate) use math::{is_power_of_two, padding_for};
