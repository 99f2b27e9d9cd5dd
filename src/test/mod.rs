//! Backends used by the unit tests.


pub use backends::*;
