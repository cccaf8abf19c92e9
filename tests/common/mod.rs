#![allow(dead_code)]

pub mod backends;
pub mod fixtures;

pub use backends::*;
pub use fixtures::*;
