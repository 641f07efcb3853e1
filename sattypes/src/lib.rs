extern crate nalgebra as na;

pub mod look;
pub mod pass;
pub mod prelude;
pub mod station;
pub mod tle;
pub mod tracked;
