pub extern crate nalgebra as na;

pub mod catalog;
pub mod collections;
pub mod config;
pub mod coordinates;
pub mod local_time;
pub mod lookup;
pub mod pass_monitor;
pub mod pass_predictor;
pub mod propagator;
pub mod sampler;
pub mod source;
pub mod units;
pub mod visibility;
