#![allow(clippy::new_without_default)]

#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;

pub mod config;
pub mod event_sink;
pub mod geo_utils;
pub mod geofence;
pub mod location;
pub mod logs;
pub mod navigation;
pub mod recorder;
pub mod routing;
pub mod trip;
