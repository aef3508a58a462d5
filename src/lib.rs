pub mod charts;
pub mod config;
pub mod dashboard;
pub mod filters;
pub mod gateway;
pub mod js;
pub mod logging;
pub mod map;
pub mod render;
pub mod seq;
