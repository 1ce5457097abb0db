pub mod calendar;
pub mod cleaning;
pub mod config;
pub mod engine;
pub mod limits;
pub mod model;
pub mod observability;
pub mod persist;
pub mod portfolio;
pub mod timeline;
