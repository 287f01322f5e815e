pub mod config;
pub mod dynamics;
pub mod gnc;
pub mod io;
pub mod logger;
pub mod metrics;
pub mod path;
pub mod sim;
