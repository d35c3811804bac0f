pub mod config;
pub mod discard;
pub mod graph;
pub mod run;
pub mod status;
