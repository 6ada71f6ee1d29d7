#[macro_use]
extern crate rocket;

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod common;
pub mod config;
pub mod orchestration;
pub mod pipeline;
pub mod server;
pub mod utils;
