//! Sequential batch execution of external read trimming and assembly
//! tools, with paired-file discovery, live output streaming and
//! cooperative cancellation.

pub mod cli;
pub mod command;
pub mod config;
pub mod controller;
pub mod env;
pub mod error;
pub mod io;
pub mod job;
pub mod pairing;
pub mod process;
pub mod qc;
pub mod runner;
pub mod sink;

#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;
