//! lvsr: command-line front end for the lvsr-bricks transducer operators.

pub mod cli;
pub mod config;
pub mod next;
pub mod score;
