//! Command line front end for fob-lambda.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logger;
