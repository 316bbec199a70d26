//! Scripts for deploying, upgrading, calling and verifying contracts
//! against an EVM chain.

pub mod cli;
mod commands;
pub mod constants;
pub mod errors;
pub mod provider;
mod solidity;
pub mod utils;
