//! Scripts for deploying, upgrading and migrating upgradeable proxy contracts.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod artifacts;
pub mod chain;
pub mod cli;
mod commands;
pub mod config;
pub mod confirmation;
pub mod constants;
pub mod errors;
pub mod migration;
pub mod rpc;
mod solidity;
pub mod types;
pub mod utils;
pub mod verify;
