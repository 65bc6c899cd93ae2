// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod calls;
pub mod cli;
pub mod cloud;
pub mod command;
pub mod config;
pub mod constants;
pub mod error;
pub mod kubernetes;
pub mod orchestrator;
pub mod output;
pub mod phases;
pub mod provisioner;
pub mod types;

#[cfg(test)]
pub mod test_utils;
