//! Host setup engine for a stow-based dotfiles repository.
//!
//! One binary drives the install of a host described under `hosts/<host>/`:
//! packages through `pacman` and `paru`, dotfiles through `stow`, the
//! `etc/` overlay through guarded writes with timestamped backups, systemd
//! units, and one-off migration scripts. Completed steps are remembered as
//! marker files so a re-run only does what is left.
//!
//! The public API is organised into layers:
//!
//! - **[`config`]**: settings, host directories and traits
//! - **[`state`]** and **[`sysmod`]**: step markers and guarded system writes
//! - **[`resources`]**: idempotent `check + apply` primitives
//! - **[`tasks`]**: named units of work wired to resources and steps
//! - **[`commands`]**: top-level subcommand orchestration
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod cooler;
pub mod error;
pub mod exec;
pub mod logging;
pub mod platform;
pub mod resources;
pub mod state;
pub mod sysmod;
pub mod tasks;
