//! Cloud job scheduler control plane library.
//!
//! This crate primarily ships a `cloud-scheduler` binary, but we expose a
//! library surface to enable integration testing and reuse.

pub mod config;
pub mod error;
pub mod job_store;
pub mod listener;
pub mod producer;
pub mod ready;
pub mod state;
