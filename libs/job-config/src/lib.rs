//! # cloudjob-config
//!
//! Job configuration records for the cloud scheduler.
//!
//! ## Design Principles
//!
//! - A record is keyed by its job name, which is also the last segment of the
//!   node path the record is stored under
//! - Decoding always validates; a record that decoded is a valid record
//! - Only the fields the scheduler inspects are interpreted, the rest are
//!   carried through untouched
//!
//! ## Encoding
//!
//! Records are stored as JSON with camelCase keys:
//!
//! ```json
//! {
//!   "jobName": "billing-sync",
//!   "cron": "0/30 * * * * ?",
//!   "jobExecutionType": "TRANSIENT",
//!   "shardingTotalCount": 3,
//!   "cpuCount": 0.5,
//!   "memoryMB": 256.0,
//!   "misfire": true
//! }
//! ```

mod codec;
mod error;
mod types;

pub use codec::{decode, encode};
pub use error::DecodeError;
pub use types::*;
