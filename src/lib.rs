//! mesh-commander: keyword-triggered command dispatcher for mesh radio networks.
//!
//! Inbound text messages arriving on one channel slot are matched against a
//! keyword table. A match runs the bound executable under a hard time limit
//! and its output is sent back to the mesh in transport-sized chunks.
//!
//! See `DESIGN.md` for architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod executor;
pub mod logging;

pub mod dispatch;
pub mod mesh;
pub mod reply;
