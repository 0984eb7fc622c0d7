// SPDX-License-Identifier: Apache-2.0

//! Host-resident log collection agent.
//!
//! Files are tailed by inputs, split into records, wrapped as messages and
//! pushed through a bounded buffer to a router that fans them out to
//! outputs.

pub mod bounded_channel;
pub mod init;
pub mod inputs;
pub mod message;
pub mod outputs;
pub mod pipeline;
