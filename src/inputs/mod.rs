// SPDX-License-Identifier: Apache-2.0

//! Input sources that feed messages into the pipeline.

pub mod file;
