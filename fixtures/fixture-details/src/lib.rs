// Copyright (c) The memin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Checked-in transition tables with their known minimal class counts.

mod all;
mod details;
mod value_generator;

pub use all::*;
pub use details::*;
pub use value_generator::*;
