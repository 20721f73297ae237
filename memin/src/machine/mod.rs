// Copyright (c) The memin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Incompletely specified Mealy machines and their transition-table format.

mod builder;
mod caches;
pub mod kiss;
mod machine_impl;

pub use builder::*;
pub use machine_impl::*;
