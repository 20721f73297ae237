// Copyright (c) The memin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

mod command;

pub use command::*;
