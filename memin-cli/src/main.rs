// Copyright (c) The memin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::Parser;
use color_eyre::Result;
use memin_cli::MeminApp;
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let app = MeminApp::parse();
    app.exec()
}
