// Copyright (c) The memin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::Parser;
use color_eyre::Result;
use fixture_manager::FixtureManagerApp;

fn main() -> Result<()> {
    color_eyre::install()?;
    let app = FixtureManagerApp::parse();
    app.exec()
}
