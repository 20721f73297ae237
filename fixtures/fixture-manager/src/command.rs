// Copyright (c) The memin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::Parser;
use color_eyre::Result;
use fixture_details::AllFixtures;

#[derive(Debug, Parser)]
pub struct FixtureManagerApp {
    #[clap(subcommand)]
    command: FixtureManagerCommand,
}

#[derive(Debug, Parser)]
pub enum FixtureManagerCommand {
    /// Regenerate the random transition tables.
    GenerateInputs {
        #[clap(long, short, default_value_t = 32)]
        count: usize,
    },
    /// Minimize every fixture and record its class count.
    GenerateOutputs,
}

impl FixtureManagerApp {
    pub fn exec(self) -> Result<()> {
        self.command.exec()
    }
}

impl FixtureManagerCommand {
    pub fn exec(self) -> Result<()> {
        match self {
            Self::GenerateInputs { count } => AllFixtures::generate_inputs(count),
            Self::GenerateOutputs => AllFixtures::generate_outputs(),
        }
    }
}
