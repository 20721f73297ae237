// Copyright (c) The memin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser};
use color_eyre::{eyre::WrapErr, Result};
use memin::{
    cnf::{Encoding, VarisatOracle},
    covering::check_covers,
    machine::{kiss, Machine, ResetPolicy},
    minimize_with, MinimizeOptions,
};
use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write},
    process::ExitCode,
};
use tracing::{debug, level_filters::LevelFilter};

#[derive(Debug, Parser)]
#[clap(name = "memin", version, about)]
pub struct MeminApp {
    #[clap(subcommand)]
    command: MeminCommand,
}

#[derive(Debug, Parser)]
pub enum MeminCommand {
    /// Minimize the machine in a transition table.
    Minimize {
        #[clap(flatten)]
        input: InputOpts,

        /// Do not pin the pairwise incompatible states in the encoding
        #[clap(long)]
        no_anchors: bool,

        /// Do not use the pairwise incompatible states as a lower bound (implies --no-anchors)
        #[clap(long)]
        no_lower_bound: bool,

        /// Diagnostic output level, 0 to 9
        #[clap(long, short, default_value_t = 0, parse(try_from_str = parse_verbosity))]
        verbosity: u8,

        /// Write the minimized table here instead of stdout
        #[clap(long, short)]
        output: Option<Utf8PathBuf>,

        /// Write the CNF of each trial to this directory
        #[clap(long, value_name = "DIR")]
        dump_dimacs: Option<Utf8PathBuf>,

        /// Transition table to minimize
        path: Utf8PathBuf,
    },
    /// Check that the first machine covers the behavior of the second.
    CheckCover {
        #[clap(flatten)]
        input: InputOpts,

        /// The covering machine
        first: Utf8PathBuf,

        /// The covered machine
        second: Utf8PathBuf,
    },
}

#[derive(Debug, Args)]
pub struct InputOpts {
    /// Without a reset directive, any state may serve as reset
    #[clap(long, short = 'r')]
    any_reset: bool,
}

impl InputOpts {
    fn policy(&self) -> ResetPolicy {
        if self.any_reset {
            ResetPolicy::Any
        } else {
            ResetPolicy::FirstState
        }
    }

    fn read(&self, path: &Utf8Path) -> Result<Machine> {
        let file = File::open(path).wrap_err_with(|| format!("failed to open {}", path))?;
        let machine = kiss::parse(BufReader::new(file), self.policy())
            .wrap_err_with(|| format!("failed to parse {}", path))?;
        debug!(
            %path,
            states = machine.state_count(),
            transitions = machine.transition_count(),
            "read machine"
        );
        Ok(machine)
    }
}

impl MeminApp {
    pub fn exec(self) -> Result<ExitCode> {
        self.command.exec()
    }
}

impl MeminCommand {
    pub fn exec(self) -> Result<ExitCode> {
        match self {
            Self::Minimize {
                input,
                no_anchors,
                no_lower_bound,
                verbosity,
                output,
                dump_dimacs,
                path,
            } => {
                init_logging(verbosity);
                let machine = input.read(&path)?;
                let options = MinimizeOptions {
                    anchors_in_encoding: !(no_anchors || no_lower_bound),
                    lower_bound: !no_lower_bound,
                };

                if let Some(dir) = &dump_dimacs {
                    fs::create_dir_all(dir)
                        .wrap_err_with(|| format!("failed to create {}", dir))?;
                }
                let mut dump_error = None;
                let result = minimize_with(&machine, &options, VarisatOracle::new(), |encoding| {
                    if dump_error.is_none() {
                        if let Some(dir) = &dump_dimacs {
                            dump_error = dump_encoding(dir, encoding).err();
                        }
                    }
                });
                if let Some(err) = dump_error {
                    return Err(err);
                }
                let result = result?;

                let mut table = Vec::new();
                kiss::write(&mut table, &result.quotient.to_machine())?;
                match &output {
                    Some(output) => {
                        fs::write(output, &table)
                            .wrap_err_with(|| format!("failed to write {}", output))?;
                    }
                    None => io::stdout().lock().write_all(&table)?,
                }
                eprintln!("{}", result.class_count());
                Ok(ExitCode::SUCCESS)
            }
            Self::CheckCover {
                input,
                first,
                second,
            } => {
                init_logging(0);
                let first = input.read(&first)?;
                let second = input.read(&second)?;
                match check_covers(&first, &second) {
                    Ok(()) => {
                        println!("True");
                        Ok(ExitCode::SUCCESS)
                    }
                    Err(err) => {
                        println!("False, {}", err);
                        Ok(ExitCode::FAILURE)
                    }
                }
            }
        }
    }
}

fn parse_verbosity(s: &str) -> Result<u8, String> {
    match s.parse::<u8>() {
        Ok(level) if level <= 9 => Ok(level),
        _ => Err(format!("expected a level between 0 and 9, found {:?}", s)),
    }
}

fn verbosity_filter(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn init_logging(verbosity: u8) {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(verbosity_filter(verbosity))
        .init();
}

fn dump_encoding(dir: &Utf8Path, encoding: &Encoding) -> Result<()> {
    let path = dir.join(format!("k{}.cnf", encoding.classes()));
    let file = File::create(&path).wrap_err_with(|| format!("failed to create {}", path))?;
    let mut writer = BufWriter::new(file);
    encoding.cnf().write_dimacs(&mut writer)?;
    writer.flush()?;
    debug!(%path, "wrote CNF");
    Ok(())
}
