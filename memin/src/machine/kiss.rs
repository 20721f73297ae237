// Copyright (c) The memin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reading and writing transition tables in the KISS format.
//!
//! ```text
//! .i 2
//! .o 1
//! .r idle
//! 0- idle idle 0
//! 1- idle busy -
//! -- busy idle 1
//! .e
//! ```

use super::{Machine, MachineBuilder, ResetPolicy};
use crate::errors::ParseError;
use std::io::{self, BufRead, Write};
use tracing::{debug, warn};

/// Reads a transition table.
pub fn parse(reader: impl BufRead, policy: ResetPolicy) -> Result<Machine, ParseError> {
    let mut builder = MachineBuilder::new(policy);
    let mut declared_states = None;

    for (ix, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = ix + 1;
        let mut fields = line.split_whitespace();
        let first = match fields.next() {
            Some(first) if !first.starts_with('#') => first,
            _ => continue,
        };

        if let Some(directive) = first.strip_prefix('.') {
            let arg = fields.next();
            match directive {
                "e" | "end" => break,
                "i" => {
                    builder
                        .input_len(number(line_no, directive, arg)?)
                        .map_err(|source| ParseError::Directive {
                            line: line_no,
                            source,
                        })?;
                }
                "o" => {
                    builder
                        .output_len(number(line_no, directive, arg)?)
                        .map_err(|source| ParseError::Directive {
                            line: line_no,
                            source,
                        })?;
                }
                "p" => {
                    number(line_no, directive, arg)?;
                }
                "s" => declared_states = Some(number(line_no, directive, arg)?),
                "r" => {
                    let name = arg.ok_or_else(|| ParseError::Syntax {
                        line: line_no,
                        message: "missing state name after .r".to_owned(),
                    })?;
                    builder.reset_state(name);
                }
                other => debug!(line = line_no, directive = other, "ignoring directive"),
            }
            continue;
        }

        let (from, to) = match (fields.next(), fields.next()) {
            (Some(from), Some(to)) => (from, to),
            _ => {
                return Err(ParseError::Syntax {
                    line: line_no,
                    message: format!("expected `<input> <from> <to> <output>`, found {:?}", line),
                })
            }
        };
        let output = fields.next().unwrap_or("");
        if let Some(extra) = fields.next() {
            return Err(ParseError::Syntax {
                line: line_no,
                message: format!("unexpected trailing field {:?}", extra),
            });
        }
        builder
            .add_transition(first, from, to, output)
            .map_err(|source| ParseError::Transition {
                line: line_no,
                source,
            })?;
    }

    if let Some(declared) = declared_states {
        if declared != builder.state_count() {
            warn!(
                declared,
                actual = builder.state_count(),
                "state count directive does not match the table"
            );
        }
    }
    Ok(builder.build()?)
}

pub fn parse_str(text: &str, policy: ResetPolicy) -> Result<Machine, ParseError> {
    parse(text.as_bytes(), policy)
}

fn number(line: usize, directive: &str, arg: Option<&str>) -> Result<usize, ParseError> {
    arg.and_then(|arg| arg.parse().ok())
        .ok_or_else(|| ParseError::Syntax {
            line,
            message: format!("expected a number after .{}", directive),
        })
}

/// Writes `machine` as a transition table.
pub fn write(mut writer: impl Write, machine: &Machine) -> io::Result<()> {
    writeln!(writer, ".i {}", machine.input_len())?;
    writeln!(writer, ".o {}", machine.output_len())?;
    writeln!(writer, ".p {}", machine.transition_count())?;
    writeln!(writer, ".s {}", machine.state_count())?;
    if let Some(reset) = machine.reset() {
        writeln!(writer, ".r {}", machine.state(reset).name())?;
    }
    for state in machine.states() {
        for transition in state.transitions() {
            writeln!(
                writer,
                "{} {} {} {}",
                machine.pattern(transition.input),
                state.name(),
                machine.state(transition.next).name(),
                machine.pattern(transition.output),
            )?;
        }
    }
    writeln!(writer, ".e")?;
    Ok(())
}
