// Copyright (c) The memin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use memin::{
    cnf::VarisatOracle,
    machine::{kiss, Machine, ResetPolicy},
    minimize, Minimization, MinimizeOptions,
};
use std::{fs, io::BufReader};

/// One transition table in the fixture directory.
///
/// The table lives in `<name>.kiss`; its minimal class count, once recorded, in
/// `<name>.classes`.
#[derive(Clone, Debug)]
pub struct FixtureDetails {
    name: String,
    input_path: Utf8PathBuf,
}

impl FixtureDetails {
    pub fn new(input_path: Utf8PathBuf) -> Result<Self> {
        let name = input_path
            .file_stem()
            .ok_or_else(|| eyre!("fixture path {} has no file name", input_path))?
            .to_owned();
        Ok(Self { name, input_path })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn input_path(&self) -> &Utf8Path {
        &self.input_path
    }

    pub fn classes_path(&self) -> Utf8PathBuf {
        self.input_path.with_extension("classes")
    }

    pub fn load(&self) -> Result<Machine> {
        let file = fs::File::open(&self.input_path)
            .wrap_err_with(|| format!("failed to open {}", self.input_path))?;
        let machine = kiss::parse(BufReader::new(file), ResetPolicy::FirstState)
            .wrap_err_with(|| format!("failed to parse {}", self.input_path))?;
        Ok(machine)
    }

    pub fn minimize(&self) -> Result<Minimization> {
        let machine = self.load()?;
        let result = minimize(&machine, &MinimizeOptions::default(), VarisatOracle::new())
            .wrap_err_with(|| format!("failed to minimize {}", self.name))?;
        Ok(result)
    }

    /// The recorded class count, or `None` if outputs have not been generated yet.
    pub fn expected_classes(&self) -> Result<Option<usize>> {
        let path = self.classes_path();
        if !path.exists() {
            return Ok(None);
        }
        let text =
            fs::read_to_string(&path).wrap_err_with(|| format!("failed to read {}", path))?;
        let classes = text
            .trim()
            .parse()
            .wrap_err_with(|| format!("invalid class count in {}", path))?;
        Ok(Some(classes))
    }

    pub fn write_expected_classes(&self, classes: usize) -> Result<()> {
        let path = self.classes_path();
        fs::write(&path, format!("{}\n", classes))
            .wrap_err_with(|| format!("failed to write {}", path))
    }
}
