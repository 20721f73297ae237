// Copyright (c) The memin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{details::FixtureDetails, value_generator::ValueGenerator};
use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::{eyre::WrapErr, Result};
use memin::{machine::kiss, proptest_helpers::machine_strategy};
use once_cell::sync::Lazy;
use std::{
    fs,
    io::{BufWriter, Write},
};

pub struct AllFixtures {
    dir: Utf8PathBuf,
    fixtures: Vec<FixtureDetails>,
}

static ALL_FIXTURES_STATIC: Lazy<AllFixtures> = Lazy::new(AllFixtures::init);

const RANDOM_PREFIX: &str = "random-";

impl AllFixtures {
    pub fn get() -> &'static Self {
        &*ALL_FIXTURES_STATIC
    }

    fn init() -> Self {
        let dir = Self::data_dir();
        let fixtures = Self::scan(&dir).expect("fixture directory is readable");
        Self { dir, fixtures }
    }

    fn data_dir() -> Utf8PathBuf {
        let dir: Utf8PathBuf = env!("CARGO_MANIFEST_DIR").into();
        dir.parent().unwrap().join("data")
    }

    fn scan(dir: &Utf8Path) -> Result<Vec<FixtureDetails>> {
        let mut fixtures = Vec::new();
        for entry in fs::read_dir(dir).wrap_err_with(|| format!("failed to read {}", dir))? {
            let path = Utf8PathBuf::try_from(entry?.path())?;
            if path.extension() == Some("kiss") {
                fixtures.push(FixtureDetails::new(path)?);
            }
        }
        fixtures.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(fixtures)
    }

    #[inline]
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    pub fn fixtures(&self) -> &[FixtureDetails] {
        &self.fixtures
    }

    /// Writes `count` random transition tables into the fixture directory, replacing any
    /// previously generated ones.
    pub fn generate_inputs(count: usize) -> Result<()> {
        let dir = Self::data_dir();
        for fixture in Self::scan(&dir)? {
            if fixture.name().starts_with(RANDOM_PREFIX) {
                fs::remove_file(fixture.input_path())?;
                let classes_path = fixture.classes_path();
                if classes_path.exists() {
                    fs::remove_file(classes_path)?;
                }
            }
        }

        let mut value_gen = ValueGenerator::from_seed("memin-random");
        for ix in 0..count {
            let mut gen = value_gen.partial_clone();
            let machine = gen.generate(machine_strategy(8, 3, 2));
            let path = dir.join(format!("{}{:03}.kiss", RANDOM_PREFIX, ix));
            let file = fs::File::create(&path)
                .wrap_err_with(|| format!("failed to create {}", path))?;
            let mut writer = BufWriter::new(file);
            kiss::write(&mut writer, &machine)?;
            writer.flush()?;
        }

        println!("generated {} inputs in {}", count, dir);
        Ok(())
    }

    /// Minimizes every fixture and records its class count.
    pub fn generate_outputs() -> Result<()> {
        let dir = Self::data_dir();
        for fixture in Self::scan(&dir)? {
            let classes = fixture.minimize()?.class_count();
            fixture.write_expected_classes(classes)?;
            println!("{}: {} classes", fixture.name(), classes);
        }
        Ok(())
    }
}
