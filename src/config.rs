use std::{
    io::ErrorKind,
    ops::RangeInclusive,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::ensure;
use clap::Parser;
use serde::{de::DeserializeOwned, Deserialize};

use crate::mode::Mode;

/// Parser for command line arguments, these arguments can also be passed via capitalised env vars
/// of the same name.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[arg(short, long, env, value_parser = load_config::<Config>)]
    pub config: Option<Arc<Config>>,
    /// Generation mode (`random`, `real` or `names`), prompted for if not set here or in the
    /// config file.
    #[arg(short, long, env)]
    pub mode: Option<String>,
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn verbosity(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    pub fn config(&self) -> Config {
        self.config.as_deref().cloned().unwrap_or_default()
    }

    /// The mode given on the command line takes precedence over the config file. Selections are
    /// only parsed here, after logging has been set up, so invalid ones are reported.
    pub fn mode(&self) -> Option<Mode> {
        self.mode
            .as_deref()
            .or_else(|| self.config.as_ref().and_then(|c| c.mode.as_deref()))
            .map(Mode::from_selection)
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// File that generated passwords are appended to, and loaded from on startup.
    pub wordlist_file: PathBuf,
    /// Words used by the `real` mode, one per line.
    pub dictionary_file: PathBuf,
    /// Names used by the `names` mode, one per line.
    pub names_file: PathBuf,
    /// Number of workers generating passwords at the same time.
    pub concurrency: usize,
    /// Shortest password generated by the `random` mode.
    pub min_length: usize,
    /// Longest password generated by the `random` mode.
    pub max_length: usize,
    /// Generation mode, see [`Mode`]. Prompted for on stdin if not set here or on the command
    /// line.
    pub mode: Option<String>,
    /// Stop once this many new passwords have been recorded, otherwise run until interrupted.
    pub target: Option<usize>,
    /// Whether to fsync the wordlist after every appended password.
    pub sync_writes: bool,
    /// Seeds the workers' random number generators for a reproducible run.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wordlist_file: PathBuf::from("StormList.txt"),
            dictionary_file: PathBuf::from("dictionary.txt"),
            names_file: PathBuf::from("names.txt"),
            concurrency: 100,
            min_length: 12,
            max_length: 18,
            mode: None,
            target: None,
            sync_writes: false,
            seed: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.concurrency > 0, "concurrency must be at least 1");
        ensure!(self.min_length > 0, "min-length must be at least 1");
        ensure!(
            self.min_length <= self.max_length,
            "min-length ({}) must not exceed max-length ({})",
            self.min_length,
            self.max_length
        );
        ensure!(self.target != Some(0), "target must be at least 1");

        Ok(())
    }

    pub fn length(&self) -> RangeInclusive<usize> {
        self.min_length..=self.max_length
    }

    /// Resolves every relative path in the config against `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for path in [
            &mut self.wordlist_file,
            &mut self.dictionary_file,
            &mut self.names_file,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

fn load_config<T: DeserializeOwned>(path: &str) -> Result<Arc<T>, std::io::Error> {
    let file = std::fs::read_to_string(path)?;

    toml::from_str(&file)
        .map(Arc::new)
        .map_err(|e| std::io::Error::new(ErrorKind::Other, e))
}
