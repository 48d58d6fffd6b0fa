// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Command line flags and how they override the config file.

use anyhow::{bail, Context};
use cjsify_core::config::{EntryDir, ExternalPattern, GroupConfig, CONFIG_FILE};
use cjsify_core::{Config, RunOptions, SelfReferenceMode, TreeShake};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "cjsify",
    about = "Convert ES modules to CommonJS, one output module per input module",
    version = cjsify_core::VERSION,
    author = "Pegasus Heavy Industries"
)]
pub struct Cli {
    /// Config file (defaults to ./cjsify.toml when present)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Root entry module; builds a single group from the flags
    #[arg(short = 'e', long)]
    pub entry: Option<PathBuf>,

    /// Additional entry directory, as DIR[:PATTERN]
    #[arg(short = 'd', long = "dir", value_name = "DIR[:PATTERN]")]
    pub dirs: Vec<String>,

    /// External specifier: NAME, prefix:NAME or re:REGEX
    #[arg(long = "external", value_name = "SPEC")]
    pub externals: Vec<String>,

    /// Output directory
    #[arg(short = 'o', long)]
    pub out: Option<PathBuf>,

    /// Tree-shaking level (smallest, safest, none)
    #[arg(long)]
    pub treeshake: Option<TreeShake>,

    /// Self-reference patch for tests (auto, always, never)
    #[arg(long = "self-reference")]
    pub self_reference: Option<SelfReferenceMode>,

    /// Output file extension
    #[arg(long)]
    pub extension: Option<String>,

    /// Convert without writing files
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Loads the config file and applies the flags on top.
    pub fn config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => {
                let cwd = std::env::current_dir().context("no current directory")?;
                Config::discover(&cwd).with_context(|| format!("failed to load {CONFIG_FILE}"))?
            }
        };

        if let Some(level) = self.treeshake {
            config.treeshake = level;
        }
        if let Some(mode) = self.self_reference {
            config.self_reference = mode;
        }
        if let Some(extension) = &self.extension {
            config.extension = extension.trim_start_matches('.').to_string();
        }
        if !self.externals.is_empty() {
            config
                .external
                .extend(self.externals.iter().map(|e| ExternalPattern::parse_flag(e)));
        }

        if let Some(entry) = &self.entry {
            let Some(out) = &self.out else {
                bail!("--entry requires --out");
            };
            let cwd = std::env::current_dir().context("no current directory")?;
            config.groups = vec![GroupConfig {
                entry: cwd.join(entry),
                output: cwd.join(out),
                dirs: self
                    .dirs
                    .iter()
                    .map(|d| {
                        let dir = EntryDir::parse_flag(d);
                        EntryDir {
                            dir: cwd.join(dir.dir),
                            pattern: dir.pattern,
                        }
                    })
                    .collect(),
            }];
        } else if self.out.is_some() || !self.dirs.is_empty() {
            bail!("--out and --dir need --entry");
        }

        Ok(config)
    }

    /// Run options from the flags.
    pub fn options(&self) -> RunOptions {
        RunOptions {
            dry_run: self.dry_run,
            quiet: self.quiet,
        }
    }
}
