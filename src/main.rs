// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! cjsify - ES module to CommonJS converter
//!
//! Reads `cjsify.toml` (or the flags given) and converts each group in turn.

mod cli;

use clap::Parser;
use cjsify_core::Converter;
use owo_colors::OwoColorize;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "cjsify=debug,cjsify_core=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &cli::Cli) -> anyhow::Result<()> {
    let config = cli.config()?;
    let mut converter = Converter::new(config, cli.options())?;
    let reports = converter.run().await?;

    for report in &reports {
        tracing::info!(
            output = %report.output.display(),
            files = report.files.len(),
            modules = report.modules,
            "Group converted"
        );
    }
    if cli.dry_run && !cli.quiet {
        for file in reports.iter().flat_map(|r| &r.files) {
            println!("  {} {}", "would write".dimmed(), file.display());
        }
    }
    Ok(())
}
