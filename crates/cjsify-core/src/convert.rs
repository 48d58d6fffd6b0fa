// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Conversion driver.
//!
//! A run converts every configured group in order. Each group goes through
//! entry resolution, graph construction, tree-shaking and rendering; its
//! output is written only once all of that succeeded.

use crate::codegen::render_graph;
use crate::config::{Config, GroupConfig};
use crate::entries::resolve_entries;
use crate::error::Result;
use crate::external::ExternalClassifier;
use crate::graph::GraphBuilder;
use crate::resolver::{canonical, NodeSelfResolver, PackageJson, SelfResolver};
use crate::shake::shake;
use crate::transform::{
    decide_self_reference, CreateRequireRemoval, SelfReferencePatch, TransformPipeline,
};
use crate::writer::{plan_outputs, OutputDescriptor, OutputWriter};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Options that do not change what is produced.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Convert and report without writing files
    pub dry_run: bool,
    /// No progress lines on stdout
    pub quiet: bool,
}

/// Outcome of one group.
#[derive(Debug, Clone)]
pub struct GroupReport {
    /// Output directory
    pub output: PathBuf,
    /// Files produced (or that would have been, in a dry run)
    pub files: Vec<PathBuf>,
    /// Modules in the graph, included or not
    pub modules: usize,
}

/// Converts the groups of a [`Config`].
pub struct Converter {
    config: Config,
    options: RunOptions,
    package_name: Option<String>,
    self_reference: bool,
    classifier: ExternalClassifier,
}

impl Converter {
    /// Converter resolving the package against the real file system.
    pub fn new(config: Config, options: RunOptions) -> Result<Self> {
        let package = config.resolve(&config.package);
        let root = package
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| config.base_dir.clone());
        Self::with_resolver(config, options, &NodeSelfResolver::new(root))
    }

    /// Converter deciding the self-reference patch with `resolver`.
    pub fn with_resolver(
        config: Config,
        options: RunOptions,
        resolver: &dyn SelfResolver,
    ) -> Result<Self> {
        config.validate()?;
        let package_name = read_package_name(&config.resolve(&config.package))?;
        let self_reference =
            decide_self_reference(config.self_reference, package_name.as_deref(), resolver);

        let classifier = ExternalClassifier::new(&config.external, package_name.as_deref())?;
        Ok(Self {
            config,
            options,
            package_name,
            self_reference,
            classifier,
        })
    }

    /// Is the self-reference patch active for this run?
    pub fn self_reference(&self) -> bool {
        self.self_reference
    }

    /// Package name read from the package metadata, if any
    pub fn package_name(&self) -> Option<&str> {
        self.package_name.as_deref()
    }

    /// Package name the tests are patched for, when the patch is active.
    fn patched_name(&self) -> Option<&str> {
        self.package_name.as_deref().filter(|_| self.self_reference)
    }

    /// Convert every group in order. The first failure stops the run.
    pub async fn run(&mut self) -> Result<Vec<GroupReport>> {
        let groups = self.config.groups.clone();
        let mut reports = Vec::with_capacity(groups.len());
        for group in &groups {
            reports.push(self.convert_group(group).await?);
        }
        Ok(reports)
    }

    /// Convert one group and write its output.
    pub async fn convert_group(&mut self, group: &GroupConfig) -> Result<GroupReport> {
        let started = Instant::now();
        let output = self.config.resolve(&group.output);
        if !self.options.quiet {
            println!();
            println!(
                "{} {}",
                "Convert ESM to CommonJS".bold(),
                format!("(output: {})", output.display()).dimmed()
            );
            if let Some(name) = self.patched_name() {
                println!(
                    "{}",
                    format!("Fixing CommonJS tests by replacing \"{name}\" for a relative paths")
                        .yellow()
                );
            }
        }

        let (writer, modules) = self.build_group(group)?;
        let files = if self.options.dry_run {
            let files: Vec<PathBuf> = writer.descriptors().iter().map(|d| d.path.clone()).collect();
            for file in &files {
                info!(path = %file.display(), "Would write");
            }
            files
        } else {
            writer.commit().await?
        };

        if !self.options.quiet {
            println!(
                "{}",
                format!("Done in {}ms", started.elapsed().as_millis()).green()
            );
        }
        Ok(GroupReport {
            output,
            files,
            modules,
        })
    }

    /// Everything short of writing: returns the queued output and the
    /// number of modules in the graph.
    pub fn build_group(&mut self, group: &GroupConfig) -> Result<(OutputWriter, usize)> {
        let base = self.config.base_dir.clone();
        let entries = resolve_entries(&group.entry, &group.dirs, &base)?;

        let mut pipeline = TransformPipeline::new().with(CreateRequireRemoval::new()?);
        if let (Some(name), Some(target)) = (self.patched_name(), self.config.package_entry()) {
            pipeline = pipeline.with(SelfReferencePatch::new(
                name,
                &self.config.tests_pattern,
                canonical(&target),
            )?);
        }
        debug!(passes = pipeline.len(), entries = entries.len(), "Converting group");

        let graph = GraphBuilder::new(&mut self.classifier, &pipeline).build(&entries)?;
        let shaken = shake(&graph, self.config.treeshake)?;

        let included: Vec<_> = shaken
            .included()
            .map(|m| (m, graph.modules[m].id.as_path()))
            .collect();
        let out_dir = self.config.resolve(&group.output);
        let mut outputs = vec![None; graph.len()];
        for (m, path) in plan_outputs(&included, &out_dir, &self.config.extension) {
            outputs[m] = Some(path);
        }

        let mut writer = OutputWriter::new();
        for rendered in render_graph(&graph, &shaken, &outputs) {
            let Some(path) = outputs[rendered.module].take() else {
                continue;
            };
            writer.push(OutputDescriptor {
                path,
                contents: rendered.code,
                export_mode: rendered.mode,
                module: graph.modules[rendered.module].id.clone(),
            });
        }
        debug!(
            modules = graph.len(),
            outputs = writer.len(),
            "Group rendered"
        );
        Ok((writer, graph.len()))
    }
}

/// Name field of the package metadata; a missing file means no name.
fn read_package_name(path: &Path) -> Result<Option<String>> {
    if !path.is_file() {
        debug!(path = %path.display(), "No package metadata");
        return Ok(None);
    }
    Ok(PackageJson::read(path)?.name)
}
