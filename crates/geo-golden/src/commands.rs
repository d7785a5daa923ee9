//! Subcommand handlers.
//!
//! Only initialization and reporting problems are returned as errors. Test
//! failures end up in the report and the run still counts as completed.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, info, warn};

use geo_golden_core::{DatasetReader, TestDefinition, COMMAND_PLACEHOLDER};
use geo_golden_engine::{JsonDatasetReader, SnapshotOptions};
use geo_golden_runner::{Environment, Orchestrator, TestFilter};

use crate::authoring::{draft_definition, write_definition, DefinitionDraft};
use crate::cli::{RunArgs, SnapshotArgs};
use crate::tool::ProcessTool;

/// `geo-golden run`
pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    let environment = Environment::load(&args.env)
        .with_context(|| format!("cannot initialize environment {}", args.env.display()))?;
    let open_report = environment.config().open_report;

    let tool = Arc::new(ProcessTool::new(args.tool));
    let mut orchestrator = Orchestrator::new(environment, tool, Arc::new(JsonDatasetReader));
    if let Some(secs) = args.timeout {
        orchestrator = orchestrator.with_timeout(Some(Duration::from_secs(secs)));
    }

    let filter = TestFilter::from_lists(args.names.as_deref(), args.tags.as_deref());
    let outcome = orchestrator.run(&filter).await?;

    if outcome.is_empty() {
        println!("no tests executed ({filter})");
        return Ok(());
    }

    for result in &outcome.report.results {
        println!("{:<8} {}", result.status().to_string(), result.test_name);
    }
    println!("{}", outcome.report.summary());

    if let Some(files) = outcome.write_report().context("cannot write report")? {
        println!("report: {}", files.html.display());
        if open_report {
            open_in_browser(&files.html);
        }
    }
    Ok(())
}

/// `geo-golden snapshot`
pub fn snapshot(args: SnapshotArgs) -> anyhow::Result<()> {
    let dataset = JsonDatasetReader
        .open(&args.dataset)
        .with_context(|| format!("cannot open {}", args.dataset.display()))?;

    let defaults = SnapshotOptions::default();
    let options = SnapshotOptions {
        seed: args.seed,
        pixel_samples: args.pixel_samples.unwrap_or(defaults.pixel_samples),
        geo_samples: args.geo_samples.unwrap_or(defaults.geo_samples),
        metadata_samples: args.metadata_samples.unwrap_or(defaults.metadata_samples),
        statistics: !args.no_statistics,
    };
    let draft = DefinitionDraft {
        name: args.name,
        description: args.description,
        tags: args.tags.into_iter().collect(),
        command_template: args.command_template,
    };
    let definition = draft_definition(dataset.as_ref(), draft, options)?;

    match &args.output {
        Some(output) => {
            let path = write_definition(&definition, output)?;
            println!("{}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&definition)?),
    }

    if definition.command_template == COMMAND_PLACEHOLDER {
        warn!(
            "Definition '{}' has no command yet; fill in commandTemplate before running it",
            definition.name
        );
    }
    Ok(())
}

/// `geo-golden schema`
pub fn schema() -> anyhow::Result<()> {
    let schema = schemars::schema_for!(TestDefinition);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

/// Open `path` with the platform's default handler. Failures are only logged.
fn open_in_browser(path: &Path) {
    #[cfg(target_os = "macos")]
    let mut command = std::process::Command::new("open");
    #[cfg(target_os = "windows")]
    let mut command = {
        let mut command = std::process::Command::new("cmd");
        command.args(["/C", "start", ""]);
        command
    };
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let mut command = std::process::Command::new("xdg-open");

    match command.arg(path).spawn() {
        Ok(_) => debug!("Opened {}", path.display()),
        Err(e) => warn!("Cannot open report {}: {}", path.display(), e),
    }
}
