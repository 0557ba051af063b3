//! Main execution logic for fm-lookup CLI.

use anyhow::{bail, Context, Result};
use fm_lookup::{LookupFilter, StatsSnapshot};
use fm_traits::{EventFilter, FilterChain};
use fm_types::{Event, LookupConfig, Placement, SourceConfig, WebSourceConfig};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};

use crate::args::{Cli, OutputFormat};

/// Counters for one run over the input stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Lines read from the input, including blank ones
    pub lines_read: u64,
    /// JSON object lines that went through the filters
    pub events: u64,
    /// Events the filter chain reported as matched
    pub events_matched: u64,
    /// Lines written back unchanged because they are not JSON objects
    pub passed_through: u64,
}

/// Outcome of a full run.
#[derive(Debug)]
pub struct RunReport {
    pub summary: RunSummary,
    pub filters: Vec<(String, StatsSnapshot)>,
}

/// Execute the lookup stage with the provided arguments.
pub async fn execute(args: Cli) -> Result<RunReport> {
    let configs = build_configs(&args)?;

    let mut filters = Vec::with_capacity(configs.len());
    for config in configs {
        let location = config.source.location().to_string();
        let filter = LookupFilter::register(config)
            .await
            .with_context(|| format!("Failed to register lookup for {location}"))?;
        filters.push(Arc::new(filter));
    }

    let chain = filters
        .iter()
        .fold(FilterChain::new().with_name("fm-lookup"), |chain, filter| {
            chain.push(Box::new(Arc::clone(filter)))
        });
    info!(filters = chain.len(), "Processing events from stdin");

    let input = tokio::io::BufReader::new(tokio::io::stdin());
    let output = tokio::io::stdout();
    let summary = process(&chain, input, output, args.output_format).await?;

    let filters = filters
        .iter()
        .map(|f| (f.name().to_string(), f.stats()))
        .collect();

    Ok(RunReport { summary, filters })
}

/// Runs every NDJSON line of `input` through `filter` and writes it to `output`.
///
/// Blank lines are skipped. Lines that are not JSON objects are logged and
/// written back unchanged.
pub async fn process<R, W>(
    filter: &dyn EventFilter,
    input: R,
    output: W,
    format: OutputFormat,
) -> Result<RunSummary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut summary = RunSummary::default();
    let mut lines = input.lines();
    let mut out = BufWriter::new(output);

    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        summary.lines_read += 1;

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let rendered = match serde_json::from_str::<serde_json::Value>(trimmed)
            .ok()
            .and_then(Event::from_value)
        {
            Some(mut event) => {
                summary.events += 1;
                if filter.filter(&mut event).await.is_matched() {
                    summary.events_matched += 1;
                }
                render(&event, format)?
            }
            None => {
                warn!(
                    line = summary.lines_read,
                    "Input line is not a JSON object, passing through"
                );
                summary.passed_through += 1;
                line
            }
        };

        out.write_all(rendered.as_bytes()).await?;
        out.write_all(b"\n").await?;
    }

    out.flush().await?;
    debug!(?summary, "Input exhausted");
    Ok(summary)
}

fn render(event: &Event, format: OutputFormat) -> Result<String> {
    let rendered = match format {
        OutputFormat::Compact => serde_json::to_string(event)?,
        OutputFormat::Pretty => serde_json::to_string_pretty(event)?,
    };
    Ok(rendered)
}

/// A config file holds one lookup or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum ConfigFile {
    Many(Vec<LookupConfig>),
    One(Box<LookupConfig>),
}

/// Loads lookup configs from a YAML or JSON file.
pub fn load_config_file(path: &Path) -> Result<Vec<LookupConfig>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let parsed: ConfigFile = if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON config {}", path.display()))?
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid YAML config {}", path.display()))?
    };

    Ok(match parsed {
        ConfigFile::Many(configs) => configs,
        ConfigFile::One(config) => vec![*config],
    })
}

/// Collects the lookups requested on the command line.
pub fn build_configs(args: &Cli) -> Result<Vec<LookupConfig>> {
    let mut configs = Vec::new();
    for path in &args.configs {
        configs.extend(load_config_file(path)?);
    }

    if !args.fields.is_empty() {
        configs.push(inline_config(args)?);
    }

    if configs.is_empty() {
        bail!("Nothing to do: pass --config or --field with --path or --url");
    }
    Ok(configs)
}

fn inline_config(args: &Cli) -> Result<LookupConfig> {
    let source = match (&args.path, &args.url) {
        (Some(path), None) => SourceConfig::file(path),
        (None, Some(url)) => {
            let mut web = WebSourceConfig::new(url)
                .with_method(args.method.into())
                .with_timeout(args.timeout);
            for (name, value) in &args.headers {
                web = web.with_header(name, value);
            }
            for (name, value) in &args.params {
                web = web.with_param(name, value);
            }
            if let Some(dir) = &args.cache_dir {
                web = web.with_cache_dir(dir);
            }
            SourceConfig::Webservice(web)
        }
        (Some(_), Some(_)) => bail!("--path and --url are mutually exclusive"),
        (None, None) => bail!("--field requires --path or --url"),
    };

    let placement = match (&args.destination, &args.result_key, args.overwrite_source) {
        (Some(destination), _, _) => Placement::Destination {
            destination: destination.clone(),
        },
        (None, Some(result_key), false) => Placement::ResultField {
            result_key: result_key.clone(),
        },
        (None, None, false) if !args.override_existing => Placement::default(),
        (None, _, _) => Placement::OverwriteSource,
    };

    let mut config = LookupConfig::new(args.fields.clone(), source)
        .with_placement(placement)
        .with_override(args.override_existing)
        .with_refresh_interval(args.refresh_interval)
        .with_refresh_mode(args.refresh_mode.into());

    if let Some(format) = args.format {
        config = config.with_format(format.into());
    }
    if let Some(fallback) = &args.fallback {
        config = config.with_fallback(fallback);
    }
    for (field, template) in &args.default_values {
        config = config.with_default_value(field, template);
    }
    for tag in &args.add_tags {
        config = config.with_add_tag(tag);
    }

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid lookup options: {e}"))?;
    Ok(config)
}
