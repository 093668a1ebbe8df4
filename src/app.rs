//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and installs logging
//! - resolves the project and the site store
//! - runs the per-site pipeline
//! - prints reports and writes exports

use std::path::Path;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, DemoArgs, LoadsArgs, PredictArgs, SiteArgs};
use crate::data::synthetic::{generate_site, SyntheticConfig};
use crate::domain::{resolve_store_root, ProjectConfig, SiteConfig};
use crate::error::{AppError, QwError};
use crate::io::export::{
    model_data_path, samples_path, summary_path, write_load_table_csv, write_summary_csv,
    write_summary_json, write_table_csv,
};
use crate::io::store::{CsvStore, MemoryStore, SeriesStore, Stream};
use crate::loads::water_year_of;
use crate::report::{format_load_table, format_summary, summarize};

pub mod pipeline;

use pipeline::{fit_constituent, load_site, load_table, YearlyMethod};

/// Site id used by the `demo` command.
pub const DEMO_SITE: &str = "demo";

/// Entry point for the `qw` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_logging();

    let project = ProjectConfig::resolve(cli.config.as_deref())?;
    info!(project = %project.project, "resolved project");

    match cli.command {
        Command::Summary(args) => {
            let store = open_store(cli.store.as_deref())?;
            handle_summary(store.as_ref(), &project, &args)
        }
        Command::Predict(args) => {
            let store = open_store(cli.store.as_deref())?;
            handle_predict(store.as_ref(), &project, &args)
        }
        Command::Loads(args) => {
            let store = open_store(cli.store.as_deref())?;
            handle_loads(store.as_ref(), &project, &args)
        }
        Command::Demo(args) => handle_demo(&args),
    }
}

/// Log to stderr so stdout carries only tables; `RUST_LOG` overrides the `info` default.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A subscriber may already be installed when embedded; keep that one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn open_store(path: Option<&Path>) -> Result<Box<dyn SeriesStore>, AppError> {
    let root = resolve_store_root(path)?;
    if !root.is_dir() {
        return Err(QwError::Config(format!("store '{}' is not a directory", root.display())).into());
    }
    Ok(Box::new(CsvStore::new(root)))
}

fn handle_summary(store: &dyn SeriesStore, project: &ProjectConfig, args: &SiteArgs) -> Result<(), AppError> {
    let constituent = project.constituent(&args.constituent)?;
    let data = load_site(store, &project.site(&args.site))?;
    let fit = fit_constituent(&data, constituent, project)?;

    let title = format!("{} {}", data.site.label(), constituent.name);
    println!("{}", format_summary(&title, &summarize(&fit.candidates)));
    if let Err(e) = &fit.composite {
        println!("{e}");
    }
    Ok(())
}

fn handle_predict(store: &dyn SeriesStore, project: &ProjectConfig, args: &PredictArgs) -> Result<(), AppError> {
    let target = &args.target;
    let constituent = project.constituent(&target.constituent)?;
    let data = load_site(store, &project.site(&target.site))?;
    let fit = fit_constituent(&data, constituent, project)?;

    let rows = summarize(&fit.candidates);
    write_summary_csv(&summary_path(&args.out, &target.site, &constituent.name, "csv"), &rows)?;
    if args.json {
        write_summary_json(&summary_path(&args.out, &target.site, &constituent.name, "json"), &rows)?;
    }

    for (i, candidate) in fit.candidates.iter().enumerate() {
        if let Some(dataset) = candidate.model_dataset() {
            write_table_csv(
                &samples_path(&args.out, &target.site, &constituent.name, i + 1),
                &dataset,
            )?;
        }
    }

    let composite = fit.composite?;
    let merged = composite.prediction.merged_into(&data.surrogates);
    write_table_csv(&model_data_path(&args.out, &target.site, &constituent.name), &merged)?;

    println!("{}", format_summary(&constituent.name, &rows));
    for &i in composite.contributors.iter().rev() {
        println!(
            "{:>8} rows from {}",
            composite.rows_from(i),
            fit.candidates[i].formula()
        );
    }
    Ok(())
}

fn handle_loads(store: &dyn SeriesStore, project: &ProjectConfig, args: &LoadsArgs) -> Result<(), AppError> {
    let method = YearlyMethod::from(args.method);
    let table = load_table(store, project, &args.water_years, method)?;
    println!("{}", format_load_table(&table));
    if let Some(path) = &args.out {
        write_load_table_csv(path, &table)?;
    }
    Ok(())
}

/// Built-in project pointed at the synthetic site.
pub fn demo_project() -> ProjectConfig {
    let mut project = ProjectConfig::nutrient_network();
    project.project = "Synthetic demo".to_string();
    project.sites = vec![SiteConfig {
        id: DEMO_SITE.to_string(),
        name: Some("Synthetic".to_string()),
        proxies: Default::default(),
    }];
    project
}

/// In-memory store holding one synthetic site.
pub fn demo_store(config: &SyntheticConfig) -> Result<MemoryStore, QwError> {
    let site = generate_site(config)?;
    Ok(MemoryStore::new()
        .with(DEMO_SITE, Stream::Iv, site.surrogates)
        .with(DEMO_SITE, Stream::QwData, site.constituents))
}

fn handle_demo(args: &DemoArgs) -> Result<(), AppError> {
    let synthetic = SyntheticConfig {
        seed: args.seed,
        days: args.days,
        n_samples: args.samples,
        ..SyntheticConfig::default()
    };
    let store = demo_store(&synthetic)?;
    let project = demo_project();
    let data = load_site(&store, &project.site(DEMO_SITE))?;

    let mut water_years = Vec::new();
    if let Some((start, end)) = pipeline::span(&data.surrogates) {
        println!("Synthetic record {start} .. {end}\n");
        water_years.extend(water_year_of(start)..=water_year_of(end));
    }

    for constituent in &project.constituents {
        if constituent.probe.is_some() {
            continue;
        }
        let fit = fit_constituent(&data, constituent, &project)?;
        println!("{}", format_summary(&constituent.name, &summarize(&fit.candidates)));
    }

    let table = load_table(&store, &project, &water_years, YearlyMethod::Mean)?;
    println!("{}", format_load_table(&table));
    Ok(())
}
