use anyhow::Context;
use colored::Colorize;
use wsc_sdk::{
    ConsolidationRecord, Consolidator, ConsolidatorConfig, DiscoveryRecord, MergeState, RunReport,
    SupersededDisposition, MAX_SCORE,
};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = build_config(&cli)?;
    let consolidator = Consolidator::new(config).context("invalid configuration")?;
    match cli.command {
        Command::Discover => cmd_discover(&consolidator, &cli.format),
        Command::Plan => cmd_plan(&consolidator, &cli.format),
        Command::Run(_) => cmd_run(&consolidator, &cli.format),
    }
}

fn build_config(cli: &Cli) -> anyhow::Result<ConsolidatorConfig> {
    let mut config = match &cli.config {
        Some(path) => ConsolidatorConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ConsolidatorConfig::default(),
    };
    if !cli.roots.is_empty() {
        config.roots = cli.roots.clone();
    }
    if cli.canonical.is_some() {
        config.canonical_root = cli.canonical.clone();
    }
    if cli.report_dir.is_some() {
        config.report_dir = cli.report_dir.clone();
    }
    if let Command::Run(args) = &cli.command {
        if args.keep_superseded {
            config.merge.archive_superseded = false;
        }
        if args.archive_root.is_some() {
            config.merge.archive_root = args.archive_root.clone();
        }
    }
    Ok(config)
}

fn cmd_discover(consolidator: &Consolidator, format: &OutputFormat) -> anyhow::Result<()> {
    let discovery = consolidator.discover()?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&discovery.record)?),
        OutputFormat::Text => print_discovery(&discovery.record),
    }
    Ok(())
}

fn cmd_plan(consolidator: &Consolidator, format: &OutputFormat) -> anyhow::Result<()> {
    let report = consolidator.plan()?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            print_discovery(&report.discovery);
            print_decisions(&report.consolidation);
            println!("\n{} Dry run, nothing was changed.", "i".cyan().bold());
        }
    }
    write_reports(consolidator, &report)
}

fn cmd_run(consolidator: &Consolidator, format: &OutputFormat) -> anyhow::Result<()> {
    let report = consolidator.run()?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            print_decisions(&report.consolidation);
            print_outcomes(&report.consolidation);
        }
    }
    write_reports(consolidator, &report)?;

    let failed = report.consolidation.failed().count();
    if failed > 0 {
        anyhow::bail!("{failed} entities failed to consolidate");
    }
    Ok(())
}

fn write_reports(consolidator: &Consolidator, report: &RunReport) -> anyhow::Result<()> {
    for path in consolidator.write_reports(report)? {
        eprintln!("  {} {}", "report:".dimmed(), path.display());
    }
    Ok(())
}

// ---- Text output ----

fn print_discovery(record: &DiscoveryRecord) {
    println!(
        "Scanned {} roots: {} entities, {} instances",
        record.roots.len().to_string().bold(),
        record.entities.len().to_string().bold(),
        record.instance_count().to_string().bold(),
    );
    println!(
        "  {} singletons, {} need resolution",
        record.singletons,
        record.needs_resolution.len().to_string().yellow(),
    );
    for name in &record.needs_resolution {
        println!("\n  {}", name.yellow().bold());
        for inst in record.entities.get(name).into_iter().flatten() {
            println!(
                "    {:>2}/{MAX_SCORE}  {}  {}",
                inst.quality_score,
                inst.root_label().cyan(),
                inst.path.display().to_string().dimmed(),
            );
        }
    }
    for mismatch in &record.version_mismatches {
        println!(
            "  {} {} declares versions {}",
            "!".yellow().bold(),
            mismatch.logical_name,
            mismatch.versions.join(", ")
        );
    }
    for issue in &record.issues {
        println!("  {} {}", "warning:".yellow(), issue);
    }
}

fn print_decisions(record: &ConsolidationRecord) {
    if record.decisions.is_empty() {
        println!("\n{} Nothing to consolidate.", "✓".green().bold());
        return;
    }
    println!("\n{} decisions:", record.decisions.len().to_string().bold());
    for d in &record.decisions {
        println!(
            "  {} primary {} ({}), merge {}, retain {}, archive {}",
            d.logical_name.yellow().bold(),
            d.primary.root_label().cyan(),
            d.primary.quality_score,
            d.merge_candidates.len(),
            d.retained.len(),
            d.archive_only.len(),
        );
        println!("    {}", d.reason.dimmed());
    }
}

fn print_outcomes(record: &ConsolidationRecord) {
    println!();
    for o in &record.outcomes {
        let state = match o.state {
            MergeState::Verified if o.already_consolidated => "SKIPPED".blue(),
            MergeState::Verified => "VERIFIED".green().bold(),
            MergeState::Failed => "FAILED".red().bold(),
            other => other.to_string().yellow(),
        };
        println!("  {} {} → {}", state, o.logical_name, o.target.display());
        if !o.copied_files.is_empty() || !o.added_dependencies.is_empty() {
            println!(
                "    merged {} files, {} dependencies",
                o.copied_files.len(),
                o.added_dependencies.len()
            );
        }
        for s in &o.superseded {
            match &s.disposition {
                SupersededDisposition::Archived { archive_path } => println!(
                    "    {} {} → {}",
                    "archived".dimmed(),
                    s.original_path.display(),
                    archive_path.display()
                ),
                SupersededDisposition::KeptInPlace => {
                    println!("    {} {}", "kept".dimmed(), s.original_path.display())
                }
            }
        }
    }
    for e in &record.errors {
        println!("  {} {}", "error:".red().bold(), e);
    }
    println!(
        "\n{} consolidated, {} already done, {} failed, {} backups",
        record.consolidated().count().to_string().green().bold(),
        record.skipped().count(),
        record.failed().count().to_string().red(),
        record.backups.len(),
    );
}
