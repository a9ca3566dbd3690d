use anyhow::Result;
use bp_patcher::config::{compile, load_from_path, RuleSetConfig};
use bp_patcher::report::{self, JsonReport, Summary};
use bp_patcher::{patch, presets, TargetFile};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "bp-patcher")]
#[command(about = "Idempotent patching of Android.bp build blueprints", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a rule set to its target blueprint
    Apply {
        #[command(flatten)]
        source: RuleSource,

        /// Dry run - show what would be changed without writing the file
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Print a JSON report instead of the log
        #[arg(long)]
        json: bool,
    },

    /// Report which rules would apply, without writing
    Check {
        #[command(flatten)]
        source: RuleSource,

        /// Print a JSON report instead of the log
        #[arg(long)]
        json: bool,
    },

    /// List built-in presets and rule sets in a directory
    List {
        /// Directory containing .toml rule sets
        #[arg(long)]
        rules_dir: Option<PathBuf>,
    },
}

#[derive(Args)]
struct RuleSource {
    /// Rule set file (TOML)
    #[arg(short, long, conflicts_with = "preset", required_unless_present = "preset")]
    rules: Option<PathBuf>,

    /// Built-in preset (see `list`)
    #[arg(short, long)]
    preset: Option<String>,

    /// Blueprint file to patch (overrides the rule set's target)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Source tree root that a relative target is resolved against
    #[arg(short, long, default_value = ".")]
    tree: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Apply {
            source,
            dry_run,
            diff,
            json,
        } => cmd_apply(source, dry_run, diff, json),

        Commands::Check { source, json } => cmd_apply(source, true, false, json),

        Commands::List { rules_dir } => cmd_list(rules_dir),
    }
}

/// Helper: Load the rule set named by --rules or --preset.
fn load_rule_set(source: &RuleSource) -> Result<RuleSetConfig> {
    match (&source.rules, &source.preset) {
        (Some(path), _) => Ok(load_from_path(path)?),
        (None, Some(name)) => Ok(presets::load(name)?),
        (None, None) => anyhow::bail!("either --rules or --preset is required"),
    }
}

/// Resolve the target blueprint path
///
/// Priority order:
/// 1. Explicit --file flag
/// 2. The rule set's `target`, resolved against --tree when relative
fn resolve_target(source: &RuleSource, config: &RuleSetConfig) -> Result<PathBuf> {
    if let Some(file) = &source.file {
        return Ok(file.clone());
    }

    match config.meta.target.as_deref() {
        Some(target) if Path::new(target).is_absolute() => Ok(PathBuf::from(target)),
        Some(target) => Ok(source.tree.join(target)),
        None => anyhow::bail!(
            "rule set '{}' does not name a target file; pass --file",
            config.meta.name
        ),
    }
}

fn cmd_apply(source: RuleSource, dry_run: bool, show_diff: bool, json: bool) -> Result<()> {
    // 1. Load rules and the target
    let config = load_rule_set(&source)?;
    let target_path = resolve_target(&source, &config)?;
    let target = TargetFile::load(&target_path)?;

    // 2. Patch in memory
    let compiled = compile(&config, target.content())?;
    let outcome = patch(target.content(), &compiled.rules);
    let original = target.content().to_string();
    let changed = outcome.content != original;

    // 3. Single write, only once everything is computed
    let written = if dry_run {
        false
    } else {
        target.persist(&outcome.content)?
    };

    // 4. Report
    let summary = Summary::from_results(&outcome.results);

    if json {
        let report = JsonReport {
            rule_set: &config.meta.name,
            target: &target_path,
            written,
            changed,
            results: &outcome.results,
            summary,
        };
        println!("{}", report.to_json()?);
        return Ok(());
    }

    println!("Target: {}", target_path.display());
    println!("Rules: {}", config.meta.name);
    if dry_run {
        println!("{}", "[DRY RUN - showing what would be applied]".cyan());
    }
    println!();

    report::print_discoveries(&compiled.discoveries);
    report::print_results(&outcome.results, &outcome.content, dry_run);

    if show_diff && changed {
        report::display_diff(&target_path, &original, &outcome.content);
    }

    report::print_summary(&summary, dry_run);
    if !changed {
        println!("{}", "No changes needed".dimmed());
    } else if !written {
        println!("{}", "No changes written".dimmed());
    }

    Ok(())
}

fn cmd_list(rules_dir: Option<PathBuf>) -> Result<()> {
    println!("{}", "Built-in presets:".bold());
    for preset in presets::PRESETS {
        let config = presets::load(preset.name)?;
        print_rule_set(preset.name, &config);
    }

    let Some(dir) = rules_dir else {
        return Ok(());
    };

    println!();
    println!("{}", format!("Rule sets in {}:", dir.display()).bold());

    let mut files = Vec::new();
    for entry in WalkDir::new(&dir).max_depth(1) {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|s| s.to_str()) == Some("toml")
        {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();

    if files.is_empty() {
        println!("{}", "  No .toml rule sets found".yellow());
    }

    for file in files {
        match load_from_path(&file) {
            Ok(config) => print_rule_set(&file.display().to_string(), &config),
            Err(e) => eprintln!("  {} {}: {}", "✗".red(), file.display(), e),
        }
    }

    Ok(())
}

fn print_rule_set(name: &str, config: &RuleSetConfig) {
    println!(
        "  {} ({} rules){}",
        name.green(),
        config.rules.len(),
        config
            .meta
            .description
            .as_deref()
            .map(|d| format!(" - {d}"))
            .unwrap_or_default()
    );
    if let Some(target) = &config.meta.target {
        println!("    {}", format!("target: {target}").dimmed());
    }
}
