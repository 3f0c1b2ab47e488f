use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;
use nanode_builder::config::{load_from_path, BuildConfiguration, IcuMode, Settings, TargetArch};
use nanode_builder::patch::{build_patch_plan, preview_file, PatchPlan};
use nanode_builder::{
    CommandMinifier, GitClone, GitHubReleases, HostPlatform, Minifier, Orchestrator,
    ProcessRunner, RunOutcome, SkipMinify, VariantIdentity,
};
use similar::{ChangeTag, TextDiff};
use std::env;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nanode-builder")]
#[command(about = "Build and publish feature-trimmed Node.js variants", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Settings file (TOML); built-in defaults are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and publish one variant
    Build {
        #[command(flatten)]
        variant: VariantArgs,
    },

    /// Build and publish every [[variants]] entry of the settings file
    Matrix,

    /// Print the canonical identity of a variant
    Identity {
        #[command(flatten)]
        variant: VariantArgs,
    },

    /// Show the patch plan for a variant, optionally previewing it on a file
    Plan {
        #[command(flatten)]
        variant: VariantArgs,

        /// configure.py to preview the plan against (never modified)
        #[arg(long)]
        configure: Option<PathBuf>,

        /// Show unified diff of the preview
        #[arg(short, long, requires = "configure")]
        diff: bool,

        /// Plan for a Windows host instead of the current one
        #[arg(long)]
        windows: bool,
    },
}

#[derive(Args, Debug)]
struct VariantArgs {
    /// Upstream release line or tag
    #[arg(short = 't', long, default_value = "v18.x")]
    target_version: String,

    /// ICU mode: full, small, system, none
    #[arg(long, default_value = "full")]
    icu: IcuMode,

    /// Target architecture: x64, arm64, x86
    #[arg(long, default_value = "x64")]
    arch: TargetArch,

    /// Strip V8 object printing, inspector and i18n support
    #[arg(long)]
    v8_opts: bool,

    /// Build V8 in lite (jitless) mode
    #[arg(long)]
    no_jit: bool,

    /// Enable link-time optimization
    #[arg(long)]
    lto: bool,

    /// Compile with clang-cl (Windows, Node.js 22+)
    #[arg(long)]
    clang_cl: bool,

    /// Enable V8 pointer compression
    #[arg(long)]
    pointer_compression: bool,

    /// Also publish a upx-compressed binary
    #[arg(long)]
    upx: bool,
}

impl VariantArgs {
    fn into_config(self) -> BuildConfiguration {
        BuildConfiguration {
            target_version: self.target_version,
            icu_mode: self.icu,
            enable_v8_debug_opts: self.v8_opts,
            target_arch: self.arch,
            disable_jit: self.no_jit,
            enable_lto: self.lto,
            use_clang_cl: self.clang_cl,
            enable_pointer_compression: self.pointer_compression,
            make_compressed_build: self.upx,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Build { variant } => {
            let settings = load_settings(cli.config.as_deref())?;
            cmd_run(&settings, &[variant.into_config()])
        }

        Commands::Matrix => {
            let settings = load_settings(cli.config.as_deref())?;
            if settings.variants.is_empty() {
                anyhow::bail!(
                    "No [[variants]] configured{}",
                    cli.config
                        .map(|p| format!(" in {}", p.display()))
                        .unwrap_or_default()
                );
            }
            cmd_run(&settings, &settings.variants)
        }

        Commands::Identity { variant } => {
            println!("{}", VariantIdentity::compute(&variant.into_config()));
            Ok(())
        }

        Commands::Plan {
            variant,
            configure,
            diff,
            windows,
        } => {
            let host = if windows {
                HostPlatform::Windows
            } else {
                HostPlatform::current()
            };
            cmd_plan(&variant.into_config(), host, configure.as_deref(), diff)
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "nanode_builder=info",
        1 => "nanode_builder=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => load_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => Ok(Settings::default()),
    }
}

/// Run each variant in order and print a summary; exit 1 if any failed.
fn cmd_run(settings: &Settings, variants: &[BuildConfiguration]) -> Result<()> {
    let host = HostPlatform::current();
    let token = env::var("GITHUB_TOKEN").ok();
    if token.is_none() {
        eprintln!(
            "{}",
            "Warning: GITHUB_TOKEN is not set; release uploads will be rejected".yellow()
        );
    }

    let releases = GitHubReleases::new(&settings.release, token);
    let fetcher = GitClone::new();
    let runner = ProcessRunner;
    let command_minifier = CommandMinifier::new(&settings.minify, &runner);
    let minifier: &dyn Minifier = if settings.minify.enabled {
        &command_minifier
    } else {
        &SkipMinify
    };

    let orchestrator = Orchestrator {
        settings,
        host,
        releases: &releases,
        fetcher: &fetcher,
        runner: &runner,
        minifier,
    };

    println!("Host: {}", host);
    println!(
        "Release: {}/{}",
        settings.release.owner, settings.release.repo
    );
    println!();

    let mut published = 0;
    let mut skipped = 0;
    let mut failed = 0;

    for config in variants {
        match orchestrator.run(config) {
            Ok(RunOutcome::Published { identity, assets }) => {
                published += 1;
                println!("{} {}: Published", "✓".green(), identity);
                for asset in assets {
                    println!("  - {}", asset);
                }
            }
            Ok(RunOutcome::AlreadyPublished { identity }) => {
                skipped += 1;
                println!("{} {}: Skipped (already published)", "⊘".cyan(), identity);
            }
            Err(e) => {
                failed += 1;
                let identity = VariantIdentity::compute(config);
                eprintln!("{} {}: Failed - {}", "✗".red(), identity, e);
                if e.is_precondition() {
                    eprintln!("  {}", "Nothing was cloned or built".dimmed());
                }
            }
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} published", format!("{}", published).green());
    println!("  {} skipped", format!("{}", skipped).cyan());
    println!("  {} failed", format!("{}", failed).red());

    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_plan(
    config: &BuildConfiguration,
    host: HostPlatform,
    configure: Option<&Path>,
    diff: bool,
) -> Result<()> {
    let plan = build_patch_plan(config, host);

    println!("{}", "Patch Plan".bold());
    println!("Variant: {}", VariantIdentity::compute(config));
    println!("Host: {}", host);
    println!();
    print_plan(&plan);

    let Some(file) = configure else {
        return Ok(());
    };

    let (original, patched) = preview_file(&plan, file)
        .with_context(|| format!("Failed to preview {}", file.display()))?;

    println!();
    println!("{}", format!("Preview against {}", file.display()).bold());
    for outcome in &patched.outcomes {
        if outcome.matches > 0 {
            println!(
                "{} {}: {} -> {} ({} match{})",
                "✓".green(),
                outcome.step,
                outcome.token,
                outcome.replacement,
                outcome.matches,
                if outcome.matches == 1 { "" } else { "es" }
            );
        } else {
            println!(
                "{} {}: {} not found",
                "⊘".yellow(),
                outcome.step,
                outcome.token
            );
        }
    }

    let unmatched = patched.unmatched_tokens();
    println!();
    println!("{}", "Summary:".bold());
    println!(
        "  {} replacements",
        format!("{}", patched.total_matches()).green()
    );
    println!("  {} unmatched tokens", format!("{}", unmatched.len()).yellow());

    if diff && patched.text != original {
        println!();
        display_diff(file, &original, &patched.text);
    }

    Ok(())
}

fn print_plan(plan: &PatchPlan) {
    for step in plan.steps() {
        println!("{step}");
    }
}

/// Display a unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let line = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", line);
    }
}
