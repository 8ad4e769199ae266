//! `duet` – headless command line front end for the duet simulations.
//!
//! 1. Checks for `~/.duet/config.toml`; runs a **First-Run Wizard** when the
//!    file is absent.
//! 2. Loads the configured scenario (a preset name or a TOML file).
//! 3. Drops the user into an **interactive REPL** with slash-commands, or
//!    runs one of the one-shot subcommands:
//!
//! ```text
//! duet                              interactive shell
//! duet run [scenario] [seconds]     headless run, prints label changes
//! duet scenarios                    list built-in presets
//! duet schema                       print the scenario JSON schema
//! ```
//!
//! **Ctrl-C** stops a running simulation and exits cleanly.

mod config;
mod repl;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use crate::config::CliConfig;
use crate::repl::Session;

fn main() {
    let _telemetry = duet_runtime::init_tracing("duet-cli");
    let args: Vec<String> = std::env::args().skip(1).collect();

    // One-shot commands that need neither the banner nor a config.
    match args.first().map(String::as_str) {
        Some("schema") => return repl::print_schema(),
        Some("scenarios") => return repl::cmd_scenarios(),
        Some("-h" | "--help" | "help") => return print_usage(),
        _ => {}
    }

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; runs cannot be interrupted");
    }

    match args.first().map(String::as_str) {
        Some("run") => run_headless(&args[1..], &shutdown),
        Some(other) => {
            println!("{} '{}'", "Unknown subcommand:".red(), other.yellow());
            print_usage();
            std::process::exit(2);
        }
        None => interactive(shutdown),
    }
}

fn interactive(shutdown: Arc<AtomicBool>) {
    print_banner();

    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => run_first_run_wizard(),
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            defaults_with_env()
        }
    };

    let session = match Session::new(cfg.clone()) {
        Ok(s) => s,
        Err(e) => {
            println!("{}: {}", "Cannot load scenario".red(), e);
            println!("  Falling back to {}.", "bidirectional".bold());
            let fallback = CliConfig {
                scenario: "bidirectional".to_string(),
                ..cfg
            };
            match Session::new(fallback) {
                Ok(s) => s,
                Err(e) => {
                    println!("{}: {}", "Error".red(), e);
                    std::process::exit(1);
                }
            }
        }
    };
    info!(scenario = %session.simulation().config().name, "session started");

    println!(
        "  Scenario {} loaded.  Type {} for a list of commands.\n",
        session.simulation().config().name.bold(),
        "/help".bold().cyan()
    );
    repl::run(session, shutdown);
}

/// `duet run [scenario] [seconds]`
fn run_headless(args: &[String], shutdown: &AtomicBool) {
    let mut cfg = match config::load() {
        Ok(Some(cfg)) => cfg,
        Ok(None) => defaults_with_env(),
        Err(e) => {
            warn!(error = %e, "ignoring unreadable config");
            defaults_with_env()
        }
    };
    if let Some(scenario) = args.first() {
        cfg.scenario = scenario.clone();
    }
    let seconds = match args.get(1).map(|s| s.parse::<f64>()) {
        None => 30.0,
        Some(Ok(v)) if v.is_finite() && v > 0.0 => v,
        Some(_) => {
            println!("{} '{}'", "Not a positive duration:".red(), args[1].yellow());
            std::process::exit(2);
        }
    };

    let mut session = match Session::new(cfg) {
        Ok(s) => s,
        Err(e) => {
            println!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    };
    println!(
        "  Running {} for {:.1}s",
        session.simulation().config().name.bold(),
        seconds
    );
    session.run_for(seconds, shutdown);
    repl::print_status(session.simulation());
}

// ─────────────────────────────────────────────────────────────────────────────
// First-Run Wizard
// ─────────────────────────────────────────────────────────────────────────────

fn run_first_run_wizard() -> CliConfig {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║        Duet First-Run Wizard         ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
    println!("  No configuration found.  Let's set up duet.\n");

    let mut cfg = CliConfig::default();

    println!("  Which scenario should load at startup?");
    for (i, name) in duet_runtime::scenarios::PRESETS.iter().enumerate() {
        println!("    {}) {}", i + 1, name);
    }
    let choice = prompt_line("  Enter choice [1]: ", "1");
    if let Ok(i) = choice.parse::<usize>()
        && let Some(name) = duet_runtime::scenarios::PRESETS.get(i.wrapping_sub(1))
    {
        cfg.scenario = name.to_string();
    }

    let hz = prompt_line(
        &format!("  Simulated frames per second [{}]: ", cfg.tick_hz),
        &cfg.tick_hz.to_string(),
    );
    match hz.parse::<u32>() {
        Ok(v) if v > 0 => cfg.tick_hz = v,
        _ => println!("  {} keeping {}", "Warning:".yellow(), cfg.tick_hz),
    }

    let seed = prompt_line("  Fixed random seed (empty for none): ", "");
    cfg.seed = seed.parse::<u64>().ok();

    match config::save(&cfg) {
        Ok(()) => println!(
            "\n  {} Config saved to {}\n",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
    config::apply_env_overrides(&mut cfg);
    cfg
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"     __               __ "#.bold().cyan());
    println!("{}", r#"  __/ /__ __ ___ ___ / /_"#.bold().cyan());
    println!("{}", r#" / _  / // // -_) -_) __/"#.bold().cyan());
    println!("{}", r#" \_,_/\_,_/ \__/\__/\__/ "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "duet".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Perception ↔ action loops and spatial constructs");
    println!();
}

fn print_usage() {
    println!("{}", "Usage".bold().underline());
    println!("  duet                            interactive shell");
    println!("  duet run [scenario] [seconds]   headless run");
    println!("  duet scenarios                  list built-in presets");
    println!("  duet schema                     print the scenario JSON schema");
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn defaults_with_env() -> CliConfig {
    let mut cfg = CliConfig::default();
    config::apply_env_overrides(&mut cfg);
    cfg
}

fn prompt_line(msg: &str, default: &str) -> String {
    use std::io::{BufRead, Write};
    print!("{}", msg);
    std::io::stdout().flush().ok();
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(_) => {
            let t = line.trim().to_string();
            if t.is_empty() { default.to_string() } else { t }
        }
        Err(_) => default.to_string(),
    }
}
