//! REPL – interactive shell around one [`Simulation`].
//!
//! Supported slash-commands:
//!   /help                 – show this list
//!   /scenarios            – list built-in presets
//!   /scenario <name|file> – load a preset or a TOML scenario file
//!   /mode <mode>          – bidirectional | stubborn | learned | planned
//!   /prior <prior>        – uniform | first | second
//!   /goal <node> | <x y>  – navigate to a graph node or a free point
//!   /run [seconds]        – advance simulated time (default 10 s)
//!   /status               – print the current state
//!   /reset /pause /start  – run control
//!   /save [path]          – write a JSON snapshot
//!   /schema               – print the scenario-file JSON schema
//!   /quit | /exit         – leave the shell

use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

use duet_runtime::{ScenarioConfig, Simulation, Snapshot, load_scenario, scenarios};
use duet_types::{DuetError, Goal, Mode, Point2, PriorKind};

use crate::config::{self, CliConfig};

const DEFAULT_RUN_SECONDS: f64 = 10.0;

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// One parsed slash-command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Scenarios,
    Scenario(String),
    Mode(Mode),
    Prior(PriorKind),
    Goal(Goal),
    Run(f64),
    Status,
    Reset,
    Pause,
    Start,
    Save(Option<PathBuf>),
    Schema,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, DuetError> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(DuetError::Parse("empty command".to_string()));
        };
        let args: Vec<&str> = words.collect();

        let no_args = |cmd: Command| {
            if args.is_empty() {
                Ok(cmd)
            } else {
                Err(DuetError::Parse(format!("{head} takes no arguments")))
            }
        };
        let one_arg = || match args.as_slice() {
            [one] => Ok(*one),
            _ => Err(DuetError::Parse(format!("usage: {head} <value>"))),
        };

        match head {
            "/help" | "/?" => no_args(Command::Help),
            "/scenarios" => no_args(Command::Scenarios),
            "/scenario" => one_arg().map(|s| Command::Scenario(s.to_string())),
            "/mode" => Ok(Command::Mode(one_arg()?.parse()?)),
            "/prior" => Ok(Command::Prior(one_arg()?.parse()?)),
            "/goal" => parse_goal(&args).map(Command::Goal),
            "/run" => match args.as_slice() {
                [] => Ok(Command::Run(DEFAULT_RUN_SECONDS)),
                [secs] => parse_seconds(secs).map(Command::Run),
                _ => Err(DuetError::Parse("usage: /run [seconds]".to_string())),
            },
            "/status" => no_args(Command::Status),
            "/reset" => no_args(Command::Reset),
            "/pause" => no_args(Command::Pause),
            "/start" => no_args(Command::Start),
            "/save" => match args.as_slice() {
                [] => Ok(Command::Save(None)),
                [path] => Ok(Command::Save(Some(PathBuf::from(path)))),
                _ => Err(DuetError::Parse("usage: /save [path]".to_string())),
            },
            "/schema" => no_args(Command::Schema),
            "/quit" | "/exit" => no_args(Command::Quit),
            other => Err(DuetError::Parse(format!("unknown command '{other}'"))),
        }
    }
}

fn parse_goal(args: &[&str]) -> Result<Goal, DuetError> {
    match args {
        [node] => Ok(Goal::Node(node.to_string())),
        [x, y] => {
            let coord = |s: &str| {
                s.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| DuetError::Parse(format!("bad coordinate '{s}'")))
            };
            Ok(Goal::Point(Point2::new(coord(x)?, coord(y)?)))
        }
        _ => Err(DuetError::Parse("usage: /goal <node> | /goal <x> <y>".to_string())),
    }
}

fn parse_seconds(s: &str) -> Result<f64, DuetError> {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
        _ => Err(DuetError::Parse(format!("'{s}' is not a positive duration"))),
    }
}

/// Load a preset by name, or a scenario file when `source` names one.
pub fn resolve_scenario(source: &str, seed: Option<u64>) -> Result<ScenarioConfig, DuetError> {
    let config = if source.ends_with(".toml") || Path::new(source).is_file() {
        load_scenario(source)?
    } else {
        scenarios::preset(source)?
    };
    Ok(match seed {
        Some(seed) => config.with_seed(seed),
        None => config,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// What the loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Serialize)]
struct SavedSnapshot<'a> {
    saved_at: chrono::DateTime<chrono::Utc>,
    tick_hz: u32,
    snapshot: &'a Snapshot,
}

/// The simulation being driven plus the settings that drive it.
pub struct Session {
    sim: Simulation,
    cli: CliConfig,
}

impl Session {
    pub fn new(cli: CliConfig) -> Result<Self, DuetError> {
        let sim = Simulation::new(resolve_scenario(&cli.scenario, cli.seed)?)?;
        Ok(Self { sim, cli })
    }

    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Replace the simulation with a freshly loaded scenario.
    pub fn load(&mut self, source: &str) -> Result<(), DuetError> {
        self.sim = Simulation::new(resolve_scenario(source, self.cli.seed)?)?;
        Ok(())
    }

    /// Tick for `seconds` of simulated time at the configured rate, printing
    /// every label change.  Returns the number of transitions seen.
    ///
    /// Stops early when `interrupt` is raised.
    pub fn run_for(&mut self, seconds: f64, interrupt: &AtomicBool) -> usize {
        let dt = self.cli.dt();
        let frames = (seconds * f64::from(self.cli.tick_hz.max(1))).ceil() as u64;
        let mut seen = 0;
        for _ in 0..frames {
            if interrupt.load(Ordering::SeqCst) {
                println!("  {}", "interrupted".yellow());
                break;
            }
            self.sim.tick(dt);
            for t in self.sim.drain_transitions() {
                seen += 1;
                println!(
                    "  {:>7.2}s  {} {} {}",
                    t.at,
                    t.from.to_string().dimmed(),
                    "→".dimmed(),
                    t.to.to_string().bold()
                );
            }
        }
        debug!(frames, seen, "run finished");
        seen
    }

    /// Write the current snapshot as pretty JSON.  Without a path the file
    /// lands in `snapshot_dir` under a timestamped name.
    pub fn save_snapshot(&self, path: Option<&Path>) -> Result<PathBuf, String> {
        let now = chrono::Utc::now();
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => PathBuf::from(&self.cli.snapshot_dir).join(format!(
                "duet-{}-{}.json",
                self.sim.config().name,
                now.format("%Y%m%dT%H%M%SZ")
            )),
        };
        let snapshot = self.sim.snapshot();
        let body = SavedSnapshot {
            saved_at: now,
            tick_hz: self.cli.tick_hz,
            snapshot: &snapshot,
        };
        let json = serde_json::to_string_pretty(&body)
            .map_err(|e| format!("Failed to serialize snapshot: {}", e))?;
        config::write_private(&path, json.as_bytes())
            .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
        Ok(path)
    }

    pub fn execute(&mut self, cmd: Command, interrupt: &AtomicBool) -> Flow {
        match cmd {
            Command::Help => cmd_help(),
            Command::Scenarios => cmd_scenarios(),
            Command::Scenario(source) => match self.load(&source) {
                Ok(()) => println!(
                    "{} {}",
                    "✓ Loaded scenario".green(),
                    self.sim.config().name.bold()
                ),
                Err(e) => report(&e),
            },
            Command::Mode(mode) => {
                self.sim.set_mode(mode);
                println!("  mode: {}", mode.to_string().yellow());
            }
            Command::Prior(prior) => {
                self.sim.set_prior(prior);
                println!("  prior: {} (run restarted)", format!("{prior:?}").yellow());
            }
            Command::Goal(goal) => match self.sim.set_goal(goal) {
                Ok(()) => print_route(&self.sim),
                Err(e) => report(&e),
            },
            Command::Run(seconds) => {
                if !self.sim.is_running() {
                    println!("  {} – use {} to resume", "paused".yellow(), "/start".bold());
                } else {
                    let seen = self.run_for(seconds, interrupt);
                    println!(
                        "  ran {:.1}s, {} transition(s), now {}",
                        seconds,
                        seen,
                        self.sim.label().to_string().bold()
                    );
                }
            }
            Command::Status => print_status(&self.sim),
            Command::Reset => {
                self.sim.reset();
                println!("{}", "✓ Reset".green());
            }
            Command::Pause => {
                self.sim.pause();
                println!("  {}", "paused".yellow());
            }
            Command::Start => {
                self.sim.start();
                println!("  {}", "running".green());
            }
            Command::Save(path) => match self.save_snapshot(path.as_deref()) {
                Ok(p) => println!("{} {}", "✓ Snapshot saved to".green(), p.display().to_string().bold()),
                Err(e) => println!("{}: {}", "Error".red(), e),
            },
            Command::Schema => print_schema(),
            Command::Quit => {
                println!("{}", "Goodbye.".green());
                return Flow::Quit;
            }
        }
        Flow::Continue
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Loop
// ─────────────────────────────────────────────────────────────────────────────

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(mut session: Session, shutdown: Arc<AtomicBool>) {
    let mut editor = match DefaultEditor::new() {
        Ok(e) => e,
        Err(e) => {
            eprintln!("{}: {}", "Terminal error".red(), e);
            return;
        }
    };
    let prompt = format!("{} ", "duet>".bold().cyan());

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        let line = match editor.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("{}", "Goodbye.".green());
                break;
            }
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Err(e) = editor.add_history_entry(line) {
            warn!(error = %e, "failed to record history");
        }

        match Command::parse(line) {
            Ok(cmd) => {
                if session.execute(cmd, &shutdown) == Flow::Quit {
                    shutdown.store(true, Ordering::SeqCst);
                    break;
                }
            }
            Err(e) => println!(
                "{} {}. Type {} for available commands.",
                "Error:".red(),
                e.to_string().yellow(),
                "/help".bold()
            ),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "Duet Commands".bold().underline());
    let rows = [
        ("/scenarios", "list built-in presets"),
        ("/scenario <name|file>", "load a preset or TOML scenario"),
        ("/mode <mode>", "bidirectional | stubborn | learned | planned"),
        ("/prior <prior>", "uniform | first | second"),
        ("/goal <node> | <x y>", "set the navigation goal"),
        ("/run [seconds]", "advance simulated time"),
        ("/status", "show the current state"),
        ("/reset  /pause  /start", "run control"),
        ("/save [path]", "write a JSON snapshot"),
        ("/schema", "print the scenario JSON schema"),
        ("/quit  /exit", "exit the CLI"),
    ];
    for (cmd, what) in rows {
        println!("  {} – {}", format!("{cmd:<24}").bold().cyan(), what);
    }
    println!();
}

pub fn cmd_scenarios() {
    println!("{}", "Scenarios".bold().underline());
    for name in scenarios::PRESETS {
        println!("  • {}", name.bold());
    }
}

pub fn print_schema() {
    match serde_json::to_string_pretty(&duet_runtime::scenario_schema()) {
        Ok(s) => println!("{s}"),
        Err(e) => println!("{}: {}", "Error".red(), e),
    }
}

fn report(e: &DuetError) {
    println!("{}: {}", "Error".red(), e);
}

fn print_route(sim: &Simulation) {
    match sim.route() {
        Some(route) => println!("  route: {}", route.join(" → ").bold()),
        None => match sim.goal() {
            Some(Goal::Point(p)) => println!("  heading straight for ({:.0}, {:.0})", p.x, p.y),
            _ => println!("  {}", "no route".yellow()),
        },
    }
}

pub fn print_status(sim: &Simulation) {
    let s = sim.snapshot();
    println!("{}", "Status".bold().underline());
    println!("  scenario : {} ({})", s.scenario.bold(), if s.running { "running".green() } else { "paused".yellow() });
    println!("  time     : {:.2}s", s.elapsed);
    println!("  mode     : {}   prior: {:?}", s.mode, s.prior);
    println!("  pose     : ({:.1}, {:.1}) heading {:.2} rad", s.pose.x, s.pose.y, s.pose.heading);
    println!(
        "  belief   : [{:.3}, {:.3}]{}",
        s.belief[0],
        s.belief[1],
        if s.confident { " confident".green().to_string() } else { String::new() }
    );
    if let Some(m) = &s.measurement {
        println!(
            "  reading  : {:.3} rad ± {:.3}, favours {}",
            m.measured_bearing, m.sigma, m.winner
        );
    }
    println!("  action   : {}", s.label_text.bold());
    if let Some(t) = s.target {
        println!("  target   : ({:.1}, {:.1})", t.x, t.y);
    }
    if let (Some(route), Some(cursor)) = (&s.route, s.route_cursor) {
        println!("  route    : {} (at {})", route.join(" → "), cursor);
    }
    if let (Some(phase), Some(f)) = (&s.phase, s.phase_fraction) {
        println!("  phase    : {} {:.0}%", phase, f * 100.0);
    }
}
