use std::{io::Write, path::PathBuf};

use clap::Parser;
use hyanalysis::prelude::*;
use hyformal::prelude::*;
use hysolver::prelude::*;
use log::{Level, LevelFilter, Log, Metadata, Record};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Run interpolation-based model checking on the counter `x' = x + step` (wrapping to 0
/// past `max`), starting at 0, against the property `x < threshold`.
#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Largest value of the counter
    #[arg(long, default_value_t = 15)]
    pub max: i64,

    /// Increment of each step
    #[arg(long, default_value_t = 1)]
    pub step: i64,

    /// Bad states are those with `x >= threshold`
    #[arg(long, default_value_t = 5)]
    pub threshold: i64,

    /// Transition relation in the formula syntax over `x` (overrides --step)
    #[arg(long)]
    pub trans: Option<String>,

    /// Deepest unrolling explored (unbounded if not set)
    #[arg(short, long)]
    pub bound: Option<usize>,

    /// Compute interpolants backward from the bad states
    #[arg(long, default_value_t = false)]
    pub backward: bool,

    /// TOML configuration; command line options take precedence
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Colored stderr sink for the `log` facade.
struct TermLogger {
    level: LevelFilter,
}

impl TermLogger {
    fn color(level: Level) -> ColorSpec {
        let mut spec = ColorSpec::new();
        let fg = match level {
            Level::Error => Color::Red,
            Level::Warn => Color::Yellow,
            Level::Info => Color::Green,
            Level::Debug => Color::Cyan,
            Level::Trace => Color::Magenta,
        };
        spec.set_fg(Some(fg)).set_intense(true);
        spec
    }
}

impl Log for TermLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let stderr = StandardStream::stderr(ColorChoice::Auto);
        let mut stderr = stderr.lock();
        // Write failures are ignored.
        let _ = stderr.set_color(&Self::color(record.level()));
        let _ = write!(stderr, "[{:<5}]", record.level());
        let _ = stderr.reset();
        let _ = writeln!(stderr, " {}: {}", record.target(), record.args());
    }

    fn flush(&self) {}
}

fn main() {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    log::set_logger(Box::leak(Box::new(TermLogger { level })))
        .expect("Failed to install the logger");
    log::set_max_level(level);

    let mut config = match &args.config {
        Some(path) => ImcConfig::from_file(path).unwrap_or_else(|e| {
            eprintln!("{e}");
            std::process::exit(2);
        }),
        None => ImcConfig::default(),
    };
    if args.bound.is_some() {
        config.bound = args.bound;
    }
    if args.backward {
        config.direction = Direction::Backward;
    }

    let mut scope = Scope::new();
    let x = scope.declare("x", DataType::bounded(0, args.max));
    let trans = match &args.trans {
        Some(src) => parse(src, &scope).unwrap_or_else(|e| {
            eprintln!("{e}");
            std::process::exit(2);
        }),
        None => {
            let next = x.to_expr() + int(args.step);
            eq(x.primed(), ite(leq(next.clone(), int(args.max)), next, int(0)))
        }
    };
    let property = lt(x.to_expr(), int(args.threshold));

    let mut solver = FiniteItpSolver::new(config.solver);
    let state_of = x.clone();
    let checker = ImcChecker::builder(&mut solver)
        .init(eq(x.at(0).to_expr(), int(0)))
        .action(ExprAction::new(trans))
        .property(property)
        .val_to_state(move |v: &Valuation| v.get_var(&state_of))
        .config(&config)
        .build();
    let result = checker.and_then(|mut checker| checker.check(&()));

    let stdout = StandardStream::stdout(ColorChoice::Auto);
    let mut stdout = stdout.lock();
    let mut color = ColorSpec::new();
    color.set_intense(true);

    match result {
        Ok(result) => {
            let fg = match &result.verdict {
                Verdict::Safe(_) => Color::Green,
                Verdict::Unsafe(_) => Color::Red,
                Verdict::Unknown(_) => Color::Yellow,
            };
            stdout.set_color(color.set_fg(Some(fg))).unwrap();
            writeln!(stdout, "{}", result.verdict).unwrap();
            stdout.reset().unwrap();
            writeln!(stdout, "{}", result.stats).unwrap();

            match &result.verdict {
                Verdict::Safe(proof) => writeln!(stdout, "invariant: {}", proof.image).unwrap(),
                Verdict::Unsafe(cex) => {
                    for (i, state) in cex.states.iter().enumerate() {
                        match state {
                            Some(value) => writeln!(stdout, "  {i}: x = {value}").unwrap(),
                            None => writeln!(stdout, "  {i}: x = ?").unwrap(),
                        }
                    }
                }
                Verdict::Unknown(_) => {}
            }
        }
        Err(e) => {
            stdout.set_color(color.set_fg(Some(Color::Red))).unwrap();
            writeln!(stdout, "Model checking failed: {e}").unwrap();
            stdout.reset().unwrap();
            std::process::exit(1);
        }
    }
    stdout.flush().unwrap();
}
