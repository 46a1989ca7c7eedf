use std::io;

use colored::{Color, ColoredString, Colorize};
use itertools::Itertools;
use log::Level;
use structopt::StructOpt;

use crate::driver::{self, Options};
use crate::errors::BindError;

#[derive(Debug, StructOpt)]
#[structopt(name = "databind", about = "Compiles binding layout XML into Java sources")]
pub struct Cli {
    #[structopt(
        long, env = "LOG_LEVEL",
        help = "Sets the log level",
        default_value = "info",
        possible_values = &["off", "error", "warn", "info", "debug"],
        global = true
    )]
    log_level: log::LevelFilter,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Generate binding classes for a module's layout resources.
    Generate(Options),
}

pub fn run() {
    let cli: Cli = Cli::from_args();

    // set up logging
    fern::Dispatch::new()
        .format(move |out, message, record| {
            let level = record.level();
            let color = match level {
                Level::Error => Color::Red,
                Level::Warn => Color::Yellow,
                Level::Info => Color::Blue,
                Level::Debug => Color::Magenta,
                Level::Trace => Color::Green,
            };
            out.finish(format_args!(
                "{} {}",
                ColoredString::from((level.to_string().to_lowercase() + ":").as_str())
                    .color(color)
                    .to_string(),
                message
            ))
        })
        .level(cli.log_level)
        .chain(io::stderr())
        .apply()
        .unwrap();

    match cli.cmd {
        Command::Generate(options) => generate(options),
    }
}

fn generate(options: Options) {
    match driver::run(&options) {
        Ok(summary) => {
            for warning in &summary.warnings {
                warning.emit();
            }
            log::info!(
                "generated {} binding classes in {}",
                summary.written.len(),
                options.out_dir.display()
            );
        }
        Err(errors) => {
            let emitted = emit_errors(errors);
            eprintln!(
                "{}",
                format!("aborting due to {} previous error(s)", emitted).red()
            );
            std::process::exit(1);
        }
    }
}

/// Errors at the same location collapse into one report.
fn emit_errors(errors: Vec<BindError>) -> usize {
    let mut emitted = 0;
    for ((kind, src), group) in &errors.into_iter().group_by(|err| (err.kind, err.src.clone())) {
        let msg = group.map(|err| err.msg).collect::<Vec<_>>().join("\n");
        let err = BindError { msg, src, kind };
        err.emit();
        emitted += 1;
    }
    emitted
}
