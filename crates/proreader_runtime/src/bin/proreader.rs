//! proreader CLI entry point.

use std::env;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;

use proreader_runtime::{ProjectReader, Report, init_tracing};

/// CLI configuration parsed from arguments.
#[derive(Default)]
struct CliConfig {
    project: Option<PathBuf>,
    qt_dir: Option<PathBuf>,
    output: Option<PathBuf>,
    verbose: bool,
    show_help: bool,
    show_version: bool,
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("proreader: warning: {e}");
            ExitCode::FAILURE
        }
    }
}

fn parse_args(args: Vec<String>) -> Result<CliConfig, Box<dyn std::error::Error>> {
    let mut config = CliConfig::default();
    let mut positional = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => config.show_help = true,
            "-V" | "--version" => config.show_version = true,
            "-v" | "--verbose" => config.verbose = true,
            option @ ("--qtdir" | "-o" | "--output") => {
                i += 1;
                if i >= args.len() {
                    return Err(format!("{option} requires a value").into());
                }
                let value = PathBuf::from(&args[i]);
                if option == "--qtdir" {
                    config.qt_dir = Some(value);
                } else {
                    config.output = Some(value);
                }
            }
            arg if arg.starts_with('-') && arg.len() > 1 => {
                return Err(format!("unknown option: {arg}").into());
            }
            path => positional.push(PathBuf::from(path)),
        }
        i += 1;
    }

    // `proreader QTDIR FILE` is accepted for compatibility with older callers.
    match positional.len() {
        0 => {}
        1 => config.project = positional.pop(),
        2 => {
            config.project = positional.pop();
            if config.qt_dir.is_none() {
                config.qt_dir = positional.pop();
            }
        }
        _ => return Err("expected a single project file".into()),
    }

    Ok(config)
}

fn run(args: Vec<String>) -> Result<bool, Box<dyn std::error::Error>> {
    let config = parse_args(args)?;

    if config.show_help {
        print_help();
        return Ok(true);
    }

    if config.show_version {
        println!("proreader {}", env!("CARGO_PKG_VERSION"));
        return Ok(true);
    }

    init_tracing(config.verbose);

    let Some(project) = config.project else {
        return Err("no project file given (see --help)".into());
    };

    let mut reader = ProjectReader::new();
    if let Some(dir) = config.qt_dir {
        reader.set_qt_dir(dir);
    }
    if let Err(err) = reader.try_read_file(&project) {
        eprintln!("proreader: warning: could not read {}: {err}", project.display());
        return Ok(false);
    }

    let report = Report::from_reader(&reader);
    match config.output {
        Some(path) => report.write_to(&mut BufWriter::new(File::create(path)?))?,
        None => report.write_to(&mut io::stdout().lock())?,
    }
    Ok(true)
}

fn print_help() {
    println!(
        "proreader - Reads qmake project files

USAGE:
    proreader [OPTIONS] <FILE.pro>
    proreader <QTDIR> <FILE.pro>

ARGUMENTS:
    <FILE.pro>       Project file to read

OPTIONS:
    --qtdir DIR      Qt installation used for $$[QT_*] properties
    -o, --output F   Write the XML report to F instead of stdout
    -v, --verbose    Log evaluation to stderr (RUST_LOG overrides)
    -h, --help       Print help information
    -V, --version    Print version information

OUTPUT:
    An XML document with the project's SOURCES, HEADERS, RESOURCES and
    FORMS, and whether CONFIG contains 'flat'. Nothing is printed and the
    exit code is 1 if the project cannot be read."
    );
}
