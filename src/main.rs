extern crate clap;
#[macro_use] extern crate log;
extern crate fern;
extern crate chrono;
extern crate term_grid;
extern crate mcodelex;

use clap::{Arg, ArgMatches, App};
use term_grid::{Grid, GridOptions, Direction, Filling, Cell};

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use mcodelex::{Lexer, Token};

fn main() {
    let args = process_arguments();
    initialize_logging(args.occurrences_of("verbose"));

    debug!("Arguments:\n\tVerbosity: {}\n\tShow: {}\n\tTable: {}\n\tOutfile: {}\n\tInfile: {}",
        verbosity_filter(args.occurrences_of("verbose")),
        args.is_present("show"),
        args.is_present("table"),
        args.value_of("output").unwrap_or("None"),
        args.value_of("INPUT").unwrap_or("None")
    );

    let lexer = match Lexer::shared() {
        Ok(lexer) => lexer,
        Err(err) => {
            error!("fatal: lexer table is invalid: {}", err);
            std::process::exit(1);
        },
    };

    if args.is_present("table") {
        print!("{}", lexer.table().describe());
        return;
    }

    let ifile = match args.value_of("INPUT") {
        Some(name) => name,
        None => {
            error!("fatal: no input file given");
            std::process::exit(1);
        },
    };
    let source = match read_source(ifile) {
        Ok(source) => source,
        Err(err) => {
            error!("fatal: unable to read input file `{}`: {}", ifile, err);
            std::process::exit(1);
        },
    };

    let tokens = match lexer.tokenize_all(&source) {
        Ok(tokens) => tokens,
        Err(err) => {
            error!("fatal: {}", err);
            std::process::exit(1);
        },
    };
    info!("{} tokens from {} bytes", tokens.len(), source.len());

    let listing = if args.is_present("show") {
        grid_listing(&tokens)
    } else {
        plain_listing(&tokens)
    };

    let written = match args.value_of("output") {
        Some(filename) => File::create(Path::new(filename))
            .and_then(|mut ofile| ofile.write_all(listing.as_bytes())),
        None => io::stdout().write_all(listing.as_bytes()),
    };
    if let Err(err) = written {
        error!("fatal: unable to write token listing `{}`: {}", args.value_of("output").unwrap_or("stdout"), err);
        std::process::exit(1);
    }
}

/// Reads the whole source; `-` means stdin.
fn read_source(name: &str) -> io::Result<String> {
    let mut source = String::new();
    if name == "-" {
        io::stdin().read_to_string(&mut source)?;
    } else {
        File::open(Path::new(name))?.read_to_string(&mut source)?;
    }
    Ok(source)
}

fn plain_listing(tokens: &[Token]) -> String {
    let mut out = String::with_capacity(tokens.len() * 24);
    for tok in tokens {
        out.push_str(&format!("{}\t{}\t{}\t{:?}\n", tok.start, tok.end, tok.kind, tok.text));
    }
    out
}

fn grid_listing(tokens: &[Token]) -> String {
    let mut grid = Grid::new(GridOptions {
        filling:     Filling::Spaces(1),
        direction:   Direction::LeftToRight,
    });

    for tok in tokens {
        grid.add(Cell::from(format!("0x{:04X}:", tok.start)));
        grid.add(Cell::from(tok.kind.as_str().to_string()));
        grid.add(Cell::from("=>".to_string()));
        grid.add(Cell::from(format!("{:?}", tok.text)));
    }

    format!("{}", grid.fit_into_columns(4))
}

fn process_arguments() -> ArgMatches<'static> {
    App::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(Arg::with_name("INPUT")
            .help("Sets the MCODE source file to tokenize, or - for stdin")
            .required_unless("table")
            .multiple(false)
            .index(1))
        .arg(Arg::with_name("verbose")
            .short("v")
            .multiple(true)
            .takes_value(false)
            .help("Sets the level of verbosity"))
        .arg(Arg::with_name("output")
            .short("o")
            .takes_value(true)
            .help("write the token listing to an outfile"))
        .arg(Arg::with_name("show")
            .short("s")
            .long("show")
            .alias("d")
            .takes_value(false)
            .help("prints the tokens as an aligned table"))
        .arg(Arg::with_name("table")
            .short("t")
            .long("table")
            .takes_value(false)
            .help("prints the lexer state table and exits"))
        .get_matches()
}

fn verbosity_filter(verbosity: u64) -> log::LevelFilter {
    match verbosity {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        3 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

fn initialize_logging(verbosity: u64) {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(verbosity_filter(verbosity))
        // Logs go to stderr so stdout stays a clean token listing.
        .chain(std::io::stderr())
        .apply().ok();
}
