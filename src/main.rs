use clap::{Parser as ClapParser, Subcommand};
use pipegen::cli::{self, CliError, DecodeOptions, GenerateOptions};
use pipegen::codegen::Geometry;
use pipegen::decode::DecodeConfig;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

#[derive(ClapParser)]
#[command(name = "pipegen")]
#[command(about = "Pipegen - Generates dataplane pipeline programs from lowered query schemas")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a pipeline program from a lowered query schema
    Generate {
        /// Schema file (reads from stdin if not provided)
        input: Option<PathBuf>,

        /// Output file (writes to stdout if not provided)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Row count of each group-by backing store
        #[arg(long, default_value_t = 1024)]
        table_size: u32,

        /// Pipeline template file overriding the built-in one
        #[arg(long)]
        template: Option<PathBuf>,

        /// Group-by actions template file overriding the built-in one
        #[arg(long)]
        groupby_template: Option<PathBuf>,

        /// Superseded: explicit key width in bits
        #[arg(long, hide = true)]
        key_width: Option<u32>,

        /// Superseded: explicit value width in bits
        #[arg(long, hide = true)]
        value_width: Option<u32>,

        /// Superseded: backing-store associativity
        #[arg(long, hide = true, value_parser = clap::value_parser!(u8).range(1..=4))]
        ways: Option<u8>,
    },

    /// Decode a diagnostic register dump into key/value pairs
    Decode {
        /// Dump file (reads from stdin if not provided)
        input: Option<PathBuf>,

        /// Width of each packed key chunk, in bits
        #[arg(long, default_value_t = 16)]
        key_width: u32,

        /// Width of each packed value chunk, in bits
        #[arg(long, default_value_t = 16)]
        value_width: u32,

        /// Bits per key sub-part for dotted display (0 disables splitting)
        #[arg(long, default_value_t = 0)]
        sub_key_width: u32,

        /// Register holding packed keys
        #[arg(long, default_value = "kvKeys")]
        key_register: String,

        /// Register holding packed values
        #[arg(long, default_value = "kvValues")]
        value_register: String,

        /// Emit a JSON object instead of text lines
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate {
            input,
            output,
            table_size,
            template,
            groupby_template,
            key_width,
            value_width,
            ways,
        } => run_generate(
            input,
            output,
            table_size,
            template,
            groupby_template,
            key_width,
            value_width,
            ways,
        ),
        Commands::Decode {
            input,
            key_width,
            value_width,
            sub_key_width,
            key_register,
            value_register,
            json,
        } => run_decode(
            input,
            key_width,
            value_width,
            sub_key_width,
            key_register,
            value_register,
            json,
        ),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn read_input(path: Option<&PathBuf>) -> Result<String, CliError> {
    match path {
        Some(p) => fs::read_to_string(p).map_err(CliError::Io),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(CliError::Io)?;
            Ok(buffer)
        }
        None => Err(CliError::NoInput),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_generate(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    table_size: u32,
    template: Option<PathBuf>,
    groupby_template: Option<PathBuf>,
    key_width: Option<u32>,
    value_width: Option<u32>,
    ways: Option<u8>,
) -> Result<(), CliError> {
    let schema = read_input(input.as_ref())?;

    let geometry = if key_width.is_none() && value_width.is_none() && ways.is_none() {
        Geometry::Fixed
    } else {
        Geometry::Explicit {
            key_width: key_width.unwrap_or(32),
            value_width: value_width.unwrap_or(32),
            ways: ways.unwrap_or(4),
        }
    };

    let template = match template {
        Some(path) => Some(fs::read_to_string(path).map_err(CliError::Io)?),
        None => None,
    };
    let groupby_template = match groupby_template {
        Some(path) => Some(fs::read_to_string(path).map_err(CliError::Io)?),
        None => None,
    };

    let options = GenerateOptions {
        schema,
        table_size,
        geometry,
        template,
        groupby_template,
    };

    let rendered = cli::execute_generate(&options)?;
    match output {
        Some(path) => fs::write(path, rendered).map_err(CliError::Io)?,
        None => print!("{}", rendered),
    }
    Ok(())
}

fn run_decode(
    input: Option<PathBuf>,
    key_width: u32,
    value_width: u32,
    sub_key_width: u32,
    key_register: String,
    value_register: String,
    json: bool,
) -> Result<(), CliError> {
    let dump = read_input(input.as_ref())?;

    let options = DecodeOptions {
        dump,
        config: DecodeConfig {
            key_width,
            value_width,
            sub_key_width,
            key_register,
            value_register,
        },
        json,
    };

    print!("{}", cli::execute_decode(&options)?);
    Ok(())
}
