use std::{
    fs,
    path::{Path, PathBuf},
    process,
};

use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing::debug;

use brook::{
    ByteVm, Compiler, InstructionVm, ObjectFile, VmConfig,
    bytecode::disasm::{format_bytecode, format_chunks},
    encode, link_encoded, link_indexed, parse,
};

const ARTIFACT_EXTENSION: &str = "bkc";
const OBJECT_EXTENSION: &str = "bko";

/// Brook - compile and run programs on a stack machine
#[derive(Parser, Debug)]
#[command(name = "brook", about = "Brook stack machine compiler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a source file to a byte artifact (or an object file)
    Build {
        source: PathBuf,

        /// Output path (defaults to the source path with a new extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write unlinked chunks instead of a linked artifact
        #[arg(long)]
        object: bool,

        /// Function the bootstrap calls
        #[arg(long, default_value = "main")]
        entry: String,
    },

    /// Link an object file into a byte artifact
    Link {
        object: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a source file or a byte artifact and print the result
    Run {
        file: PathBuf,

        /// Abort after this many instructions
        #[arg(long)]
        max_steps: Option<usize>,

        /// Function the bootstrap calls (source files only)
        #[arg(long, default_value = "main")]
        entry: String,
    },

    /// Print a listing of a source file's chunks or an artifact's bytes
    Disasm {
        file: PathBuf,

        /// Function the bootstrap calls (source files only)
        #[arg(long, default_value = "main")]
        entry: String,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("cannot read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("'{}' produced no result", path.display())]
    EmptyStack { path: PathBuf },

    #[error(transparent)]
    Brook(#[from] brook::Error),
}

fn main() {
    let cli = Cli::parse();

    init_logging();

    if let Err(e) = run(cli.command) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    // RUST_LOG controls the level, default warn
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Build {
            source,
            output,
            object,
            entry,
        } => {
            let chunks = compile_file(&source, &entry)?;

            let (bytes, extension) = if object {
                let bytes = ObjectFile::new(chunks)
                    .to_bytes()
                    .map_err(brook::Error::from)?;
                (bytes, OBJECT_EXTENSION)
            } else {
                (link_and_encode(&chunks)?, ARTIFACT_EXTENSION)
            };

            let output = output.unwrap_or_else(|| source.with_extension(extension));
            write_file(&output, &bytes)
        }

        Command::Link { object, output } => {
            let bytes = read_bytes(&object)?;
            let chunks = ObjectFile::from_bytes(&bytes)
                .map_err(brook::Error::from)?
                .into_chunks();

            let output = output.unwrap_or_else(|| object.with_extension(ARTIFACT_EXTENSION));
            write_file(&output, &link_and_encode(&chunks)?)
        }

        Command::Run {
            file,
            max_steps,
            entry,
        } => {
            let config = VmConfig {
                max_steps,
                ..VmConfig::default()
            };

            let result = if is_artifact(&file) {
                let code = read_bytes(&file)?;
                let mut vm = ByteVm::with_config(&code, config);
                vm.run().map_err(brook::Error::from)?;
                vm.result()
            } else {
                let chunks = compile_file(&file, &entry)?;
                let ops = link_indexed(&chunks).map_err(brook::Error::from)?;
                let mut vm = InstructionVm::with_config(&ops, config);
                vm.run().map_err(brook::Error::from)?;
                vm.result()
            };

            match result {
                Some(value) => {
                    println!("{}", value);
                    Ok(())
                }
                None => Err(CliError::EmptyStack { path: file }),
            }
        }

        Command::Disasm { file, entry } => {
            let listing = if is_artifact(&file) {
                format_bytecode(&read_bytes(&file)?).map_err(brook::Error::from)?
            } else {
                format_chunks(&compile_file(&file, &entry)?)
            };

            print!("{}", listing);
            Ok(())
        }
    }
}

fn is_artifact(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ARTIFACT_EXTENSION)
}

fn compile_file(path: &Path, entry: &str) -> Result<Vec<brook::Chunk>, CliError> {
    let source = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let program = parse(&source).map_err(brook::Error::from)?;
    let chunks = Compiler::new()
        .entry(entry)
        .compile_program(&program)
        .map_err(brook::Error::from)?;

    debug!(path = %path.display(), chunks = chunks.len(), "compiled source");
    Ok(chunks)
}

fn link_and_encode(chunks: &[brook::Chunk]) -> Result<Vec<u8>, CliError> {
    let ops = link_encoded(chunks).map_err(brook::Error::from)?;
    Ok(encode(&ops).map_err(brook::Error::from)?)
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, CliError> {
    fs::read(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), CliError> {
    fs::write(path, bytes).map_err(|source| CliError::Write {
        path: path.to_path_buf(),
        source,
    })
}
