use std::{
    fs,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::Parser;
use log::debug;

use loxbc::{
    VmConfig,
    bytecode::{compile, disasm::disassemble_program, image},
    frontend::{lexer::Lexer, token_dumper::TokenDumper},
    lang::object::Function,
    runtime::Vm,
};

// sysexits(3)
const EX_USAGE: u8 = 64;
const EX_DATAERR: u8 = 65;
const EX_SOFTWARE: u8 = 70;
const EX_IOERR: u8 = 74;

#[derive(Parser, Debug)]
#[command(name = "loxbc", version)]
#[command(about = "Compile and run Lox programs on a bytecode VM")]
struct Args {
    /// `.lox` source or `.loxc` image to run; starts a REPL when omitted
    script: Option<PathBuf>,

    /// Print the token stream instead of running
    #[arg(long)]
    tokens: bool,

    /// Disable ANSI colours in the token dump
    #[arg(long = "no-color")]
    no_color: bool,

    /// Show lexemes instead of token kinds in the token dump
    #[arg(long)]
    pretty: bool,

    /// Print the disassembled bytecode before running
    #[arg(long, alias = "bc")]
    disasm: bool,

    /// Write a compiled image to PATH instead of running
    #[arg(long, value_name = "PATH")]
    emit: Option<PathBuf>,

    /// Maximum call depth
    #[arg(long, default_value_t = 64)]
    max_frames: usize,

    /// Abort after this many instructions
    #[arg(long)]
    max_steps: Option<usize>,
}

impl Args {
    fn config(&self) -> VmConfig {
        VmConfig {
            max_frames: self.max_frames,
            max_steps: self.max_steps,
        }
    }
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(EX_IOERR)
        }
    }
}

fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .try_init();
}

fn usage_error(message: &str) -> Result<ExitCode> {
    eprintln!("error: {}", message);
    Ok(ExitCode::from(EX_USAGE))
}

fn run(args: &Args) -> Result<ExitCode> {
    let Some(path) = &args.script else {
        if args.tokens || args.emit.is_some() {
            return usage_error("--tokens and --emit need a SCRIPT");
        }
        return repl(args);
    };

    match path.extension().and_then(|e| e.to_str()) {
        Some("lox") => run_source_file(path, args),
        Some("loxc") => run_image_file(path, args),
        _ => usage_error(&format!(
            "expected a .lox or .loxc file, got {}",
            path.display()
        )),
    }
}

fn run_source_file(path: &Path, args: &Args) -> Result<ExitCode> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;

    if args.tokens {
        let mut dumper = TokenDumper::new();
        if args.no_color {
            dumper = dumper.no_color();
        }
        if args.pretty {
            dumper = dumper.pretty();
        }
        let tokens = Lexer::new(&source).tokenize();
        dumper
            .dump(&mut io::stdout().lock(), &tokens)
            .context("failed to write tokens")?;
        return Ok(ExitCode::SUCCESS);
    }

    let script = match compile(&source) {
        Ok(script) => script,
        Err(errors) => {
            println!("{}", errors);
            return Ok(ExitCode::from(EX_DATAERR));
        }
    };

    if let Some(out) = &args.emit {
        let bytes = image::encode(&script)?;
        fs::write(out, &bytes).with_context(|| format!("failed to write '{}'", out.display()))?;
        debug!("wrote {} bytes to {}", bytes.len(), out.display());
        return Ok(ExitCode::SUCCESS);
    }

    execute(script, args)
}

fn run_image_file(path: &Path, args: &Args) -> Result<ExitCode> {
    if args.tokens || args.emit.is_some() {
        return usage_error("--tokens and --emit need a .lox source");
    }

    let bytes = fs::read(path).with_context(|| format!("failed to read '{}'", path.display()))?;
    let script = match image::decode(&bytes) {
        Ok(script) => script,
        Err(e) => {
            eprintln!("error: {}: {}", path.display(), e);
            return Ok(ExitCode::from(EX_DATAERR));
        }
    };

    execute(script, args)
}

fn execute(script: Function, args: &Args) -> Result<ExitCode> {
    let mut stdout = io::stdout().lock();
    if args.disasm {
        write!(stdout, "{}", disassemble_program(&script)).context("failed to write disassembly")?;
    }

    let mut vm = Vm::with_config(stdout, args.config());
    match vm.run(script) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(_) => Ok(ExitCode::from(EX_SOFTWARE)),
    }
}

/// Reads one line at a time; every line runs on the same VM so globals
/// carry over. Errors are reported and the session continues.
fn repl(args: &Args) -> Result<ExitCode> {
    let mut vm = Vm::with_config(io::stdout(), args.config());
    let mut input = io::stdin().lock();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush().context("failed to flush stdout")?;

        line.clear();
        if input.read_line(&mut line).context("failed to read stdin")? == 0 {
            println!();
            return Ok(ExitCode::SUCCESS);
        }

        if args.disasm {
            match compile(&line) {
                Ok(script) => {
                    print!("{}", disassemble_program(&script));
                    if let Err(e) = vm.run(script) {
                        debug!("{}", e.message);
                    }
                }
                Err(errors) => println!("{}", errors),
            }
        } else if let Err(e) = vm.interpret(&line) {
            debug!("{}", e);
        }
    }
}
