use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{config::Config as EditorConfig, Editor};
use simplelog::{Config as LogConfig, LevelFilter, SimpleLogger};

use nssm::lang::lex::DEFAULT_MAX_NESTING;
use nssm::lang::runtime::DEFAULT_MAX_DEPTH;
use nssm::{Config, Runtime, Value};

mod repl;

use repl::ReplHelper;

const HISTORY_FILE: &str = ".nssm_history";
const PROMPT: &str = "(nssm) ";

#[derive(Parser)]
#[command(version, about)]
struct Opt {
    /// Show debug output
    #[arg(short, long)]
    debug: bool,
    /// Nesting of function calls and blocks allowed before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,
    /// Bracket nesting allowed in source text
    #[arg(long, default_value_t = DEFAULT_MAX_NESTING)]
    max_nesting: usize,
    /// Script to run. Starts a REPL if omitted
    script: Option<PathBuf>,
}

fn init_logging(debug: bool) -> Result<()> {
    let filter = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Error
    };

    match SimpleLogger::init(filter, LogConfig::default()) {
        Ok(_) => Ok(()),
        Err(e) => bail!("Failed to init logger: {}", e),
    }
}

/// `print(args...)`: write the arguments to stdout, space separated
fn print_function() -> Value {
    Value::native("print", None, |args| {
        let line: Vec<String> = args.iter().map(|v| v.to_string()).collect();
        println!("{}", line.join(" "));

        Ok(Value::Null)
    })
}

fn init_runtime(opts: &Opt) -> Runtime {
    let config = Config {
        max_depth: opts.max_depth,
        max_nesting: opts.max_nesting,
    };

    Runtime::with_bindings(config, vec![("print".to_string(), print_function())])
}

fn init_editor() -> Result<Editor<ReplHelper, DefaultHistory>> {
    let config = EditorConfig::builder().auto_add_history(true).build();
    let mut editor = match Editor::with_config(config) {
        Ok(e) => e,
        Err(e) => bail!("Failed to init editor: {}", e),
    };
    editor.set_helper(Some(ReplHelper::new()));

    Ok(editor)
}

fn init_history(editor: &mut Editor<ReplHelper, DefaultHistory>) {
    let _ = editor.load_history(HISTORY_FILE);
}

fn save_history(editor: &mut Editor<ReplHelper, DefaultHistory>) -> Result<()> {
    match editor.save_history(HISTORY_FILE) {
        Ok(_) => Ok(()),
        Err(e) => bail!("Failed to save history: {}", e),
    }
}

fn welcome() {
    println!(r#"nssm v{}"#, env!("CARGO_PKG_VERSION"));
    println!("Press Ctrl-D to quit");
    println!();
}

fn run_script(runtime: &mut Runtime, path: &Path) -> Result<()> {
    let src = fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    info!("running {}", path.display());

    match runtime.eval(&src) {
        Ok(_) => Ok(()),
        Err(e) => bail!("{}", e),
    }
}

fn run_repl(runtime: &mut Runtime) -> Result<()> {
    let mut editor = init_editor()?;
    init_history(&mut editor);
    welcome();

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                info!("read: {}", &line);

                match runtime.eval(&line) {
                    Ok(Value::Null) => (),
                    Ok(val) => println!("{}", val.repr()),
                    Err(e) => eprintln!("{}", e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                eprintln!("Press Ctrl-D to quit");
            }
            Err(ReadlineError::Eof) => {
                println!("quit");
                break;
            }
            Err(e) => {
                error!("Unexpected error: {}", e);
                println!("quit");
                break;
            }
        }
    }

    save_history(&mut editor)
}

fn main() -> Result<()> {
    let opts = Opt::parse();
    init_logging(opts.debug)?;

    let mut runtime = init_runtime(&opts);

    match &opts.script {
        Some(path) => run_script(&mut runtime, path),
        None => run_repl(&mut runtime),
    }
}
