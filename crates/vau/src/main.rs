use std::path::PathBuf;

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use vau_core::VauError;
use vau_eval::Interpreter;

#[derive(Parser)]
#[command(name = "vau", about = "vau: a small fexpr language with exact rationals")]
struct Cli {
    /// File to execute
    file: Option<String>,

    /// Evaluate an expression
    #[arg(short, long)]
    eval: Option<String>,

    /// Library file to load before anything else (repeatable)
    #[arg(short, long = "load", value_name = "FILE")]
    load: Vec<String>,

    /// Start the REPL without the greeting
    #[arg(long)]
    no_repl_banner: bool,

    /// Print environment counters after each REPL evaluation
    #[arg(long)]
    gc_stats: bool,
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_env("VAU_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let interpreter = match load_libraries(&cli.load) {
        Ok(interpreter) => interpreter,
        Err((lib, e)) => {
            report(&format!("Error loading {lib}"), &e);
            std::process::exit(1);
        }
    };

    if let Some(expr) = &cli.eval {
        match interpreter.eval_str(expr) {
            Ok(val) => println!("{val}"),
            Err(e) => {
                report("Error", &e);
                std::process::exit(1);
            }
        }
        return;
    }

    if let Some(file) = &cli.file {
        if let Err(e) = interpreter.load_file(file) {
            report(&format!("Error in {file}"), &e);
            std::process::exit(1);
        }
        return;
    }

    repl(interpreter, &cli);
}

/// A fresh interpreter with every `--load` library evaluated in order.
fn load_libraries(libs: &[String]) -> Result<Interpreter, (String, VauError)> {
    let interpreter = Interpreter::new();
    for lib in libs {
        interpreter.load_file(lib).map_err(|e| (lib.clone(), e))?;
    }
    Ok(interpreter)
}

fn report(prefix: &str, err: &VauError) {
    eprintln!("{prefix}: {err}");
    if let Some(trace) = err.stack_trace() {
        eprintln!("Call stack:");
        eprint!("{trace}");
    }
}

fn repl(mut interpreter: Interpreter, cli: &Cli) {
    let mut rl = DefaultEditor::new().expect("failed to create editor");
    let history_path = history_path();
    let _ = rl.load_history(&history_path);

    if !cli.no_repl_banner {
        println!("vau v{}", env!("CARGO_PKG_VERSION"));
        println!("Type :help for help, quit to exit\n");
    }

    let mut buffer = String::new();
    let mut in_multiline = false;

    loop {
        let prompt = if in_multiline { "  ... " } else { "vau> " };
        match rl.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();

                if !in_multiline {
                    match trimmed {
                        "quit" | "exit" => break,
                        ":help" => {
                            print_help();
                            continue;
                        }
                        ":gc" => {
                            let before = interpreter.registered_env_count();
                            let stats = interpreter.collect();
                            println!(
                                "registered {before} -> {} (marked {}, swept {})",
                                stats.registered, stats.marked, stats.swept
                            );
                            continue;
                        }
                        ":reload" => {
                            match load_libraries(&cli.load) {
                                Ok(fresh) => {
                                    interpreter = fresh;
                                    println!("global environment rebuilt");
                                }
                                Err((lib, e)) => report(&format!("Error loading {lib}"), &e),
                            }
                            continue;
                        }
                        ":env-counts" => {
                            print_env_counts(&interpreter);
                            continue;
                        }
                        ":stack-depth" => {
                            println!("max stack depth: {}", interpreter.max_call_stack_depth());
                            continue;
                        }
                        _ => {}
                    }
                }

                if in_multiline {
                    buffer.push('\n');
                    buffer.push_str(&line);
                } else {
                    buffer = line.clone();
                }

                if !is_balanced(&buffer) {
                    in_multiline = true;
                    continue;
                }

                in_multiline = false;
                let input = buffer.trim().to_string();
                buffer.clear();

                if input.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(&input);

                interpreter.reset_max_call_stack_depth();
                match interpreter.eval_str(&input) {
                    Ok(val) => println!("{val}"),
                    Err(e) => report("Error", &e),
                }
                if cli.gc_stats {
                    print_env_counts(&interpreter);
                }
            }
            Err(ReadlineError::Interrupted) => {
                if in_multiline {
                    buffer.clear();
                    in_multiline = false;
                    println!("^C");
                    continue;
                }
                break;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Error: {e}");
                break;
            }
        }
    }

    let _ = rl.save_history(&history_path);
}

/// True once every `(` outside a string literal or comment has been closed.
fn is_balanced(input: &str) -> bool {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut in_comment = false;
    let mut escape = false;
    for ch in input.chars() {
        if in_comment {
            if ch == '\n' {
                in_comment = false;
            }
            continue;
        }
        if escape {
            escape = false;
            continue;
        }
        if ch == '\\' && in_string {
            escape = true;
            continue;
        }
        if ch == '"' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }
        match ch {
            ';' => in_comment = true,
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
    }
    depth <= 0 && !in_string
}

fn print_help() {
    println!("vau REPL Commands:");
    println!("  quit / exit    Exit the REPL");
    println!("  :help          Show this help");
    println!("  :gc            Collect unreachable environments");
    println!("  :reload        Rebuild the global environment and reload --load files");
    println!("  :env-counts    Show constructed and registered environment counts");
    println!("  :stack-depth   Show the deepest call stack of the last evaluation");
    println!();
    println!("Control operatives:");
    println!("  vau, eval, define, define-mutable, set!, invoke, do, try, q");
    println!("Booleans are operatives: ((= a b) then else) evaluates one branch.");
}

fn print_env_counts(interpreter: &Interpreter) {
    println!(
        "environments: constructed {}, registered {}",
        interpreter.constructed_env_count(),
        interpreter.registered_env_count()
    );
}

fn history_path() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".vau_history")
}
