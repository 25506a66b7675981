use contractvm::Interpreter;
use contractvm::ast::Value;
use contractvm::section::Section;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::panic;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    if std::env::var_os("RUST_LOG").is_some() {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }

    let result = panic::catch_unwind(run_repl);

    if let Err(panic_info) = result {
        eprintln!("The console encountered an unexpected error and must exit.");

        if let Some(msg) = panic_info.downcast_ref::<&str>() {
            eprintln!("Error: {msg}");
        } else if let Some(msg) = panic_info.downcast_ref::<String>() {
            eprintln!("Error: {msg}");
        } else {
            eprintln!("Error: Unknown panic occurred");
        }

        process::exit(1);
    }
}

fn run_repl() {
    println!("ContractVM console");
    println!("Enter expressions like: (+ 1 2)");
    println!("Input spanning several lines is collected until the parentheses balance.");
    println!("Type :help for more commands, or Ctrl+C to exit.");
    println!();

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(err) => {
            eprintln!("Could not initialize the line editor: {err}");
            return;
        }
    };
    let interp = Interpreter::new();
    let mut section = Section::new();

    loop {
        let prompt = if section.is_empty() { "lisp> " } else { "  ... " };
        match rl.readline(prompt) {
            Ok(line) => {
                if section.is_empty() {
                    match line.trim() {
                        "" => continue,
                        ":help" => {
                            print_help();
                            continue;
                        }
                        ":env" => {
                            print_environment(&interp);
                            continue;
                        }
                        ":quit" | ":exit" => {
                            println!("Goodbye!");
                            break;
                        }
                        _ => {}
                    }
                }
                _ = rl.add_history_entry(line.as_str());

                let mut input = line.into_bytes();
                input.push(b'\n');
                if let Err(e) = section.feed(&input) {
                    println!("Error: {}", e.message);
                    section = Section::new();
                    continue;
                }
                if !section.is_complete() {
                    continue;
                }

                let source = std::mem::take(&mut section).into_source();
                match interp.eval(&source) {
                    Ok(Value::Nothing) => {}
                    Ok(result) => println!("{result}"),
                    Err(e) => println!("Error: {e}"),
                }
            }

            Err(ReadlineError::Interrupted) if !section.is_empty() => {
                // Ctrl+C abandons a partial expression
                section = Section::new();
            }
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {err:?}");
                break;
            }
        }
    }
}

fn print_help() {
    println!("ContractVM console commands:");
    println!("  :help      - Show this help message");
    println!("  :env       - Show current bindings");
    println!("  :quit      - Exit the console");
    println!("  :exit      - Exit the console");
    println!("  Ctrl+C     - Abandon a partial expression, or exit");
    println!();
    println!("Language:");
    println!("  Numbers: 42, -5, 2.5, 'a' (character code)");
    println!("  Strings: \"text\"; literal lists: '(1 2 3)");
    println!("  Definitions: (define x 1), (defun add (a b) (+ a b))");
    println!("  Flow: if, cond, block/return-from, loop, while, until, for");
    println!("  Comments start with # and run to the end of the line");
    println!();
    println!("Examples:");
    println!("  (defun fact (n) (if (< n 2) 1 (* n (fact (- n 1)))))");
    println!("  (fact 10)");
    println!("  (for x '(1 2 3) (println x))");
    println!();
}

fn print_environment(interp: &Interpreter) {
    let builtins = interp.root().names();
    let user_defined = interp.program().names();

    println!("Built-in functions ({}):", builtins.len());
    // Print in columns for readability
    let mut col = 0;
    for name in &builtins {
        print!("  {name:<15}");
        col += 1;
        if col % 4 == 0 {
            println!();
        }
    }
    if col % 4 != 0 {
        println!();
    }
    println!();

    if user_defined.is_empty() {
        println!("No user-defined values.");
        return;
    }
    println!("User-defined values ({}):", user_defined.len());
    for name in user_defined {
        if let Some(value) = interp.lookup(&name) {
            println!("  {name} = {value}");
        }
    }
}
