use crate::evaluator::Environment;
use crate::runner::{self, RunOptions};
use std::io::{self, Write};
use tracing::debug;

/// Interactive loop. Bindings made with `:set` persist between lines.
pub fn start(mut environment: Environment, options: RunOptions) {
    println!("SEL Expression Evaluator v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'exit' or press Ctrl+D to quit; ':set NAME EXPR' binds a name, ':env' lists bindings");
    println!();

    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            break;
        }

        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => {
                // EOF reached (Ctrl+D or piped input ended)
                println!();
                break;
            }
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "exit" || line == "quit" {
                    println!("Goodbye!");
                    break;
                }

                if let Some(command) = line.strip_prefix(':') {
                    run_command(command, &mut environment);
                } else {
                    runner::run(line, &environment, options, None);
                }
            }
            Err(error) => {
                eprintln!("Error reading input: {}", error);
                break;
            }
        }
    }
}

fn run_command(command: &str, environment: &mut Environment) {
    let (name, rest) = command.split_once(' ').unwrap_or((command, ""));

    match name {
        "env" => {
            let mut bindings: Vec<_> = environment.iter().collect();
            bindings.sort_by_key(|(name, _)| *name);
            for (name, value) in bindings {
                println!("{} = {}", name, value);
            }
        }
        "set" => {
            let binding = match rest.trim().split_once(char::is_whitespace) {
                Some((name, source)) => format!("{}={}", name, source),
                None => rest.trim().to_string(),
            };
            match runner::parse_binding(&binding, environment) {
                Ok((name, value)) => {
                    debug!(%name, %value, "bound name");
                    environment.define(name, value);
                }
                Err(error) => eprintln!("Error: {}", error),
            }
        }
        _ => eprintln!("Unknown command ':{}'. Available: :set NAME EXPR, :env", name),
    }
}
