use clap::{Arg, ArgAction, Command};
use sel::runner::{self, RunOptions};
use sel::repl;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("sel")
        .about("Evaluate expressions of a small expression language")
        .arg(
            Arg::new("expr")
                .help("The expression to evaluate; omit to start the REPL")
                .value_name("EXPR")
                .index(1),
        )
        .arg(
            Arg::new("interactive")
                .short('i')
                .long("interactive")
                .help("Start in interactive REPL mode")
                .action(ArgAction::SetTrue)
                .conflicts_with("expr"),
        )
        .arg(
            Arg::new("var")
                .long("var")
                .value_name("NAME=EXPR")
                .help("Bind NAME to the value of EXPR (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("tokens")
                .long("tokens")
                .help("Print the token stream before evaluating")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("ast")
                .long("ast")
                .help("Print the parsed expression, fully parenthesized")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log each stage at debug level")
                .action(ArgAction::SetTrue),
        )
}

fn main() -> ExitCode {
    let matches = cli().get_matches();

    init_tracing(matches.get_flag("verbose"));

    let mut environment = runner::default_environment();
    for binding in matches.get_many::<String>("var").into_iter().flatten() {
        match runner::parse_binding(binding, &environment) {
            Ok((name, value)) => environment.define(name, value),
            Err(error) => {
                eprintln!("Error: {}", error);
                return ExitCode::FAILURE;
            }
        }
    }

    let options = RunOptions {
        show_tokens: matches.get_flag("tokens"),
        show_ast: matches.get_flag("ast"),
    };

    match matches.get_one::<String>("expr") {
        Some(source) => {
            if runner::run(source, &environment, options, None) {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        _ => {
            repl::start(environment, options);
            ExitCode::SUCCESS
        }
    }
}

/// `--verbose` turns on debug output; otherwise only `RUST_LOG` does.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("sel=debug")
    } else if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        return;
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn interactive_flag_conflicts_with_an_expression() {
        assert!(cli().try_get_matches_from(["sel", "-i", "1 + 2"]).is_err());
        assert!(cli().try_get_matches_from(["sel", "1 + 2"]).is_ok());
        assert!(cli().try_get_matches_from(["sel", "-i"]).is_ok());
    }
}
