use std::process::ExitCode;

fn main() -> ExitCode {
    permcheck::projects::cli::start_cli()
}
