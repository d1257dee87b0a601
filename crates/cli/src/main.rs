use std::process::ExitCode;

fn main() -> ExitCode {
    haulvoice_cli::run()
}
