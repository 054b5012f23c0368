use std::process::ExitCode;

fn main() -> ExitCode {
    hookrelay_cli::run()
}
