use std::process::ExitCode;

fn main() -> ExitCode {
    sfquery_cli::run()
}
