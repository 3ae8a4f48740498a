use std::process::ExitCode;

fn main() -> ExitCode {
    // .env is optional; real environment variables win
    let _ = dotenvy::dotenv();
    tanya_cli::run()
}
