//! build-guest-image - database guest VM image launcher.
//!
//! Prints the resolved build settings, asks for confirmation and runs
//! disk-image-create. Exit code 0 means the image was built, or nothing was
//! requested (help, declined confirmation).

use guest_image_launcher::cli::{self, Args, Parsed};
use std::process;

const ERROR_MARKER: &str = "[ERROR]";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = match Args::parse_args() {
        Ok(Parsed::Run(args)) => args,
        Ok(Parsed::Display(text)) => {
            print!("{}", text);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{} {}", ERROR_MARKER, e);
            process::exit(1);
        }
    };

    cli::init_logging(args.debug);

    let exit_code = match cli::run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", ERROR_MARKER, e);
            1
        }
    };

    process::exit(exit_code);
}
