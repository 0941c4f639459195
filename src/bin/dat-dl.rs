//! dat-dl CLI - download the contents of DAT files from a Myrient-style mirror.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use clap::Parser;
use tokio_util::sync::CancellationToken;

use dat_dl::Error;
use dat_dl::cli::{Args, Tone, run, say};

const EXIT_INTERRUPTED: i32 = 130;

fn main() {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            say(Tone::Red, &format!("Failed to start runtime: {e}"));
            std::process::exit(1);
        }
    };

    let cancel = CancellationToken::new();
    let result = runtime.block_on(async {
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_signal.cancel();
            }
        });
        run(args, cancel.clone()).await
    });
    // A prompt may still be blocked reading stdin.
    runtime.shutdown_background();

    let code = match result {
        Ok(()) => 0,
        Err(Error::Cancelled) => {
            println!();
            say(Tone::Red, "Exiting script!");
            EXIT_INTERRUPTED
        }
        Err(e) => {
            say(Tone::Red, &e.to_string());
            1
        }
    };
    std::process::exit(code);
}
