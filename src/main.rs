//! Reads a JSON list of points, builds a Yandex Maps URL with one labelled
//! pin per point, and opens it in the system's default browser.

use std::process::ExitCode;

use env_logger::Env;
use log::error;

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match ymaps_points::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
