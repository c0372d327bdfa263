use clap::{crate_name, crate_version, App, AppSettings};
use env_logger::Env;
use log::error;
use rayon::ThreadPoolBuilder;

use supernovo::cli;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let matches = App::new(crate_name!())
        .version(crate_version!())
        .max_term_width(120)
        .setting(AppSettings::DeriveDisplayOrder)
        .args(cli::args::all())
        .get_matches();

    let threads = cli::parse::threads(&matches);
    ThreadPoolBuilder::new().num_threads(threads).build_global().expect("Failed to initialize global thread pool");

    if let Err(cause) = cli::run(&matches) {
        error!("{:#}", cause);
        std::process::exit(1);
    }
}
