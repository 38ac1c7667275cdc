use clap::Parser;
use crqa_client::Config;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::parse();
    if let Err(err) = crqa_client::run(&config) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
