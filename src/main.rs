// src/main.rs

use cmdstream::{cli, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("cmdstream error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    cmdstream::config::load_env_file(&args.env_file)?;
    logging::init_logging(args.log_level)?;
    run(args).await
}
