use clap::Parser;

use ocr_relay::cli::{self, Cli, Commands};
use ocr_relay::{Config, server};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => server::run(Config::new()).await?,
        Commands::Ocr {
            file,
            mode,
            task,
            prompt,
        } => cli::handle_ocr(file, mode, task, prompt).await?,
        Commands::Bench {
            count,
            start_server,
            url,
            samples_dir,
            results_dir,
            timeout_secs,
        } => {
            cli::handle_bench(count, start_server, url, samples_dir, results_dir, timeout_secs).await?
        }
    }
    Ok(())
}
