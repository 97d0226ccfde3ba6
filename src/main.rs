use animal_reels::config::Config;
use animal_reels::error::PipelineError;
use animal_reels::generator::{RunOutcome, run_generation};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("[ERROR] {err:#}");
            std::process::exit(2);
        }
    };

    let code = match run_generation(&cfg).await {
        Ok(RunOutcome::Published {
            url,
            caption,
            notifications,
        }) => {
            println!("{url}");
            tracing::info!(title = %caption.title, "run complete");
            notifications.settle(cfg.http_timeout).await;
            0
        }
        Ok(RunOutcome::BudgetExceeded { step, elapsed }) => {
            tracing::warn!(step, elapsed_secs = elapsed.as_secs_f64(), "run stopped by time budget");
            0
        }
        Err(err) => {
            eprintln!("[ERROR] {err:#}");
            match err.downcast_ref::<PipelineError>() {
                Some(e) if e.is_configuration() => 2,
                _ => 1,
            }
        }
    };

    std::process::exit(code);
}
