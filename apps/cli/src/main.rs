use anyhow::{Context, Result};
use tracing::info;

use ferrum_collection::{Args, Config, Generator};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .init();

    let args = Args::parse_with_dotenv();
    let config = Config::load(&args).context("Failed to load configuration")?;
    config.validate()?;

    let generator = Generator::new(config)?;
    let summary = generator.run()?;

    info!(
        count = summary.ids.len(),
        output_dir = %generator.config().output_dir.display(),
        "Generated curl scripts"
    );
    if summary.conversion_failures > 0 {
        info!(
            failures = summary.conversion_failures,
            "Some XML bodies were kept unconverted"
        );
    }
    let preview: Vec<&str> = summary.ids.iter().take(10).map(String::as_str).collect();
    let more = if summary.ids.len() > 10 { " ..." } else { "" };
    println!("Run all: ./run-all.sh");
    println!("Run one: ./run.sh <ID>");
    println!("IDs: {}{}", preview.join(", "), more);
    Ok(())
}
