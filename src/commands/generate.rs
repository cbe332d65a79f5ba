//! Generate static files

use anyhow::Result;
use std::time::Instant;

use crate::generator::{GenerateReport, Generator};
use crate::prismic::ContentSource;
use crate::Spacetraveling;

/// Generate the listing, every post page and the 404 page
pub async fn run(app: &Spacetraveling, source: &dyn ContentSource) -> Result<GenerateReport> {
    let start = Instant::now();

    let generator = Generator::new(app)?;
    let report = generator.generate(source).await?;

    tracing::info!(
        "Generated {} post pages ({} on the home page)",
        report.posts,
        report.listed
    );
    if report.missing > 0 {
        tracing::warn!("{} posts could not be generated", report.missing);
    }

    let duration = start.elapsed();
    tracing::info!("Generated in {:.2}s", duration.as_secs_f64());

    Ok(report)
}
