use backdrop::{
    cli::Args,
    config::Settings,
    logging,
    outside::{Ffmpeg, Pexels},
    pipeline::{CancelToken, Pipeline},
    progress::LogSink,
};
use clap::Parser;
use tracing::{debug, info, Level};

fn main() -> miette::Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    logging::init_logging(level)?;

    let mut settings = Settings::load(args.config.as_deref())?;
    settings.apply_args(&args);
    settings.validate()?;
    debug!(
        "Generating a {:.0}s '{}' video at {}",
        settings.duration_secs, settings.search_term, settings.resolution
    );

    let source = Pexels::new(settings.api_key.clone(), settings.source_tuning());
    let ffmpeg = Ffmpeg::new()?;

    let pipeline = Pipeline::new(&source, &ffmpeg);
    let request = settings.render_request();
    let output = pipeline.generate(&request, &LogSink, &CancelToken::new())?;

    info!("Done: {}", output.display());
    Ok(())
}
