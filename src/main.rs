use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use masked_inpaint::inpaint::{
    codec, DragOutcome, EditSession, HttpInpaintService, InpaintRequest, Mode, Rect,
};
use masked_inpaint::logging;
use masked_inpaint::settings::{self, Settings};

/// Regenerate selected regions of an image with an inpainting service and merge
/// the result back so pixels outside the regions stay untouched.
#[derive(Parser, Debug)]
#[command(name = "masked_inpaint")]
struct CliArgs {
    /// Image to edit.
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Where to write the final image.
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Processing mode: auto, manual or tiled.
    #[arg(short, long, default_value_t = Mode::Manual)]
    mode: Mode,

    /// Region to regenerate, in image pixels. Repeat for several regions.
    #[arg(short, long = "rect", value_name = "X,Y,W,H", value_parser = parse_rect)]
    rects: Vec<Rect>,

    /// Use this file as the service's answer instead of calling the service.
    #[arg(long, value_name = "FILE")]
    replacement: Option<PathBuf>,

    /// Settings file. Defaults to masked_inpaint.json next to the executable.
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Mirror log output to this file. Overrides `log_file` from settings.
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

fn parse_rect(value: &str) -> Result<Rect, String> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|err| format!("invalid rect '{value}': {err}"))?;
    match parts.as_slice() {
        [x, y, w, h] if *w >= 0.0 && *h >= 0.0 => Ok(Rect::new(*x, *y, *w, *h)),
        [_, _, _, _] => Err(format!("rect '{value}' has a negative size")),
        _ => Err(format!("rect '{value}' must be X,Y,W,H")),
    }
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let message = format!("{err:#}");
            tracing::error!(error = %message, "masked_inpaint failed");
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: CliArgs) -> Result<()> {
    let settings_path = match &args.settings {
        Some(path) => path.clone(),
        None => settings::resolve_settings_path()?,
    };
    let mut settings = Settings::read(&settings_path)?;
    let log_file = args.log_file.clone().or_else(|| settings.log_file.clone());
    logging::init(args.verbose || settings.debug_logging, log_file);
    settings.sanitize();

    let bytes = std::fs::read(&args.input)
        .with_context(|| format!("read input image {}", args.input.display()))?;
    let source = codec::decode_rgba(&bytes)
        .with_context(|| format!("decode input image {}", args.input.display()))?;

    let mut session = EditSession::new(source, &settings);
    session.select_mode(args.mode);
    for rect in &args.rects {
        match session.add_rect(*rect) {
            DragOutcome::Committed(_) => {}
            DragOutcome::Discarded(rect) => {
                tracing::warn!(?rect, "region is too small and was skipped")
            }
            DragOutcome::NoDrag => {
                tracing::warn!(mode = %args.mode, "regions are ignored outside manual mode")
            }
        }
    }

    let result = match &args.replacement {
        Some(path) => {
            let replacement = std::fs::read(path)
                .with_context(|| format!("read replacement image {}", path.display()))?;
            let offline = move |_: &InpaintRequest| -> Result<Vec<u8>> { Ok(replacement.clone()) };
            session.submit(&offline)?
        }
        None => {
            let service = HttpInpaintService::new(&settings.service)?;
            tracing::debug!(endpoint = service.endpoint(), "calling inpainting service");
            session.submit(&service)?
        }
    };

    if result.is_degraded() {
        tracing::warn!(outcome = ?result.outcome, "writing uncomposited service output");
    }
    std::fs::write(&args.output, &result.processed)
        .with_context(|| format!("write output image {}", args.output.display()))?;
    tracing::info!(output = %args.output.display(), "done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rect_accepts_four_values() {
        assert_eq!(parse_rect("10, 20.5,30,40"), Ok(Rect::new(10.0, 20.5, 30.0, 40.0)));
    }

    #[test]
    fn parse_rect_rejects_wrong_arity() {
        assert!(parse_rect("1,2,3").unwrap_err().contains("X,Y,W,H"));
        assert!(parse_rect("1,2,3,4,5").unwrap_err().contains("X,Y,W,H"));
    }

    #[test]
    fn parse_rect_rejects_negative_size_and_junk() {
        assert!(parse_rect("0,0,-5,10").unwrap_err().contains("negative"));
        assert!(parse_rect("0,0,ten,10").unwrap_err().contains("invalid rect"));
    }

    #[test]
    fn cli_collects_repeated_rects_and_log_file() {
        let args = CliArgs::try_parse_from([
            "masked_inpaint",
            "--input",
            "in.png",
            "--output",
            "out.png",
            "--rect",
            "0,0,10,10",
            "--rect",
            "5,5,20,20",
            "--log-file",
            "run.log",
        ])
        .unwrap();
        assert_eq!(args.mode, Mode::Manual);
        assert_eq!(args.rects.len(), 2);
        assert_eq!(args.log_file, Some(PathBuf::from("run.log")));
    }
}
