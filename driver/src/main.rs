use std::{env, path::PathBuf};

use anyhow::{anyhow, bail, Context};
use log::{info, LevelFilter};
use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};
use lumen::{ImageWriter, PngImageWriter, Renderer, Settings};

const USAGE: &str =
    "usage: driver <scene.json> <out.png> [--settings <file>] [--width <px>] [--height <px>]";

#[derive(Debug, PartialEq)]
struct Args {
    scene: PathBuf,
    output: PathBuf,
    settings: Option<PathBuf>,
    width: u32,
    height: u32,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> anyhow::Result<Args> {
        let mut positional = Vec::new();
        let mut settings = None;
        let mut width = 800;
        let mut height = 600;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--settings" => settings = Some(PathBuf::from(value(&mut args, &arg)?)),
                "--width" => width = dimension(&mut args, &arg)?,
                "--height" => height = dimension(&mut args, &arg)?,
                flag if flag.starts_with("--") => bail!("unknown flag {flag}\n{USAGE}"),
                _ => positional.push(PathBuf::from(&arg)),
            }
        }

        let [scene, output]: [PathBuf; 2] = positional
            .try_into()
            .map_err(|_| anyhow!("expected a scene and an output path\n{USAGE}"))?;

        Ok(Args {
            scene,
            output,
            settings,
            width,
            height,
        })
    }
}

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> anyhow::Result<String> {
    args.next().with_context(|| format!("{flag} needs a value\n{USAGE}"))
}

fn dimension(args: &mut impl Iterator<Item = String>, flag: &str) -> anyhow::Result<u32> {
    let raw = value(args, flag)?;
    let parsed: u32 = raw
        .parse()
        .with_context(|| format!("{flag} expects a pixel count, got {raw:?}"))?;
    if parsed == 0 {
        bail!("{flag} must be positive");
    }
    Ok(parsed)
}

fn init_logging() -> anyhow::Result<()> {
    if log4rs::init_file("log4rs.yml", Default::default()).is_ok() {
        return Ok(());
    }

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%H:%M:%S%.3f)} {h({l:<5})} {t} - {m}{n}",
        )))
        .build();

    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info))
        .context("building fallback logger config")?;

    log4rs::init_config(config).context("Could not configure logger")?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_logging()?;

    #[cfg(feature = "tracing")]
    lumen::init_profiling()?;

    let args = Args::parse(env::args().skip(1))?;

    let settings = match &args.settings {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };

    let mut renderer = Renderer::new(settings).context("Failed to create Renderer")?;
    renderer.load_scene(&args.scene).context("Failed to load scene")?;

    renderer.on_resize(args.width, args.height);
    let pixels = renderer
        .capture_frame(args.width, args.height)
        .context("Failed to render frame")?;

    PngImageWriter.write(&pixels, &args.output)?;
    info!(
        "wrote {}x{} frame to {}",
        pixels.width,
        pixels.height,
        args.output.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<Args> {
        Args::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn positional_only_uses_default_size() {
        let args = parse(&["scene.json", "out.png"]).unwrap();
        assert_eq!(args.scene, PathBuf::from("scene.json"));
        assert_eq!(args.output, PathBuf::from("out.png"));
        assert_eq!((args.width, args.height), (800, 600));
        assert_eq!(args.settings, None);
    }

    #[test]
    fn flags_may_come_anywhere() {
        let args = parse(&[
            "--width",
            "320",
            "scene.json",
            "--settings",
            "s.json",
            "out.png",
            "--height",
            "200",
        ])
        .unwrap();
        assert_eq!((args.width, args.height), (320, 200));
        assert_eq!(args.settings, Some(PathBuf::from("s.json")));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse(&["scene.json"]).is_err());
        assert!(parse(&["a", "b", "c"]).is_err());
        assert!(parse(&["a", "b", "--width"]).is_err());
        assert!(parse(&["a", "b", "--width", "0"]).is_err());
        assert!(parse(&["a", "b", "--height", "tall"]).is_err());
        assert!(parse(&["a", "b", "--verbose"]).is_err());
    }
}
