use std::path::PathBuf;

use anyhow::{anyhow, Result};

mod animation;
mod asset_pipeline;
mod camera;
mod demo;
mod effects;
mod engine;
mod input;
mod lighting;
mod material_manager;
mod math;
mod model;
mod orbit;
mod rendering;
mod scene_graph;
mod viewport;
mod vignettes;
mod window;
mod world;

use vignettes::VignetteKind;

const USAGE: &str = "Usage: vignettes <hand|snitch|flythrough> [--assets <dir>] [--debug]";

#[derive(Debug, Clone, PartialEq)]
pub struct CliOptions {
    pub vignette: VignetteKind,
    pub assets: PathBuf,
    pub debug: bool,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        Self::parse_from(std::env::args().skip(1))
    }

    fn parse_from(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut args = args.into_iter();

        let Some(name) = args.next() else {
            return Err(anyhow!(USAGE));
        };
        let vignette = name
            .parse::<VignetteKind>()
            .map_err(|e| anyhow!("{e}. {USAGE}"))?;

        let mut assets = PathBuf::from("assets");
        let mut debug = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--assets" => {
                    let Some(dir) = args.next() else {
                        return Err(anyhow!("--assets needs a directory. {USAGE}"));
                    };
                    assets = PathBuf::from(dir);
                }
                "--debug" => debug = true,
                other => return Err(anyhow!("Unknown argument: {other}. {USAGE}")),
            }
        }

        Ok(Self {
            vignette,
            assets,
            debug,
        })
    }
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    let options = CliOptions::parse()?;

    pollster::block_on(window::run(options))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliOptions> {
        CliOptions::parse_from(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn defaults() {
        let options = parse(&["hand"]).unwrap();
        assert_eq!(options.vignette, VignetteKind::Hand);
        assert_eq!(options.assets, PathBuf::from("assets"));
        assert!(!options.debug);
    }

    #[test]
    fn flags_in_any_order() {
        let options = parse(&["flythrough", "--debug", "--assets", "/srv/art"]).unwrap();
        assert_eq!(options.vignette, VignetteKind::Flythrough);
        assert_eq!(options.assets, PathBuf::from("/srv/art"));
        assert!(options.debug);
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["teapot"]).is_err());
        assert!(parse(&["snitch", "--assets"]).is_err());

        let error = parse(&["snitch", "--fast"]).unwrap_err();
        assert!(error.to_string().contains("--fast"));
    }
}
