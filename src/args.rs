use crate::capture::CaptureConfig;
use crate::error::{DetectError, DetectResult};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug)]
pub struct Args {
    pub config: CaptureConfig,
    pub debug_mode: bool,
}

/// What the command line asked for
#[derive(Debug)]
pub enum Command {
    Run(Args),
    Help,
    Version,
}

impl Args {
    pub fn parse() -> DetectResult<Command> {
        Self::parse_from(env::args().skip(1))
    }

    /// Parse flags (program name already stripped). No flags means all defaults.
    pub fn parse_from<I, S>(args: I) -> DetectResult<Command>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = CaptureConfig::default();
        let mut debug_mode = false;

        for arg in args {
            let arg = arg.as_ref();
            if arg == "--help" || arg == "-h" {
                return Ok(Command::Help);
            } else if arg == "--version" || arg == "-v" {
                return Ok(Command::Version);
            } else if arg == "--debug" {
                debug_mode = true;
            } else if let Some(val) = arg.strip_prefix("--template=") {
                config.template_path = PathBuf::from(val);
            } else if let Some(val) = arg.strip_prefix("--threshold=") {
                config.matching.threshold = parse_value(arg, val)?;
                config.matching.validate()?;
            } else if let Some(val) = arg.strip_prefix("--camera=") {
                config.camera_index = parse_value(arg, val)?;
            } else if let Some(val) = arg.strip_prefix("--interval-ms=") {
                config.frame_interval = Duration::from_millis(parse_value(arg, val)?);
            } else if let Some(val) = arg.strip_prefix("--save-frames=") {
                config.save_frames_dir = Some(PathBuf::from(val));
            } else if let Some(val) = arg.strip_prefix("--suppress=") {
                config.matching.suppress_radius = Some(parse_value(arg, val)?);
            } else {
                return Err(DetectError::InvalidArgument {
                    description: format!("unknown argument '{arg}'"),
                });
            }
        }

        Ok(Command::Run(Args { config, debug_mode }))
    }
}

fn parse_value<T: std::str::FromStr>(arg: &str, val: &str) -> DetectResult<T> {
    val.parse::<T>().map_err(|_| DetectError::InvalidArgument {
        description: format!("invalid value in '{arg}'"),
    })
}

pub fn print_help() {
    println!("🔬 Electrode marker detection");
    println!();
    println!("USAGE:");
    println!("    electrode-detect [FLAGS]");
    println!();
    println!("FLAGS:");
    println!("    --template=PATH     Reference image to search for (default: ref.png)");
    println!("    --threshold=F       Match threshold, 0.0-1.0 (default: 0.3)");
    println!("    --camera=N          Camera device index (default: 0)");
    println!("    --interval-ms=N     Delay between frames in milliseconds (default: 100)");
    println!("    --save-frames=DIR   Write every annotated frame to DIR/res<N>.png");
    println!("    --suppress=N        Keep only the strongest match within N pixels");
    println!("    --debug             Enable debug logging");
    println!("    --help, -h          Show this help message");
    println!("    --version, -v       Show version information");
    println!();
    println!("Press 'q' in the 'Detected' window to quit.");
}

/// `--version` output: package version, build profile, camera support and build year
pub fn version_line() -> String {
    format!(
        "Electrode Detect v{} (built {})",
        env!("APP_VERSION_DISPLAY"),
        env!("APP_BUILD_YEAR")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(args: &[&str]) -> Args {
        match Args::parse_from(args) {
            Ok(Command::Run(args)) => args,
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn test_no_flags_uses_defaults() {
        let args = run(&[]);
        assert_eq!(args.config.camera_index, 0);
        assert_eq!(args.config.template_path, PathBuf::from("ref.png"));
        assert_eq!(args.config.matching.threshold, 0.3);
        assert_eq!(args.config.frame_interval, Duration::from_millis(100));
        assert_eq!(args.config.window_title, "Detected");
        assert_eq!(args.config.quit_key, 'q');
        assert!(args.config.save_frames_dir.is_none());
        assert!(args.config.matching.suppress_radius.is_none());
        assert!(!args.debug_mode);
    }

    #[test]
    fn test_overrides() {
        let args = run(&[
            "--template=marker.png",
            "--threshold=0.75",
            "--camera=2",
            "--interval-ms=0",
            "--save-frames=out",
            "--suppress=5",
            "--debug",
        ]);
        assert_eq!(args.config.template_path, PathBuf::from("marker.png"));
        assert_eq!(args.config.matching.threshold, 0.75);
        assert_eq!(args.config.camera_index, 2);
        assert!(args.config.frame_interval.is_zero());
        assert_eq!(args.config.save_frames_dir, Some(PathBuf::from("out")));
        assert_eq!(args.config.matching.suppress_radius, Some(5));
        assert!(args.debug_mode);
    }

    #[test]
    fn test_help_and_version() {
        assert!(matches!(Args::parse_from(["-h"]), Ok(Command::Help)));
        assert!(matches!(
            Args::parse_from(["--debug", "--version"]),
            Ok(Command::Version)
        ));
    }

    #[test]
    fn test_version_line_reports_build() {
        let line = version_line();
        assert!(line.starts_with(&format!("Electrode Detect v{}", env!("CARGO_PKG_VERSION"))));
        let camera = if cfg!(feature = "camera") { "opencv" } else { "no camera" };
        assert!(line.contains(camera), "{line}");
        assert!(line.ends_with(&format!("(built {})", env!("APP_BUILD_YEAR"))));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            Args::parse_from(["--threshold=1.2"]),
            Err(DetectError::InvalidThreshold { .. })
        ));
        assert!(matches!(
            Args::parse_from(["--camera=front"]),
            Err(DetectError::InvalidArgument { .. })
        ));
        assert!(matches!(
            Args::parse_from(["--fps=30"]),
            Err(DetectError::InvalidArgument { .. })
        ));
    }
}
