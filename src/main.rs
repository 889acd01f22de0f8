use electrode_detect::args::{self, Args, Command};
use electrode_detect::capture::OpenCvBackend;
use electrode_detect::{CaptureSession, DetectResult, RunSummary};

fn main() {
    let args = match Args::parse() {
        Ok(Command::Run(args)) => args,
        Ok(Command::Help) => {
            args::print_help();
            return;
        }
        Ok(Command::Version) => {
            println!("{}", args::version_line());
            return;
        }
        Err(e) => {
            eprintln!("❌ {e}");
            args::print_help();
            std::process::exit(2);
        }
    };

    let default_level = if args.debug_mode { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    // Session resources are dropped inside run() before any exit below
    match run(args) {
        Ok(summary) => {
            println!(
                "✅ Processed {} frames ({:?})",
                summary.frames_processed, summary.stop_reason
            );
        }
        Err(e) => {
            if e.is_startup_failure() {
                eprintln!("❌ Startup failed: {e}");
            } else {
                eprintln!("❌ {e}");
            }
            std::process::exit(1);
        }
    }
}

fn run(args: Args) -> DetectResult<RunSummary> {
    let mut backend = OpenCvBackend;
    let session = CaptureSession::open(&mut backend, args.config)?;
    println!("🎥 Capturing, press 'q' in the window to quit");
    session.run()
}
