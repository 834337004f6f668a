use std::path::PathBuf;

use clap::Parser;

use hum_remover::config::Config;
use hum_remover::{FrequencyMode, HttpService, Phase, RawFile, SessionController};

type Controller = SessionController<HttpService>;

#[derive(Debug, Parser)]
#[command(name = "hum-remover", version, about = "Remove mains hum from an audio file")]
struct Cli {
    /// Audio file to clean (WAV, MP3, OGG or FLAC)
    file: PathBuf,

    /// Hum frequency to remove: auto, 50 or 60
    #[arg(short, long, default_value = "auto")]
    frequency: FrequencyMode,

    /// Where to write the cleaned WAV (default: <name>_clean.wav next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Base URL of the hum removal service
    #[arg(long)]
    api_url: Option<String>,

    /// Retry a failed attempt up to this many times
    #[arg(long, default_value_t = 0)]
    retries: u32,

    /// Store --api-url in the config file for next time
    #[arg(long, requires = "api_url")]
    save_config: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    log::info!("Hum remover starting");

    let runtime = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    let handle = runtime.handle().clone();
    if let Err(e) = runtime.block_on(run(cli, handle)) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(
    cli: Cli,
    runtime: tokio::runtime::Handle,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load();
    if let Some(url) = cli.api_url {
        config.api_url = url;
        if cli.save_config {
            config.save()?;
        }
    }

    let name = cli
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or("Input path has no file name")?;
    let data = tokio::fs::read(&cli.file).await?;

    let mut controller = SessionController::new(HttpService::new(&config.api_url), runtime);
    if let Some(tz) = &config.timezone {
        controller.set_timezone(tz);
        if let Some(hint) = controller.region_hint() {
            println!("Mains hum in your region is most likely {hint}");
        }
    }
    controller.set_frequency_mode(cli.frequency);
    // media type unknown on the command line; intake falls back to the extension
    controller.select(RawFile::new(name, "", data))?;
    if let Some(estimate) = controller.estimate() {
        println!("Estimated processing time: {estimate}");
    }
    print_notice(&controller);

    // the analysis keeps running alongside the transform; its notice prints when it lands
    controller.process()?;
    let mut retries_left = cli.retries;
    loop {
        wait_for_settlement(&mut controller).await;
        match controller.phase() {
            Phase::Succeeded => break,
            Phase::Failed => {
                let message = controller
                    .error()
                    .unwrap_or("Failed to process audio")
                    .to_string();
                if controller.last_failure().is_some() && retries_left > 0 {
                    retries_left -= 1;
                    eprintln!("{message} Retrying...");
                    controller.retry()?;
                    continue;
                }
                return Err(message.into());
            }
            phase => return Err(format!("Unexpected session phase {phase:?}").into()),
        }
    }
    print_notice(&controller);

    let download = controller.download()?;
    let output = cli
        .output
        .unwrap_or_else(|| cli.file.with_file_name(&download.file_name));
    tokio::fs::write(&output, &download.data).await?;
    if let Some(info) = controller.result_audio() {
        println!(
            "Cleaned audio: {:.1}s, {} Hz, {} channel(s)",
            info.duration_secs, info.sample_rate, info.channels
        );
    }
    println!("Saved {}", output.display());
    Ok(())
}

/// Pump events until the transform settles. Ctrl-C cancels the request.
async fn wait_for_settlement(controller: &mut Controller) {
    let mut last_progress = None;
    let mut last_notice = controller.notice().map(str::to_string);
    while controller.is_processing() {
        let interrupted = tokio::select! {
            _ = tokio::signal::ctrl_c() => true,
            _ = controller.next_event() => false,
        };
        if interrupted {
            eprintln!();
            controller.cancel();
            continue;
        }

        if !controller.is_processing() {
            break;
        }
        let notice = controller.notice();
        if notice.is_some() && notice != last_notice.as_deref() {
            if last_progress.take().is_some() {
                eprintln!();
            }
            print_notice(controller);
            last_notice = controller.notice().map(str::to_string);
        }

        let progress = controller.progress();
        if last_progress != Some(progress) {
            eprint!("\rProcessing... {progress:>3}%");
            last_progress = Some(progress);
        }
    }
    if last_progress.is_some() {
        eprintln!();
    }
}

fn print_notice(controller: &Controller) {
    if let Some(notice) = controller.notice() {
        println!("{notice}");
    }
}
