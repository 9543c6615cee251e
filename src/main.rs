use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::Result;
use hue_blink::*;
use tokio::time::Duration;
use tracing::{debug, error, info, instrument, trace};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    bridge: BridgeArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct BridgeArgs {
    /// Bridge host name or IP address
    #[arg(short, long, env = "HUE_BRIDGE")]
    bridge: String,

    /// Username from an earlier pairing (pairs with the bridge when omitted)
    #[arg(short, long, env = "HUE_USERNAME")]
    username: Option<String>,

    /// Wait between pairing attempts in milliseconds
    #[arg(long, default_value_t = 1000)]
    pair_interval_ms: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Pair with the bridge and print the username
    Pair,
    /// Turn a lamp on
    On {
        /// Lamp number
        lamp: LampId,
        /// Hue (0-65535)
        #[arg(long, default_value_t = 8418)]
        hue: u32,
    },
    /// Turn a lamp off
    Off {
        /// Lamp number
        lamp: LampId,
    },
    /// Set a lamp to a hue
    Color {
        /// Lamp number
        lamp: LampId,
        /// Hue (0-65535)
        hue: u32,
    },
    /// Blink a lamp
    Blink {
        /// Lamp number
        lamp: LampId,
        /// Hue (0-65535)
        #[arg(long, default_value_t = 0)]
        hue: u32,
        /// Duration of one on+off cycle in milliseconds
        #[arg(short, long, default_value_t = 500)]
        period_ms: u64,
        /// Seconds to blink for; blinks until Ctrl-C when 0
        #[arg(short, long, default_value_t = 0)]
        duration: u64,
    },
    /// Demonstration on one lamp
    Demo {
        /// Lamp number
        lamp: LampId,
        /// Duration of each demo step in seconds
        #[arg(short, long, default_value_t = 3)]
        duration: u64,
    },
}

#[tokio::main]
#[instrument]
async fn main() -> Result<()> {
    // Initialize tracing with pretty colors
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("RUST_LOG")
                .unwrap_or_else(|_| EnvFilter::new("hue_blink=info,huec=info")),
        )
        .compact()
        .init();

    // Initialize color-eyre for pretty error reporting
    color_eyre::install()?;

    let cli = Cli::parse();
    debug!("Parsed command line arguments");

    let mut config = ControllerConfig::new(cli.bridge.bridge)
        .with_pairing_interval(Duration::from_millis(cli.bridge.pair_interval_ms));
    if let Some(username) = cli.bridge.username {
        config = config.with_username(username);
    }

    let controller = match HueController::from_config(config) {
        Ok(controller) => controller,
        Err(e) => {
            error!("Failed to initialize controller: {}", e);
            return Err(e.into());
        }
    };

    match cli.command {
        Commands::Pair => {
            let credential = controller.pair().await?;
            info!("Paired, export HUE_USERNAME to skip pairing next time");
            println!("{}", credential.as_str());
        }
        Commands::On { lamp, hue } => {
            controller.set_light_state(lamp, true, hue).await?;
        }
        Commands::Off { lamp } => {
            controller.set_light_state(lamp, false, 0).await?;
        }
        Commands::Color { lamp, hue } => {
            controller.set_light_state(lamp, true, hue).await?;
        }
        Commands::Blink {
            lamp,
            hue,
            period_ms,
            duration,
        } => {
            controller
                .set_blink_mode_with_period(lamp, hue, Duration::from_millis(period_ms))
                .await?;

            if duration == 0 {
                info!("Blinking lamp {}, press Ctrl-C to stop", lamp);
                tokio::signal::ctrl_c().await?;
            } else {
                sleep(duration).await;
            }

            controller.stop_blink(lamp);
        }
        Commands::Demo { lamp, duration } => {
            run_demo(&controller, lamp, duration).await?;
        }
    }

    controller.shutdown().await;
    Ok(())
}

/// Sleep for specified number of seconds
#[instrument]
async fn sleep(seconds: u64) {
    trace!("Sleeping for {}s", seconds);
    tokio::time::sleep(Duration::from_secs(seconds)).await;
    trace!("Sleep completed");
}

/// Run a demonstration of the controller features on one lamp
#[instrument(skip(controller))]
async fn run_demo(controller: &HueController, lamp: LampId, duration: u64) -> Result<()> {
    info!("Running demo on lamp {} with {}s intervals", lamp, duration);

    info!("Turning lamp off");
    controller.set_light_state(lamp, false, 0).await?;
    sleep(duration).await;

    info!("Setting hue to red");
    controller.set_light_state(lamp, true, 0).await?;
    sleep(duration).await;

    info!("Setting hue to green");
    controller.set_light_state(lamp, true, 25500).await?;
    sleep(duration).await;

    info!("Setting hue to blue");
    controller.set_light_state(lamp, true, 46920).await?;
    sleep(duration).await;

    info!("Blinking red at the default period");
    controller.set_blink_mode(lamp, 0).await?;
    sleep(duration).await;

    info!("Blinking blue slowly");
    controller
        .set_blink_mode_with_period(lamp, 46920, Duration::from_secs(2))
        .await?;
    sleep(duration * 2).await;

    info!("Stopping blink and turning lamp off");
    controller.stop_blink(lamp);
    controller.set_light_state(lamp, false, 0).await?;

    info!("Demo completed!");
    Ok(())
}
