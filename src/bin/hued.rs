use hue_blink::*;
use std::env;
use std::time::Duration;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Get the bridge address (and optionally a username) from command line arguments.
    // If not provided, exit.
    let usage = "Usage: hued <bridge address> [username]";
    let args: Vec<_> = env::args().collect();
    if args.len() < 2 {
        eprintln!("{usage}");
        std::process::exit(1);
    }
    if args[1] == "-h" || args[1] == "--help" {
        eprintln!("{usage}");
        std::process::exit(0);
    }

    // Logs go to stderr so stdout only carries replies
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| EnvFilter::new("hue_blink=warn")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let controller = match args.get(2) {
        Some(username) => HueController::with_username(&args[1], username)?,
        None => {
            // Printed regardless of RUST_LOG, the operator has to act on it
            eprintln!("{LINK_BUTTON_PROMPT}");
            HueController::new(&args[1])?
        }
    };

    // Pair up front so commands do not stall on the link button later
    controller.pair().await?;

    // Inform about successful initialization
    println!("OK");

    // Mainloop: wait for user input, line by line
    let mut lines = BufReader::new(io::stdin()).lines();
    while let Some(input) = lines.next_line().await.map_err(|e| Error::General(e.to_string()))? {
        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if input == "quit" {
            break;
        }

        match execute(&controller, input).await {
            Ok(()) => println!("OK"),
            Err(e) => println!("ERR {e}"),
        }
    }

    controller.shutdown().await;
    Ok(())
}

/// Runs one `<command>:<args>` line against the controller
async fn execute(controller: &HueController, input: &str) -> Result<()> {
    let mut cmd = input.split(':').map(str::trim);
    match cmd.next() {
        Some("on") => {
            let lamp = parse_arg(cmd.next(), "lamp")?;
            let hue = cmd.next().map(|h| parse_arg(Some(h), "hue")).transpose()?;
            controller
                .set_light_state(lamp, true, hue.unwrap_or(0))
                .await
        }
        Some("off") => {
            let lamp = parse_arg(cmd.next(), "lamp")?;
            controller.set_light_state(lamp, false, 0).await
        }
        Some("color") => {
            let lamp = parse_arg(cmd.next(), "lamp")?;
            let hue = parse_arg(cmd.next(), "hue")?;
            controller.set_light_state(lamp, true, hue).await
        }
        Some("blink") => {
            let lamp = parse_arg(cmd.next(), "lamp")?;
            let hue = parse_arg(cmd.next(), "hue")?;
            match cmd.next() {
                Some(period) => {
                    let period_ms: u64 = parse_arg(Some(period), "period")?;
                    controller
                        .set_blink_mode_with_period(lamp, hue, Duration::from_millis(period_ms))
                        .await
                }
                None => controller.set_blink_mode(lamp, hue).await,
            }
        }
        Some("stop") => {
            let lamp = parse_arg(cmd.next(), "lamp")?;
            controller.stop_blink(lamp);
            Ok(())
        }
        Some(other) => Err(Error::General(format!("Unknown command: {other}"))),
        None => Err(Error::General("No command given".into())),
    }
}

fn parse_arg<T: std::str::FromStr>(value: Option<&str>, name: &str) -> Result<T> {
    let value = value.ok_or_else(|| Error::General(format!("no {name} given")))?;
    value
        .parse()
        .map_err(|_| Error::General(format!("invalid {name}: {value}")))
}
