use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;

use dubo_client::api::enterprise::ask_poll::{self, PollOutcome};
use dubo_client::transport::Response;
use dubo_client::{utils, AnyClient, ClientConfig};

#[derive(Parser)]
#[command(name = "dubo", version, about = "Dubo query dispatch client")]
struct AppCli {
    /// Config file path. `DUBO_*` environment variables override its values.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll a dispatched query once and print its result or status
    Poll {
        #[arg(long)]
        dispatch_id: String,
        /// Use the blocking transport instead of the async one
        #[arg(long, default_value_t = false)]
        blocking: bool,
        /// Print status code, headers and raw body instead of the parsed result
        #[arg(long, default_value_t = false)]
        raw: bool,
    },
}

fn load_config(path: Option<&str>) -> Result<ClientConfig> {
    match path {
        Some(path) => {
            let mut cfg = ClientConfig::from_file(path)?;
            cfg.apply_env_overrides()?;
            Ok(cfg)
        }
        None => ClientConfig::from_env(),
    }
}

fn render(response: Response<PollOutcome>, raw: bool) -> Result<String> {
    if raw {
        let headers: serde_json::Map<String, serde_json::Value> = response
            .headers
            .iter()
            .map(|(k, v)| {
                (
                    k.to_string(),
                    json!(String::from_utf8_lossy(v.as_bytes())),
                )
            })
            .collect();
        let out = json!({
            "status_code": response.status_code.as_u16(),
            "headers": headers,
            "body": String::from_utf8_lossy(&response.content),
        });
        return Ok(serde_json::to_string_pretty(&out)?);
    }

    let out = match response.parsed {
        Some(PollOutcome::Success(resp)) => resp.to_payload()?,
        Some(PollOutcome::ValidationError(err)) => json!({ "validation_error": err.to_payload()? }),
        None => json!(null),
    };
    Ok(serde_json::to_string_pretty(&out)?)
}

fn poll_blocking(client: AnyClient, dispatch_id: String) -> Result<Response<PollOutcome>> {
    // reqwest's blocking client cannot live on a runtime thread.
    std::thread::spawn(move || ask_poll::send_detailed_blocking(&client, &dispatch_id))
        .join()
        .map_err(|_| anyhow::anyhow!("blocking poll thread panicked"))?
        .context("polling dispatch")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = AppCli::parse();
    utils::logging::init(if args.verbose { "debug" } else { "info" });

    let config = load_config(args.config.as_deref())?;

    match args.command {
        Commands::Poll {
            dispatch_id,
            blocking,
            raw,
        } => {
            info!(dispatch_id = %dispatch_id, blocking, "polling dispatch");
            let client = config.into_client();
            let response = if blocking {
                poll_blocking(client, dispatch_id)?
            } else {
                ask_poll::send_detailed(&client, &dispatch_id)
                    .await
                    .context("polling dispatch")?
            };
            println!("{}", render(response, raw)?);
        }
    }

    Ok(())
}
