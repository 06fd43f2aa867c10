use std::collections::HashMap;
use std::io::Read;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;
use uuid::Uuid;

use berth_client::RelayClient;
use berth_core::sdp::{self, SdpKind, SessionDescription};
use berth_core::service::{EnvelopeReply, SdpRequest};

#[derive(Debug, Parser)]
#[command(
    name = "berth-server",
    author,
    version,
    about = "SDP rendezvous relay and command-line client"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Address to bind the HTTP listener to.
    #[arg(long, env = "BERTH_LISTEN_ADDR", default_value = "127.0.0.1:8089")]
    pub listen_addr: String,

    /// Seconds a handoff read waits for its counterpart before failing.
    #[arg(long, env = "BERTH_HANDOFF_TIMEOUT_SECS", default_value_t = 30)]
    pub handoff_timeout_secs: u64,

    /// Grace period applied during shutdown.
    #[arg(long, env = "BERTH_SHUTDOWN_GRACE_SECS", default_value_t = 2)]
    pub shutdown_grace_secs: u64,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Deliver a descriptor to a waiting listener and block for its reply.
    Handshake(DeliverArgs),
    /// Deliver a descriptor to a waiting listener without awaiting a reply.
    Inform(DeliverArgs),
    /// Store a descriptor for repeatable retrieval.
    Store(StoreArgs),
    /// Fetch a stored descriptor.
    Fetch {
        /// Relay URL (e.g. http://localhost:8089).
        #[arg(short, long, default_value = "http://127.0.0.1:8089")]
        url: String,

        /// Rendezvous id to fetch.
        #[arg(short, long)]
        id: String,
    },
    /// Run the resolver registered for an id against a descriptor.
    Exchange(DeliverArgs),
}

#[derive(Debug, Args)]
pub struct DeliverArgs {
    /// Relay URL (e.g. http://localhost:8089).
    #[arg(short, long, default_value = "http://127.0.0.1:8089")]
    pub url: String,

    /// Rendezvous id shared with the counterpart.
    #[arg(short, long)]
    pub id: String,

    #[command(flatten)]
    pub descriptor: DescriptorArgs,
}

#[derive(Debug, Args)]
pub struct StoreArgs {
    /// Relay URL (e.g. http://localhost:8089).
    #[arg(short, long, default_value = "http://127.0.0.1:8089")]
    pub url: String,

    /// Rendezvous id; generated and printed when omitted.
    #[arg(short, long)]
    pub id: Option<String>,

    #[command(flatten)]
    pub descriptor: DescriptorArgs,
}

#[derive(Debug, Args)]
pub struct DescriptorArgs {
    /// Descriptor kind placed in the envelope.
    #[arg(short, long, value_enum, default_value_t = KindArg::Offer)]
    pub kind: KindArg,

    /// Raw session description text; pass "-" to read it from stdin.
    #[arg(short, long)]
    pub sdp: String,

    /// Sidecar entries, repeatable, as key=value pairs.
    #[arg(short, long = "data", value_parser = parse_key_value)]
    pub data: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    Offer,
    Pranswer,
    Answer,
    Rollback,
}

impl From<KindArg> for SdpKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Offer => SdpKind::Offer,
            KindArg::Pranswer => SdpKind::Pranswer,
            KindArg::Answer => SdpKind::Answer,
            KindArg::Rollback => SdpKind::Rollback,
        }
    }
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got {raw:?}")),
    }
}

pub async fn run_client(command: Commands) -> Result<()> {
    match command {
        Commands::Handshake(args) => {
            let request = build_request(args.id, args.descriptor)?;
            debug!(id = %request.id, "sending handshake");
            let reply = RelayClient::new(&args.url)?.handshake(&request).await?;
            print_reply(&reply)
        }
        Commands::Inform(args) => {
            let request = build_request(args.id, args.descriptor)?;
            RelayClient::new(&args.url)?.inform(&request).await?;
            println!("delivered {}", request.id);
            Ok(())
        }
        Commands::Store(args) => {
            let id = args.id.unwrap_or_else(|| Uuid::new_v4().to_string());
            let request = build_request(id, args.descriptor)?;
            RelayClient::new(&args.url)?.store(&request).await?;
            println!("stored {}", request.id);
            Ok(())
        }
        Commands::Fetch { url, id } => {
            let reply = RelayClient::new(&url)?.fetch(&id).await?;
            print_reply(&reply)
        }
        Commands::Exchange(args) => {
            let request = build_request(args.id, args.descriptor)?;
            let reply = RelayClient::new(&args.url)?.exchange(&request).await?;
            print_reply(&reply)
        }
    }
}

fn build_request(id: String, descriptor: DescriptorArgs) -> Result<SdpRequest> {
    let sdp_text = if descriptor.sdp == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read descriptor from stdin")?;
        buffer
    } else {
        descriptor.sdp
    };
    if sdp_text.is_empty() {
        bail!("descriptor text is empty");
    }
    let encoded = sdp::encode(&SessionDescription::new(descriptor.kind.into(), sdp_text))?;
    Ok(SdpRequest::new(id, encoded)
        .with_data(descriptor.data.into_iter().collect::<HashMap<_, _>>()))
}

fn print_reply(reply: &EnvelopeReply) -> Result<()> {
    let description = sdp::decode(&reply.sdp)?;
    println!("type: {:?}", description.kind);
    for (key, value) in &reply.data {
        println!("data: {key}={value}");
    }
    println!("{}", description.sdp);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_deadline::deadline]
    fn key_value_pairs_parse() {
        assert_eq!(
            parse_key_value("label=caller").unwrap(),
            ("label".to_string(), "caller".to_string())
        );
        assert_eq!(
            parse_key_value("empty=").unwrap(),
            ("empty".to_string(), String::new())
        );
        assert!(parse_key_value("no-separator").is_err());
        assert!(parse_key_value("=value").is_err());
    }

    #[test_deadline::deadline]
    fn cli_accepts_a_handshake_invocation() {
        let cli = Cli::parse_from([
            "berth-server",
            "handshake",
            "--id",
            "room1",
            "--sdp",
            "v=0",
            "--data",
            "label=caller",
        ]);
        match cli.command {
            Some(Commands::Handshake(args)) => {
                assert_eq!(args.id, "room1");
                assert_eq!(args.descriptor.data.len(), 1);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
