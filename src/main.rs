use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use televoodoo_host::{Event, FnEventSink, Host, HostConfig};

/// Runs a televoodoo host against one mobile pose-stream client.
#[derive(Debug, Parser)]
#[command(name = "televoodood", version, about)]
struct Args {
    /// 6-character `[A-Z0-9]` shared secret the mobile client must present.
    #[arg(long)]
    auth_code: String,

    /// Name advertised in the UDP discovery beacon.
    #[arg(long, default_value = "televoodoo")]
    service_name: String,

    /// TCP port the pose-stream listener binds.
    #[arg(long, default_value_t = 50000)]
    tcp_port: u16,

    /// UDP port the discovery beacon broadcasts to.
    #[arg(long, default_value_t = 50001)]
    beacon_port: u16,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = HostConfig::builder()
        .auth_code(args.auth_code)
        .service_name(args.service_name)
        .tcp_port(args.tcp_port)
        .beacon_port(args.beacon_port)
        .build();

    let event_sink = Arc::new(FnEventSink::new(|event: Event| {
        println!("{event:?}");
    }));

    let host = match Host::start(config, event_sink).await {
        Ok(host) => host,
        Err(error) => {
            eprintln!("error: {error}");
            return ExitCode::from(1);
        }
    };

    println!("listening on {}", host.local_addr());

    if let Err(error) = tokio::signal::ctrl_c().await {
        eprintln!("error waiting for ctrl-c: {error}");
    }

    host.stop().await;
    ExitCode::SUCCESS
}
