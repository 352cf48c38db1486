//! Stream event notifications until interrupted.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example subscription -- --host 192.0.2.1 --user admin --password secret --stream NETCONF
//! ```

use std::env;

use rustconf::{Client, SubscriptionOption};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let client = Client::builder(&args.host)
        .port(args.port)
        .credentials(&args.user, &args.password)
        .build();

    let option = match &args.xpath {
        Some(xpath) => SubscriptionOption::XPath(xpath.clone()),
        None => SubscriptionOption::Stream(args.stream.clone()),
    };

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        println!("\nStopping subscription...");
        signal_token.cancel();
    });

    println!("Subscribed; waiting for notifications (Ctrl-C to stop)");
    let mut stream = client.subscription(option, cancel).await?;
    while let Some(envelope) = stream.next().await? {
        println!("{}", envelope.xml);
    }

    client.close().await?;
    Ok(())
}

struct Args {
    host: String,
    port: u16,
    user: String,
    password: String,
    stream: String,
    xpath: Option<String>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut host = "localhost".to_string();
        let mut port = 830u16;
        let mut user = "admin".to_string();
        let mut password = "admin".to_string();
        let mut stream = "NETCONF".to_string();
        let mut xpath = None;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    i += 1;
                    if i < args.len() {
                        host = args[i].clone();
                    }
                }
                "--port" | "-p" => {
                    i += 1;
                    if i < args.len() {
                        port = args[i].parse().unwrap_or(830);
                    }
                }
                "--user" | "-u" => {
                    i += 1;
                    if i < args.len() {
                        user = args[i].clone();
                    }
                }
                "--password" | "-P" => {
                    i += 1;
                    if i < args.len() {
                        password = args[i].clone();
                    }
                }
                "--stream" | "-s" => {
                    i += 1;
                    if i < args.len() {
                        stream = args[i].clone();
                    }
                }
                "--xpath" | "-x" => {
                    i += 1;
                    if i < args.len() {
                        xpath = Some(args[i].clone());
                    }
                }
                _ => {}
            }
            i += 1;
        }

        Self {
            host,
            port,
            user,
            password,
            stream,
            xpath,
        }
    }
}
