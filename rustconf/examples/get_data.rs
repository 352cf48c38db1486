//! Fetch data addressed by an XPath and print the pruned result.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example get_data -- --host 192.0.2.1 --user admin --password secret --xpath /interfaces/interface
//! ```

use std::env;

use rustconf::{Client, DataKind};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let client = Client::builder(&args.host)
        .port(args.port)
        .credentials(&args.user, &args.password)
        .build();

    let kind = match args.kind.as_deref() {
        Some("config") => Some(DataKind::Config),
        Some("state") => Some(DataKind::State),
        Some("schema") => Some(DataKind::Schema),
        _ => None,
    };

    println!("Fetching {} from {}:{}...", args.xpath, args.host, args.port);
    let reply = client.get_data(&args.xpath, kind).await?;
    println!("{:#?}", reply.result);

    client.close().await?;
    Ok(())
}

struct Args {
    host: String,
    port: u16,
    user: String,
    password: String,
    xpath: String,
    kind: Option<String>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut host = "localhost".to_string();
        let mut port = 830u16;
        let mut user = "admin".to_string();
        let mut password = "admin".to_string();
        let mut xpath = "/".to_string();
        let mut kind = None;

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
                "--xpath" | "-x" => {
                    i += 1;
                    if i < args.len() {
                        xpath = args[i].clone();
                    }
                }
                "--kind" | "-k" => {
                    i += 1;
                    if i < args.len() {
                        kind = Some(args[i].clone());
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
            xpath,
            kind,
        }
    }
}
