//! Merge a value into the running configuration.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example edit_config -- --host 192.0.2.1 --user admin --password secret \
//!     --xpath '/interfaces/interface[name="eth1"]' --set mtu=9000
//! ```

use std::env;

use rustconf::{Client, Value};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut builder = Client::builder(&args.host)
        .port(args.port)
        .credentials(&args.user, &args.password);
    if let Some(ns) = &args.namespace {
        builder = builder.namespace(ns);
    }
    let client = builder.build();

    let mut values = Value::empty_map();
    for (key, value) in &args.values {
        values.insert(key.clone(), Value::from_text(value));
    }

    println!("Merging into {}...", args.xpath);
    let reply = client.edit_config_merge(&args.xpath, &values).await?;
    println!("Server accepted the edit:\n{}", reply.xml);

    client.close().await?;
    Ok(())
}

struct Args {
    host: String,
    port: u16,
    user: String,
    password: String,
    xpath: String,
    namespace: Option<String>,
    values: Vec<(String, String)>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut host = "localhost".to_string();
        let mut port = 830u16;
        let mut user = "admin".to_string();
        let mut password = "admin".to_string();
        let mut xpath = String::new();
        let mut namespace = None;
        let mut values = Vec::new();

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
                "--namespace" | "-n" => {
                    i += 1;
                    if i < args.len() {
                        namespace = Some(args[i].clone());
                    }
                }
                "--set" | "-s" => {
                    i += 1;
                    if i < args.len() {
                        if let Some((key, value)) = args[i].split_once('=') {
                            values.push((key.to_string(), value.to_string()));
                        }
                    }
                }
                _ => {}
            }
            i += 1;
        }

        if xpath.is_empty() {
            eprintln!("Error: --xpath is required");
            std::process::exit(1);
        }

        Self {
            host,
            port,
            user,
            password,
            xpath,
            namespace,
            values,
        }
    }
}
