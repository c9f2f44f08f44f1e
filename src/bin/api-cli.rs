use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use reqwest::Method;
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use media_api_client::config::{load_config, ClientConfig};
use media_api_client::http::{
    ConnectionSettings, Query, QueryValue, Request, RequestBody, RequestError, RequestOptions,
    ResponseBody,
};
use media_api_client::observability::{logging, metrics, TracingObserver};
use media_api_client::{KeyProxy, TransportRuntime};

#[derive(Parser)]
#[command(name = "api-cli")]
#[command(about = "Issue calls against the media API through the client transport", long_about = None)]
struct Cli {
    /// API host; a scheme is optional (HTTPS when omitted).
    #[arg(long)]
    host: Option<String>,

    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Talk plain HTTP to `--host`.
    #[arg(long)]
    insecure_http: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one request and print the response body
    Request {
        method: String,
        path: String,
        /// Query parameter as key=value; repeat a key to send a list
        #[arg(long = "query", value_name = "KEY=VALUE")]
        query: Vec<String>,
        /// Extra header as name:value
        #[arg(long = "header", value_name = "NAME:VALUE")]
        header: Vec<String>,
        /// JSON request body
        #[arg(long)]
        data: Option<String>,
        /// Stream the body to stdout instead of parsing it
        #[arg(long)]
        raw: bool,
    },
    /// Exchange client credentials for a token
    Token { client_id: String, secret: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };

    logging::init_logging(&config.observability);
    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?);
    }

    let runtime = Arc::new(TransportRuntime::new(config.agents.clone(), config.timeouts.clone()));

    match cli.command {
        Commands::Request {
            method,
            path,
            query,
            header,
            data,
            raw,
        } => {
            let settings = connection_settings(&config, cli.host.as_deref(), cli.insecure_http)?;
            let mut request = Request::new(settings, runtime);
            if config.observability.log_requests {
                request = request.with_observer(Arc::new(TracingObserver));
            }

            let method = Method::from_bytes(method.to_uppercase().as_bytes())?;
            let mut options = RequestOptions::pathname(path).headers(parse_headers(&header)?);
            let query = parse_query(&query)?;
            if !query.is_empty() {
                options = options.query(query);
            }
            if raw {
                options = options.raw_stream();
            }
            let body = data
                .map(|text| serde_json::from_str::<Value>(&text).map(RequestBody::from))
                .transpose()?;

            match request.send(method, options, body).await {
                Ok(body) => print_body(body).await?,
                Err(e) => {
                    report(&e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Token { client_id, secret } => {
            let mut keys = config.keys.clone();
            if let Some(host) = cli.host {
                keys.host = host;
            }
            let proxy = KeyProxy::from_config(&keys, runtime)?;
            match proxy.generate_token(&client_id, &secret).await {
                Ok(token) => println!("{}", serde_json::to_string_pretty(&token)?),
                Err(e) => {
                    report(&e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

fn connection_settings(
    config: &ClientConfig,
    host: Option<&str>,
    insecure_http: bool,
) -> Result<ConnectionSettings, RequestError> {
    let mut settings = match host {
        Some(host) => {
            let parsed = ConnectionSettings::from_url(host)?;
            ConnectionSettings {
                headers: config.connection.headers.clone(),
                timeout_ms: config.connection.timeout_ms,
                ..parsed
            }
        }
        None => config.connection.clone(),
    };
    if insecure_http {
        settings.secure = false;
    }
    if settings.host.is_empty() {
        return Err(RequestError::invalid_argument(
            "no host: pass --host or set [connection].host",
        ));
    }
    Ok(settings)
}

fn parse_query(pairs: &[String]) -> Result<Query, String> {
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("query parameter must be key=value: {}", pair))?;
        match grouped.iter_mut().find(|(k, _)| k == key) {
            Some((_, values)) => values.push(value.to_string()),
            None => grouped.push((key.to_string(), vec![value.to_string()])),
        }
    }

    Ok(grouped
        .into_iter()
        .map(|(key, mut values)| {
            let value = if values.len() == 1 {
                QueryValue::Single(values.remove(0))
            } else {
                QueryValue::List(values)
            };
            (key, value)
        })
        .collect())
}

fn parse_headers(headers: &[String]) -> Result<BTreeMap<String, String>, String> {
    headers
        .iter()
        .map(|header| {
            header
                .split_once(':')
                .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
                .ok_or_else(|| format!("header must be name:value: {}", header))
        })
        .collect()
}

async fn print_body(body: ResponseBody) -> Result<(), Box<dyn std::error::Error>> {
    match body {
        ResponseBody::Empty => {}
        ResponseBody::Json(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        ResponseBody::Stream(stream) => {
            let mut chunks = stream.into_byte_stream();
            let mut stdout = tokio::io::stdout();
            while let Some(chunk) = chunks.next().await {
                stdout.write_all(&chunk?).await?;
            }
            stdout.flush().await?;
        }
    }
    Ok(())
}

fn report(error: &RequestError) {
    eprintln!("Error: {}", error.message());
    if let Some(status) = error.status_code() {
        eprintln!("Status: {}", status);
    }
    if let Some(code) = error.code() {
        eprintln!("Code: {}", code.as_str());
    }
    if let Some(body) = error.body() {
        if let Ok(text) = serde_json::to_string_pretty(&body) {
            eprintln!("Response: {}", text);
        }
    }
}
