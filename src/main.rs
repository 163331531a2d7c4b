use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rfnav::config::Config;
use rfnav::redfish::{format_redfish_error, ClientOptions, RedfishClient};
use rfnav::{Created, Resource};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Browse a Redfish service as an object graph
#[derive(Parser, Debug)]
#[command(name = "rfnav", version, about, long_about = None)]
struct Args {
    /// Service base URL, e.g. https://bmc.example.com
    #[arg(long)]
    url: Option<String>,

    /// Account name
    #[arg(short, long)]
    user: Option<String>,

    /// Account password (or REDFISH_PASSWORD)
    #[arg(short, long)]
    password: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long)]
    insecure: bool,

    /// Use HTTP Basic auth instead of a session
    #[arg(long)]
    basic_auth: bool,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the attributes and actions of a resource
    Show { path: String },
    /// Print the raw JSON document
    Raw { path: String },
    /// List the members of a collection
    Members { path: String },
    /// Set one field (PATCH when it is a simple service field)
    Set {
        path: String,
        field: String,
        value: String,
    },
    /// PATCH a JSON object of fields, then re-read the resource
    Patch { path: String, json: String },
    /// Invoke an action with KEY=VALUE arguments
    Invoke {
        path: String,
        action: String,
        args: Vec<String>,
    },
    /// Show the allowable values of a property
    Allowable { path: String, property: String },
    /// Create a member in a collection
    Create { path: String, json: String },
    /// Delete a resource
    Delete { path: String },
    /// Remember a service URL (and account) for later runs
    Use {
        url: String,
        #[arg(short, long)]
        user: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Logging disabled, cannot open {:?}: {}", log_path, e);
            return None;
        },
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("rfnav started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("rfnav").join("rfnav.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".rfnav").join("rfnav.log");
    }
    PathBuf::from("rfnav.log")
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    if let Err(err) = run(args).await {
        match err.downcast_ref::<rfnav::Error>() {
            Some(redfish_err) => eprintln!("Error: {}", format_redfish_error(redfish_err)),
            None => eprintln!("Error: {err:#}"),
        }
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = Config::load();

    if let Command::Use { url, user } = &args.command {
        config
            .set_base_url(url, user.as_deref())
            .context("Failed to save configuration")?;
        println!("Using {}", url);
        return Ok(());
    }

    let client = build_client(&args, &config)?;
    client.connect().await.context("Failed to connect")?;

    let result = execute(&client, args.command).await;

    if let Err(e) = client.logout().await {
        tracing::warn!("Logout failed: {}", e);
    }
    result
}

fn build_client(args: &Args, config: &Config) -> Result<RedfishClient> {
    let Some(base_url) = config.effective_base_url(args.url.as_deref()) else {
        bail!("No Redfish service configured. Set REDFISH_URL, use --url, or run `rfnav use URL`");
    };

    let mut options = ClientOptions::new(&base_url)
        .with_timeout(Duration::from_secs(args.timeout.unwrap_or(config.timeout_secs)));

    let username = config.effective_username(args.user.as_deref());
    let password = config.effective_password(args.password.as_deref());
    if let (Some(username), Some(password)) = (&username, &password) {
        options = options.with_credentials(username, password);
    }
    if args.basic_auth || !config.use_session {
        options = options.with_basic_auth();
    }
    if args.insecure || !config.verify_tls {
        options = options.insecure();
    }

    tracing::info!("Using service: {}, user: {:?}", base_url, username);
    Ok(RedfishClient::new(options)?)
}

async fn execute(client: &RedfishClient, command: Command) -> Result<()> {
    match command {
        Command::Show { path } => {
            let mut resource = client.fetch(&path).await?;
            show(&mut resource).await?;
        },
        Command::Raw { path } => {
            let mut resource = client.fetch(&path).await?;
            let document = resource.to_document().await?;
            println!("{}", serde_json::to_string_pretty(&document)?);
        },
        Command::Members { path } => {
            let mut collection = client.fetch(&path).await?;
            for member in collection.load_members().await? {
                println!("{:<60} {}", member.address().unwrap_or("-"), member);
            }
        },
        Command::Set { path, field, value } => {
            let mut resource = client.fetch(&path).await?;
            resource.set_attr(&field, parse_value(&value)).await?;
            println!("{} = {}", field, resource.attr(&field).await?.summary());
        },
        Command::Patch { path, json } => {
            let mut resource = client.fetch(&path).await?;
            resource.update(parse_object(&json)?).await?;
            println!("Updated {}", resource);
        },
        Command::Invoke { path, action, args } => {
            let mut resource = client.fetch(&path).await?;
            let mut arguments = Map::new();
            for arg in &args {
                let (key, value) = parse_argument(arg)?;
                arguments.insert(key, value);
            }
            match resource.invoke(&action, arguments).await? {
                Some(response) => println!("{}", serde_json::to_string_pretty(&response)?),
                None => println!("{} accepted", action),
            }
        },
        Command::Allowable { path, property } => {
            let mut resource = client.fetch(&path).await?;
            match resource.allowable_values(&property).await? {
                Some(values) => {
                    for value in values {
                        println!("{}", value.as_str().map_or_else(|| value.to_string(), str::to_string));
                    }
                },
                None => println!("{} declares no allowable values for {}", resource, property),
            }
        },
        Command::Create { path, json } => {
            let mut collection = client.fetch(&path).await?;
            match collection.create(&Value::Object(parse_object(&json)?)).await? {
                Created::Member(member) => {
                    println!("Created {} at {}", member, member.address().unwrap_or("-"))
                },
                Created::Refreshed => {
                    let count = collection.len().await?;
                    println!("Created; {} now has {} members", collection, count)
                },
            }
        },
        Command::Delete { path } => {
            client.resource(&path).delete().await?;
            println!("Deleted {}", path);
        },
        Command::Use { .. } => {},
    }
    Ok(())
}

async fn show(resource: &mut Resource) -> Result<()> {
    println!("{}", resource);
    for name in resource.attribute_names().await? {
        let value = resource.attr(&name).await?;
        println!("  {:<32} {}", name, value.summary());
    }

    let actions = resource.action_names().await?;
    if !actions.is_empty() {
        println!("Actions:");
        for name in actions {
            let descriptor = resource.action(&name).await?;
            println!("  {:<32} {}", name, descriptor.signature());
        }
    }
    Ok(())
}

/// JSON when it parses, else a plain string
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn parse_object(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str(raw).context("Invalid JSON")? {
        Value::Object(map) => Ok(map),
        _ => bail!("Expected a JSON object, got: {}", raw),
    }
}

fn parse_argument(raw: &str) -> Result<(String, Value)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), parse_value(value))),
        _ => bail!("Arguments must look like KEY=VALUE, got: {}", raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_value_prefers_json() {
        assert_eq!(parse_value("42"), json!(42));
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value("ForceOff"), json!("ForceOff"));
        assert_eq!(parse_value("\"On\""), json!("On"));
    }

    #[test]
    fn test_parse_argument() {
        assert_eq!(
            parse_argument("ResetType=ForceOff").unwrap(),
            ("ResetType".to_string(), json!("ForceOff"))
        );
        assert_eq!(parse_argument("Delay=5").unwrap().1, json!(5));
        assert!(parse_argument("NoEquals").is_err());
        assert!(parse_argument("=x").is_err());
    }

    #[test]
    fn test_parse_object_rejects_non_objects() {
        assert!(parse_object(r#"{"AssetTag": "x"}"#).is_ok());
        assert!(parse_object("[1, 2]").is_err());
        assert!(parse_object("{oops").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "rfnav", "--url", "https://bmc", "--insecure", "invoke", "/redfish/v1/Systems/1",
            "Reset", "ResetType=On",
        ])
        .unwrap();
        assert!(args.insecure);
        assert!(matches!(args.command, Command::Invoke { ref args, .. } if args.len() == 1));
    }
}
