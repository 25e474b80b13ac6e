use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::Value;

use webrehook::condition::{self, evaluate, truthy};
use webrehook::config::load_confdir;
use webrehook::observability::logging;

#[derive(Parser)]
#[command(name = "rehook-cli")]
#[command(about = "Operator tooling for the webrehook router", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate a configuration directory
    Check {
        #[arg(long, default_value = "./")]
        confdir: PathBuf,

        /// `done` for rules that do not set it
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        autodone: bool,
    },
    /// Compile a when clause and evaluate it against a payload
    Eval {
        #[arg(long)]
        when: String,

        /// JSON file; evaluates against `{}` when omitted
        #[arg(long)]
        payload: Option<PathBuf>,
    },
    /// POST a payload to a running router
    Send {
        #[arg(short, long, default_value = "http://localhost:8080/")]
        url: String,

        #[arg(long)]
        payload: PathBuf,

        /// Extra request header, `name=value`; repeatable
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,
    },
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected name=value, got '{}'", raw)),
    }
}

fn read_payload(path: &Path) -> anyhow::Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init(Some("warn"));
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { confdir, autodone } => check(&confdir, autodone)?,
        Commands::Eval { when, payload } => {
            let payload = match payload {
                Some(path) => read_payload(&path)?,
                None => Value::Object(Default::default()),
            };
            eval(&when, &payload)?;
        }
        Commands::Send { url, payload, headers } => {
            send(&url, &read_payload(&payload)?, &headers).await?;
        }
    }

    Ok(())
}

fn check(confdir: &Path, autodone: bool) -> anyhow::Result<()> {
    let config = load_confdir(confdir, autodone)?;

    println!("routes ({}):", config.routes.len());
    for (name, url) in config.routes.iter() {
        println!("  {:<20} {}", name, url);
    }

    println!("templates ({}):", config.templates.len());
    for name in config.templates.names() {
        println!("  {}", name);
    }

    println!("rules ({}):", config.rules.len());
    for rule in &config.rules {
        println!(
            "  {:<20} routes={} template={} done={}",
            rule.name,
            rule.routes.join(","),
            rule.template,
            rule.done
        );
        for (name, value) in rule.headers.expected() {
            println!("    header {}: {}", name, value);
        }
        if let Some(matcher) = &rule.condition {
            println!("    when   {}", matcher.condition().root());
        }
    }

    println!("OK");
    Ok(())
}

fn eval(when: &str, payload: &Value) -> anyhow::Result<()> {
    let compiled = match condition::compile("<cli>", when) {
        Ok(compiled) => compiled,
        Err(e) => {
            eprintln!("{}", when);
            eprintln!("{:>width$}", "^", width = e.offset + 1);
            bail!(e);
        }
    };

    let value = evaluate(compiled.root(), payload);
    println!("ast:    {}", compiled.root());
    println!("value:  {}", value);
    println!("match:  {}", truthy(&value));
    Ok(())
}

async fn send(url: &str, payload: &Value, headers: &[(String, String)]) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let mut request = client.post(url).json(payload);
    for (name, value) in headers {
        request = request.header(name.as_str(), value.as_str());
    }

    let res = request.send().await.with_context(|| format!("cannot reach {}", url))?;
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: router returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        bail!("delivery to {} failed", url);
    }

    println!("{}", status);
    Ok(())
}
