//! simpleflash-demo：向 Gemini 发送单条提示并打印结果
//!
//! Usage:
//!   simpleflash-demo [--count] [PROMPT...]
//!
//! Without a prompt, asks for a haiku about the color of cows.

use std::time::Duration;

use simpleflash::{FlashClientBuilder, Query, SessionConfig};
use tracing_subscriber::EnvFilter;

const DEFAULT_PROMPT: &str = "Write a haiku about the color of cows.";

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }
    let count_only = args.iter().any(|a| a == "--count");
    let words: Vec<&str> = args
        .iter()
        .filter(|a| !a.starts_with("--"))
        .map(String::as_str)
        .collect();
    let prompt = if words.is_empty() {
        DEFAULT_PROMPT.to_string()
    } else {
        words.join(" ")
    };

    let config = match SessionConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    init_logging(config.verbose);

    if std::env::var("PROJECT_ID").map(|v| v.trim().is_empty()).unwrap_or(true) {
        eprintln!("Error: PROJECT_ID environment variable is not set.");
        std::process::exit(1);
    }

    let client = match FlashClientBuilder::from_config(config.with_cache(true))
        .timeout(Duration::from_secs(10))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let outcome = if count_only {
        client.count_tokens(&prompt).await.map(|n| n.to_string())
    } else {
        client.query_model(&Query::new(prompt)).await
    };

    match outcome {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_usage() {
    println!(
        r#"simpleflash-demo: query a Gemini model on Vertex AI

USAGE:
    simpleflash-demo [--count] [PROMPT...]

OPTIONS:
    --count                 Print the prompt's token count instead of a response
    -h, --help              Show this help message

ENVIRONMENT:
    PROJECT_ID              Google Cloud project (required)
    PROJECT_LOCATION        Region (default: europe-west4)
    GOOGLE_OAUTH_ACCESS_TOKEN
                            Bearer token for Vertex AI
    VERBOSE                 Log at info level
    RUST_LOG                Overrides the log filter"#
    );
}
