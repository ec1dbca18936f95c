use std::future::Future;
use std::process;

use serde_json::{Map, Value};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use consolet::install::{self, ConnectorSpec};
use consolet::{ChannelConfig, ChannelDir, ConsoleBridge, HostClient, Outcome};

fn main() {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let code = match args.get(1).map(String::as_str) {
        Some("call") => run_async(cmd_call(&args[2..])),
        Some("ping") => run_async(cmd_ping()),
        Some("install") => cmd_install(),
        Some("uninstall") => cmd_uninstall(),
        Some("check") => run_async(cmd_check()),
        Some("--version" | "-V") => {
            println!("consolet {}", consolet::VERSION);
            0
        }
        Some("--help" | "-h" | "help") | None => {
            usage();
            0
        }
        Some(other) => {
            eprintln!("error: unknown command: {other}");
            eprintln!();
            usage();
            2
        }
    };

    process::exit(code);
}

fn usage() {
    eprintln!("Usage: consolet <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  call <action> [params-json]   Send one command to the host and print the result");
    eprintln!("  ping                          Probe whether the host listener is running");
    eprintln!("  install                       Create the channel directory and register with the agent config");
    eprintln!("  uninstall                     Remove the registration and the channel directory");
    eprintln!("  check                         Diagnose the setup");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  CONSOLET_IPC_DIR              Channel directory (default ~/.consolet)");
    eprintln!("  CONSOLET_POLL_INTERVAL_MS     Response poll interval (default 30)");
    eprintln!("  CONSOLET_TIMEOUT_MS           Per-command timeout (default 10000)");
    eprintln!("  CONSOLET_AGENT_CONFIG         Agent config file targeted by install/uninstall");
}

fn run_async(fut: impl Future<Output = i32>) -> i32 {
    match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime.block_on(fut),
        Err(e) => {
            eprintln!("error: failed to start runtime: {e}");
            1
        }
    }
}

fn init_tracing() {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new("consolet=info")
    };

    let use_json = std::env::var("CONSOLET_LOG_FORMAT").as_deref() == Ok("json");

    if use_json {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    }
}

async fn cmd_call(args: &[String]) -> i32 {
    let Some(action) = args.first() else {
        eprintln!("error: missing required argument: <action>");
        eprintln!();
        eprintln!("Usage: consolet call <action> [params-json]");
        return 2;
    };

    let params = match args.get(1) {
        None => Map::new(),
        Some(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                eprintln!("error: params must be a JSON object, e.g. '{{\"bpm\": 120}}'");
                return 2;
            }
            Err(e) => {
                eprintln!("error: params are not valid JSON: {e}");
                return 2;
            }
        },
    };
    if args.len() > 2 {
        eprintln!("error: unexpected argument: {}", args[2]);
        return 2;
    }

    let client = HostClient::from_env();
    report(run_call(&client, action, params).await)
}

/// All command execution funnels through the dispatch boundary.
async fn run_call(bridge: &dyn ConsoleBridge, action: &str, params: Map<String, Value>) -> Outcome {
    bridge.call(action, params).await
}

fn report(outcome: Outcome) -> i32 {
    match outcome {
        Outcome::Success { result } => {
            let rendered =
                serde_json::to_string_pretty(&result).unwrap_or_else(|_| result.to_string());
            println!("{rendered}");
            0
        }
        Outcome::Failure { error } => {
            eprintln!("error: {error}");
            1
        }
    }
}

async fn cmd_ping() -> i32 {
    let client = HostClient::from_env();
    match client.ping(install::CHECK_PING_TIMEOUT).await {
        Outcome::Success { .. } => {
            println!("host is responding");
            0
        }
        Outcome::Failure { error } => {
            eprintln!("error: {error}");
            1
        }
    }
}

fn cmd_install() -> i32 {
    let config = ChannelConfig::from_env();
    let channel = ChannelDir::new(config.dir.clone());
    let agent_config = install::agent_config_path();

    let spec = match ConnectorSpec::current_exe() {
        Ok(spec) => spec,
        Err(e) => {
            eprintln!("error: {e:#}");
            return 1;
        }
    };

    println!("[1/2] Channel directory: {}", channel.dir().display());
    println!("[2/2] Agent config:      {}", agent_config.display());
    match install::install(&channel, &agent_config, &spec) {
        Ok(true) => {
            println!();
            println!("Installed. Restart the driving agent, then start the console");
            println!("listener inside the host application.");
            0
        }
        Ok(false) => {
            println!();
            println!("Already configured, nothing to do.");
            0
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            1
        }
    }
}

fn cmd_uninstall() -> i32 {
    let config = ChannelConfig::from_env();
    let channel = ChannelDir::new(config.dir.clone());
    let agent_config = install::agent_config_path();

    match install::uninstall(&channel, &agent_config) {
        Ok(report) => {
            println!(
                "Agent config entry: {}",
                if report.removed_config {
                    "removed"
                } else {
                    "not found"
                }
            );
            println!(
                "Channel directory:  {}",
                if report.removed_channel_dir {
                    "removed"
                } else {
                    "not found"
                }
            );
            0
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            1
        }
    }
}

async fn cmd_check() -> i32 {
    let client = HostClient::from_env();
    let agent_config = install::agent_config_path();

    println!("consolet {} - setup check", consolet::VERSION);
    println!();

    let report = install::check(&client, &agent_config).await;

    println!(
        "  [{}] channel directory: {}",
        if report.channel_dir_exists {
            "OK"
        } else {
            "MISSING"
        },
        report.channel_dir.display()
    );
    println!(
        "  [{}] agent config entry: {}",
        if report.agent_configured {
            "OK"
        } else {
            "MISSING"
        },
        report.agent_config.display()
    );
    match &report.host {
        Outcome::Success { .. } => println!("  [OK] host listener is responding"),
        Outcome::Failure { error } => {
            println!("  [--] host listener: {error}");
        }
    }

    println!();
    if report.all_ok() {
        println!("Everything looks good.");
        0
    } else {
        println!("Some issues found. Run 'consolet install' to fix configuration,");
        println!("and start the console listener inside the host application.");
        1
    }
}
