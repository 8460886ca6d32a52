//!
//! admin_enforcer CLI binary
//! -------------------------
//! Manage domain rules and dry-run the save check from a terminal. Uses the same
//! `ENFORCER_*` environment configuration as the server, so it reads and writes
//! the installation storage when configured and the local store otherwise.

use std::env;

use anyhow::{anyhow, Result};
use tracing_subscriber::{EnvFilter, fmt};

use admin_enforcer::config::EnforcerConfig;
use admin_enforcer::host::{self, LogSink};
use admin_enforcer::evaluate;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} list\n  {program} add <domain> <admin-email>\n  {program} remove <domain>\n  {program} clear\n  {program} check --requester <email> [--cc <email,email,...>]\n\nEnvironment:\n  ENFORCER_REMOTE_URL        ticketing host base URL (unset: local storage only)\n  ENFORCER_REMOTE_TOKEN      bearer token for the host API\n  ENFORCER_INSTALLATION_ID   skip the installation metadata lookup\n  ENFORCER_LOCAL_PATH        local fallback store (default: enforcer_local.json)\n\nExamples:\n  {program} add @acme.com erin@acme.com\n  {program} check --requester bob@acme.com --cc carol@acme.com,erin@acme.com"
    );
}

enum Command {
    List,
    Add { domain: String, email: String },
    Remove { domain: String },
    Clear,
    Check { requester: Option<String>, cc: Vec<String> },
}

fn parse_args(args: &[String]) -> Result<Command> {
    let Some(cmd) = args.first() else { return Err(anyhow!("missing command")) };
    match cmd.as_str() {
        "list" => Ok(Command::List),
        "add" => match (args.get(1), args.get(2)) {
            (Some(d), Some(e)) => Ok(Command::Add { domain: d.clone(), email: e.clone() }),
            _ => Err(anyhow!("add requires <domain> <admin-email>")),
        },
        "remove" => match args.get(1) {
            Some(d) => Ok(Command::Remove { domain: d.clone() }),
            None => Err(anyhow!("remove requires <domain>")),
        },
        "clear" => Ok(Command::Clear),
        "check" => {
            let mut requester: Option<String> = None;
            let mut cc: Vec<String> = Vec::new();
            let mut i = 1;
            while i < args.len() {
                match args[i].as_str() {
                    "--requester" => {
                        if i + 1 >= args.len() { return Err(anyhow!("--requester requires a value")); }
                        requester = Some(args[i + 1].clone());
                        i += 2; continue;
                    }
                    "--cc" => {
                        if i + 1 >= args.len() { return Err(anyhow!("--cc requires a value")); }
                        cc.extend(args[i + 1].split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()));
                        i += 2; continue;
                    }
                    unk => return Err(anyhow!("Unrecognized argument: {}", unk)),
                }
            }
            Ok(Command::Check { requester, cc })
        }
        unk => Err(anyhow!("Unknown command: {}", unk)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("warn"))?;
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let mut args: Vec<String> = env::args().collect();
    let program = args.remove(0);
    if args.iter().any(|a| a == "-h" || a == "--help") {
        print_usage(&program);
        return Ok(());
    }
    let command = match parse_args(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            print_usage(&program);
            std::process::exit(2);
        }
    };

    let store = EnforcerConfig::from_env()?.build_store()?;
    match command {
        Command::List => {
            let rules = store.load_all().await;
            if rules.is_empty() {
                println!("No domain rules set.");
            }
            for (domain, email) in rules.iter() {
                println!("@{}\t{}", domain, email);
            }
        }
        Command::Add { domain, email } => match store.add_or_update(&domain, &email).await {
            Ok(rule) => println!("@{} -> {}", rule.domain, rule.email),
            Err(e) => {
                eprintln!("{}", e.message());
                std::process::exit(1);
            }
        },
        Command::Remove { domain } => {
            if !host::remove_rule(&store, &domain, &LogSink).await? {
                eprintln!("no rule for @{}", domain.trim_start_matches('@'));
            }
        }
        Command::Clear => store.clear().await?,
        Command::Check { requester, cc } => {
            let rules = store.load_all().await;
            let verdict = evaluate(requester.as_deref(), cc.iter().map(|s| Some(s.as_str())), &rules);
            match verdict.message() {
                None => println!("allow"),
                Some(msg) => {
                    println!("deny: {}", msg);
                    std::process::exit(1);
                }
            }
        }
    }
    Ok(())
}
