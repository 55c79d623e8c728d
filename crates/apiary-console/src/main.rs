use anyhow::Context;
use apiary_console::{ConsoleBuilder, LoadState, ViewData, ViewId};
use apiary_core::ConsoleConfig;
use clap::{Arg, ArgAction, Command};
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Command::new("apiary")
        .version(apiary_console::VERSION)
        .about("Honeypot fleet admin console")
        .arg(
            Arg::new("config")
                .long("config")
                .help("Path to a TOML configuration file"),
        )
        .arg(
            Arg::new("api-base")
                .long("api-base")
                .help("Override the REST base URL"),
        )
        .arg(Arg::new("username").long("username").required(true))
        .arg(
            Arg::new("password")
                .long("password")
                .help("Password; falls back to $APIARY_PASSWORD"),
        )
        .arg(
            Arg::new("remember")
                .long("remember")
                .action(ArgAction::SetTrue)
                .help("Remember the username for the next login"),
        )
        .arg(
            Arg::new("watch-secs")
                .long("watch-secs")
                .default_value("0")
                .value_parser(clap::value_parser!(u64))
                .help("Keep watching node updates for this many seconds"),
        )
        .get_matches();

    let mut config = match cli.get_one::<String>("config") {
        Some(path) => ConsoleConfig::from_toml_file(path).context("loading configuration")?,
        None => ConsoleConfig::new(),
    };
    if let Some(api_base) = cli.get_one::<String>("api-base") {
        config = config.with_api_base(api_base.clone());
    }

    let username = cli.get_one::<String>("username").expect("required");
    let password = match cli.get_one::<String>("password") {
        Some(password) => password.clone(),
        None => std::env::var("APIARY_PASSWORD")
            .context("pass --password or set APIARY_PASSWORD")?,
    };
    let remember = cli.get_flag("remember");
    let watch_secs = *cli.get_one::<u64>("watch-secs").expect("defaulted");

    let (session, mut notices) = ConsoleBuilder::new(config)
        .login(username, &password, remember)
        .await
        .context("login failed")?;

    let profile = session.profile();
    println!("signed in as {} <{}>", profile.username, profile.email);
    println!("navigable views:");
    for view in session.navigable_views() {
        println!("  {:<14} {}", view.id.slug(), view.title);
    }

    match session.navigate(ViewId::Monitor).await {
        Ok(_) => match session.router().content(ViewId::Monitor) {
            Some(LoadState::Ready(ViewData::Monitor(nodes))) => {
                println!("{} nodes in fleet:", nodes.len());
                for node in nodes {
                    println!(
                        "  #{:<4} {:<18} {:<16} {:?} cpu {:.1}%",
                        node.id, node.name, node.ip_address, node.status, node.cpu_usage
                    );
                }
            }
            Some(LoadState::Failed(message)) => println!("node list unavailable: {message}"),
            _ => {}
        },
        Err(err) => println!("monitor unavailable: {err}"),
    }

    if watch_secs > 0 {
        println!("watching for {watch_secs}s...");
        let deadline = tokio::time::Instant::now() + Duration::from_secs(watch_secs);
        loop {
            tokio::select! {
                () = tokio::time::sleep_until(deadline) => break,
                notice = notices.recv() => match notice {
                    Some(notice) => println!("[{:?}] {}", notice.level, notice.message),
                    None => break,
                },
            }
        }
        println!(
            "fleet now: {} nodes, {} online",
            session.fleet().len(),
            session.fleet().online_count()
        );
    }

    session.logout().await;
    Ok(())
}
