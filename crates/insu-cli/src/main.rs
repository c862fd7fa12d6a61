use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use insu_sync::{AppConfig, SelectionOutcome, SyncContext};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod render;

fn cli() -> Command {
    Command::new("insu-compare")
        .version(insu_sync::VERSION)
        .about("Insurance product comparison table")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .global(true)
                .help("Backend base URL (overrides the configuration file)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(Command::new("pdfs").about("List catalog files"))
        .subcommand(
            Command::new("codes")
                .about("List the primary codes of a catalog file")
                .arg(
                    Arg::new("file")
                        .long("file")
                        .required(true)
                        .help("Catalog file name"),
                ),
        )
        .subcommand(
            Command::new("compare")
                .about("Build the comparison table for a primary code")
                .arg(Arg::new("code").required(true).help("Primary product code"))
                .arg(
                    Arg::new("age")
                        .long("age")
                        .value_parser(value_parser!(u32))
                        .help("Applicant age"),
                )
                .arg(
                    Arg::new("base-amount")
                        .long("base-amount")
                        .value_parser(value_parser!(u64))
                        .help("Base coverage amount"),
                )
                .arg(
                    Arg::new("range")
                        .long("range")
                        .action(ArgAction::SetTrue)
                        .help("Also fetch the min/max premium range per row"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("product")
                .about("Show one product's detail, limit and contract notes")
                .arg(Arg::new("code").required(true).help("Product code"))
                .arg(
                    Arg::new("age")
                        .long("age")
                        .value_parser(value_parser!(u32))
                        .help("Applicant age"),
                ),
        )
}

fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<AppConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(base_url) = matches.get_one::<String>("base-url") {
        config.upstream.base_url.clone_from(base_url);
    }
    Ok(config)
}

fn print_error_log(ctx: &SyncContext) {
    let entries = ctx.error_log().entries();
    if entries.is_empty() {
        return;
    }
    eprintln!("알림:");
    for entry in entries {
        eprintln!("  {entry}");
    }
}

async fn compare(ctx: &SyncContext, args: &ArgMatches) -> anyhow::Result<()> {
    let Some(code) = args.get_one::<String>("code") else {
        bail!("missing product code");
    };
    if let Some(age) = args.get_one::<u32>("age") {
        ctx.set_age(*age).settle().await;
    }
    if let Some(base_amount) = args.get_one::<u64>("base-amount") {
        ctx.set_base_amount(*base_amount).settle().await;
    }

    match ctx.select_primary_code(code).await {
        SelectionOutcome::Expanded(batch) => {
            let outcomes = batch.settle().await;
            tracing::info!(code, rows = outcomes.len(), "comparison settled");
        }
        SelectionOutcome::Failed(err) => {
            print_error_log(ctx);
            return Err(err).context("building comparison table");
        }
        SelectionOutcome::Superseded => bail!("selection of {code} was superseded"),
    }

    let rows = ctx.rows();
    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        let params = ctx.params();
        println!("나이 {} / 기준금액 {}", params.age, render::won(params.base_amount as f64));
        print!("{}", render::rows_table(&rows));
    }
    print_error_log(ctx);
    Ok(())
}

async fn product(ctx: &SyncContext, args: &ArgMatches) -> anyhow::Result<()> {
    let Some(code) = args.get_one::<String>("code") else {
        bail!("missing product code");
    };
    let age = args.get_one::<u32>("age").copied();

    ctx.load_product(code).await;
    ctx.load_limit(code, age).await;
    ctx.load_minmax_premium(code, age).await;
    ctx.load_contract_terms(code).await;
    ctx.check_data_availability(code, age).await;

    print!("{}", render::panel_text(&ctx.panel()));
    print_error_log(ctx);
    Ok(())
}

async fn run(matches: ArgMatches) -> anyhow::Result<()> {
    let mut config = load_config(&matches)?;

    match matches.subcommand() {
        Some(("pdfs", _)) => {
            let ctx = SyncContext::from_config(&config)?;
            ctx.list_pdfs().await;
            for pdf in ctx.panel().pdfs {
                println!("{}\t{}", pdf.name, pdf.size);
            }
            print_error_log(&ctx);
        }
        Some(("codes", args)) => {
            let ctx = SyncContext::from_config(&config)?;
            let Some(file) = args.get_one::<String>("file") else {
                bail!("missing catalog file");
            };
            ctx.list_codes(file).await;
            for entry in ctx.panel().codes {
                println!("{}\t{}", entry.code, entry.name);
            }
            print_error_log(&ctx);
        }
        Some(("compare", args)) => {
            if args.get_flag("range") {
                config.sync.fetch_premium_range = true;
            }
            let ctx = SyncContext::from_config(&config)?;
            compare(&ctx, args).await?;
        }
        Some(("product", args)) => {
            let ctx = SyncContext::from_config(&config)?;
            product(&ctx, args).await?;
        }
        _ => bail!("unknown command"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));
    run(matches).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn base_url_overrides_default() {
        let matches = cli()
            .try_get_matches_from(["insu-compare", "--base-url", "http://backend:9000", "pdfs"])
            .unwrap();
        let config = load_config(&matches).unwrap();
        assert_eq!(config.upstream.base_url, "http://backend:9000");
    }

    #[test]
    fn compare_parses_parameters() {
        let matches = cli()
            .try_get_matches_from(["insu-compare", "compare", "21686", "--age", "30", "--json"])
            .unwrap();
        let Some(("compare", args)) = matches.subcommand() else {
            panic!("expected compare");
        };
        assert_eq!(args.get_one::<String>("code").map(String::as_str), Some("21686"));
        assert_eq!(args.get_one::<u32>("age"), Some(&30));
        assert!(args.get_flag("json"));
        assert!(!args.get_flag("range"));
    }
}
