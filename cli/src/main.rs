use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use gr_common::db::core::DesignDB;
use gr_common::db::parser::{cap, net};
use gr_common::util::config::Config;
use gr_common::util::generator::{self, BenchmarkSpec};
use gr_common::util::profiler::ScopedTimer;
use gr_common::util::{check, logger, visualization};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    /// Capacity file (also accepted as `-cap`).
    #[arg(long, value_name = "FILE")]
    cap: Option<String>,

    /// Net file (also accepted as `-net`).
    #[arg(long, value_name = "FILE")]
    net: Option<String>,

    /// Guide output (also accepted as `-output`).
    #[arg(long, value_name = "FILE")]
    output: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Route,
    Generate {
        #[arg(long, default_value_t = 5)]
        layers: usize,
        #[arg(long, default_value_t = 100)]
        x_size: usize,
        #[arg(long, default_value_t = 100)]
        y_size: usize,
        #[arg(long, default_value_t = 1000)]
        nets: usize,
        #[arg(long, default_value_t = 10.0)]
        capacity: f64,
        #[arg(long, default_value_t = 4)]
        max_pins: usize,
        #[arg(long, default_value = "inputs/random.cap")]
        cap_out: String,
        #[arg(long, default_value = "inputs/random.net")]
        net_out: String,
    },
}

/// Contest scripts pass these together with a value the router has no use for.
const IGNORED_WITH_VALUE: &[&str] = &["-def", "-v", "-sdc", "library", "-library"];

/// Options `Args` understands that consume the following token.
const VALUE_OPTIONS: &[&str] = &[
    "-c",
    "--config",
    "--cap",
    "--net",
    "--output",
    "--layers",
    "--x-size",
    "--y-size",
    "--nets",
    "--capacity",
    "--max-pins",
    "--cap-out",
    "--net-out",
];

const SWITCHES: &[&str] = &["-h", "--help", "-V", "--version"];

/// Rewrites the single-dash contest flags into clap's long form, drops the
/// ones the router ignores and skips unknown options together with their
/// value.
fn normalize_args(raw: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut args = Vec::new();
    let mut iter = raw.into_iter().peekable();
    if let Some(program) = iter.next() {
        args.push(program);
    }
    while let Some(arg) = iter.next() {
        let name = arg.split('=').next().unwrap_or_default();
        match arg.as_str() {
            "-cap" | "-net" | "-output" => {
                args.push(format!("-{}", arg));
                args.extend(iter.next());
            }
            flag if IGNORED_WITH_VALUE.contains(&flag) => {
                log::debug!("Ignoring {} and its value", flag);
                iter.next();
            }
            _ if SWITCHES.contains(&name) || (arg.contains('=') && VALUE_OPTIONS.contains(&name)) => {
                args.push(arg);
            }
            _ if VALUE_OPTIONS.contains(&name) => {
                args.push(arg);
                args.extend(iter.next());
            }
            flag if flag.starts_with('-') && flag.len() > 1 => {
                log::warn!("Unknown option '{}' skipped", flag);
                if let Some(value) = iter.next_if(|next| !next.starts_with('-')) {
                    log::warn!("Value '{}' of unknown option '{}' skipped", value, flag);
                }
            }
            _ => args.push(arg),
        }
    }
    args
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        log::warn!("Configuration file {:?} not found. Using internal defaults.", path);
        return Ok(Config::default());
    }
    log::info!("Loading configuration from {:?}", path);
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {:?}", path))?;
    let config: Config =
        toml::from_str(&text).with_context(|| format!("Failed to parse config TOML {:?}", path))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration {:?}: {}", path, e))?;
    Ok(config)
}

fn prepare_output_dir(path_str: &str) -> anyhow::Result<()> {
    if let Some(parent) = Path::new(path_str).parent()
        && !parent.exists()
        && !parent.as_os_str().is_empty()
    {
        log::info!("Creating output directory: {:?}", parent);
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn run_routing(config: &Config) -> anyhow::Result<()> {
    let _timer = ScopedTimer::new("Total");
    let mut db = DesignDB::new();

    let (Some(cap_file), Some(net_file)) = (&config.input.cap_file, &config.input.net_file) else {
        anyhow::bail!("both a capacity file and a net file are required");
    };

    log::info!("Parsing capacity file: {}", cap_file);
    cap::parse(&mut db, cap_file)
        .with_context(|| format!("Invalid capacity file '{}'", cap_file))?;
    log::info!("Parsing net file: {}", net_file);
    net::parse(&mut db, net_file).with_context(|| format!("Invalid net file '{}'", net_file))?;

    for path in [
        &config.input.output_file,
        &config.output.heatmap_file,
        &config.output.capacity_file,
        &config.output.congestion_image,
    ]
    .into_iter()
    .flatten()
    {
        prepare_output_dir(path)?;
    }

    let report = gr_router::route(&mut db, config).context("Global routing failed")?;

    if let Some(image) = &config.output.congestion_image {
        log::info!("Drawing congestion map to {}", image);
        visualization::draw_congestion(&db, &report.min_resource, image)?;
    }

    check::run(&db).map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    logger::init();
    let args = Args::parse_from(normalize_args(std::env::args()));
    let mut config = load_config(&args.config)?;

    match args.command.unwrap_or(Commands::Route) {
        Commands::Generate {
            layers,
            x_size,
            y_size,
            nets,
            capacity,
            max_pins,
            cap_out,
            net_out,
        } => {
            prepare_output_dir(&cap_out)?;
            prepare_output_dir(&net_out)?;
            let spec = BenchmarkSpec {
                layers,
                x_size,
                y_size,
                nets,
                capacity,
                max_pins,
            };
            generator::generate_random_benchmark(&spec, &cap_out, &net_out)
                .context("Failed to write benchmark")?;
            log::info!("Generated: {} and {}", cap_out, net_out);
        }
        Commands::Route => {
            if args.cap.is_some() {
                config.input.cap_file = args.cap;
            }
            if args.net.is_some() {
                config.input.net_file = args.net;
            }
            if args.output.is_some() {
                config.input.output_file = args.output;
            }
            if config.input.cap_file.is_none() || config.input.net_file.is_none() {
                log::error!("Missing input files.");
                eprintln!("{}", Args::command().render_usage());
                eprintln!("  gr -cap <file> -net <file> -output <file>");
                std::process::exit(2);
            }

            if let Err(e) = run_routing(&config) {
                log::error!("{:#}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn contest_flags_become_long_options() {
        let args = normalize_args(strings(&[
            "gr", "-cap", "a.cap", "-net", "a.net", "-def", "a.def", "-output", "a.guide",
        ]));
        assert_eq!(
            args,
            strings(&["gr", "--cap", "a.cap", "--net", "a.net", "--output", "a.guide"])
        );
        let parsed = Args::try_parse_from(args).unwrap();
        assert_eq!(parsed.cap.as_deref(), Some("a.cap"));
        assert!(parsed.command.is_none());
    }

    #[test]
    fn ignored_and_unknown_flags_are_dropped() {
        let args = normalize_args(strings(&[
            "gr", "-v", "x.v", "library", "lib", "-sdc", "x.sdc", "-threads", "-c", "r.toml",
        ]));
        assert_eq!(args, strings(&["gr", "-c", "r.toml"]));
    }

    #[test]
    fn unknown_options_drop_their_values() {
        let args = normalize_args(strings(&[
            "gr", "-cap", "a.cap", "-net", "a.net", "-output", "o.guide", "-threads", "4", "-x",
            "--foo", "bar",
        ]));
        assert_eq!(
            args,
            strings(&["gr", "--cap", "a.cap", "--net", "a.net", "--output", "o.guide"])
        );
        let parsed = Args::try_parse_from(args).unwrap();
        assert_eq!(parsed.cap.as_deref(), Some("a.cap"));
        assert_eq!(parsed.net.as_deref(), Some("a.net"));
        assert_eq!(parsed.output.as_deref(), Some("o.guide"));
        assert!(parsed.command.is_none());
    }

    #[test]
    fn known_options_keep_their_values() {
        let args = normalize_args(strings(&[
            "gr", "--config=r.toml", "generate", "--nets", "5", "--bogus", "-q", "--cap-out", "a.cap",
        ]));
        assert_eq!(
            args,
            strings(&["gr", "--config=r.toml", "generate", "--nets", "5", "--cap-out", "a.cap"])
        );
        assert!(Args::try_parse_from(args).is_ok());
    }

    #[test]
    fn generate_subcommand_parses() {
        let parsed =
            Args::try_parse_from(strings(&["gr", "generate", "--nets", "5", "--x-size", "8"]))
                .unwrap();
        match parsed.command {
            Some(Commands::Generate { nets, x_size, .. }) => {
                assert_eq!(nets, 5);
                assert_eq!(x_size, 8);
            }
            _ => panic!("expected generate"),
        }
    }
}
