use descent::config::GameConfig;
use descent::content::{place_content, ContentTables};
use descent::database::FileSaveStore;
use descent::dungeon::DungeonGenerator;
use descent::game::TurnEngine;
use descent::network::GameServer;
use clap::{value_parser, Arg, ArgMatches, Command};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;
use anyhow::{Context, Result};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let matches = Command::new("descent")
        .about("A turn-based dungeon crawler")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("serve")
                .about("Run the game server")
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .value_name("PORT")
                        .value_parser(value_parser!(u16))
                        .default_value("2323")
                        .help("TCP port to listen on"),
                )
                .arg(
                    Arg::new("saves")
                        .long("saves")
                        .value_name("DIR")
                        .value_parser(value_parser!(PathBuf))
                        .default_value("saves")
                        .help("Directory holding save files"),
                )
                .arg(content_arg())
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("generate")
                .about("Print a freshly generated and populated floor as JSON")
                .arg(number_arg("width", "Grid width").value_parser(value_parser!(i32)))
                .arg(number_arg("height", "Grid height").value_parser(value_parser!(i32)))
                .arg(number_arg("rooms", "Number of rooms to place").value_parser(value_parser!(usize)))
                .arg(
                    Arg::new("floor")
                        .long("floor")
                        .value_parser(value_parser!(u32))
                        .default_value("1")
                        .help("Floor level"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .value_parser(value_parser!(u64))
                        .help("Seed for a reproducible floor"),
                )
                .arg(content_arg())
                .arg(config_arg()),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("serve", args)) => run_server(args).await,
        Some(("generate", args)) => run_generate(args),
        _ => Ok(()),
    }
}

fn number_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).help(help)
}

fn content_arg() -> Arg {
    Arg::new("content")
        .long("content")
        .value_name("DIR")
        .value_parser(value_parser!(PathBuf))
        .help("Directory with content tables overriding the built-in ones")
}

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .value_name("FILE")
        .value_parser(value_parser!(PathBuf))
        .help("JSON game configuration file")
}

fn load_content(dir: Option<&PathBuf>) -> Result<ContentTables> {
    match dir {
        Some(dir) => ContentTables::load_from_dir(dir),
        None => ContentTables::builtin(),
    }
}

fn load_config(args: &ArgMatches) -> Result<GameConfig> {
    GameConfig::load_or_default(args.get_one::<PathBuf>("config").map(PathBuf::as_path))
}

async fn run_server(args: &ArgMatches) -> Result<()> {
    let config = load_config(args)?;
    let content = load_content(args.get_one::<PathBuf>("content"))?;
    let saves = args.get_one::<PathBuf>("saves").map(PathBuf::as_path).unwrap_or(Path::new("saves"));
    let port = args.get_one::<u16>("port").copied().unwrap_or(2323);

    let store = FileSaveStore::new(saves)
        .with_context(|| format!("Failed to open save directory {}", saves.display()))?;
    info!(saves = %saves.display(), "using file save store");

    let server = GameServer::new(TurnEngine::new(store, content, config));
    server.start(port).await
}

fn run_generate(args: &ArgMatches) -> Result<()> {
    let mut config = load_config(args)?;
    let content = load_content(args.get_one::<PathBuf>("content"))?;

    if let Some(&width) = args.get_one::<i32>("width") {
        config.dungeon.width = width;
    }
    if let Some(&height) = args.get_one::<i32>("height") {
        config.dungeon.height = height;
    }
    let floor = args.get_one::<u32>("floor").copied().unwrap_or(1);
    let rooms = args
        .get_one::<usize>("rooms")
        .copied()
        .unwrap_or_else(|| config.dungeon.rooms_for_floor(floor));

    let mut rng = match args.get_one::<u64>("seed") {
        Some(&seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    let generator = DungeonGenerator::new(config.dungeon.clone());
    let mut dungeon = generator.generate(config.dungeon.width, config.dungeon.height, rooms, floor, &mut rng)?;
    place_content(&mut dungeon, &content, &config.placement, &mut rng);

    println!("{}", dungeon.to_json()?);
    Ok(())
}
