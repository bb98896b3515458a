use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing_subscriber::EnvFilter;

use tanki_map_converter::{
    export_map_to_file, import_map_with_index, load_config, Config, MapDocument, MemoryScene,
    PropLibraryIndex,
};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let matches = Command::new("tanki-map-converter")
        .about("Convert legacy Tanki Online XML maps to and from an abstract scene")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .takes_value(true)
                .global(true)
                .help("Path to a TOML configuration file"),
        )
        .subcommand(
            Command::new("libraries")
                .about("Scan a prop libraries directory and list its entries")
                .arg(Arg::new("dir").required(true)),
        )
        .subcommand(
            Command::new("inspect")
                .about("Parse a map file and print what it contains")
                .arg(Arg::new("map").required(true)),
        )
        .subcommand(
            Command::new("validate")
                .about("Import a map into an in-memory scene and report every problem")
                .arg(Arg::new("map").required(true))
                .arg(
                    Arg::new("libraries")
                        .long("libraries")
                        .short('l')
                        .takes_value(true)
                        .help("Prop libraries directory (overrides the config file)"),
                ),
        )
        .subcommand(
            Command::new("roundtrip")
                .about("Import a map and export it back out through the in-memory scene")
                .arg(Arg::new("input").required(true))
                .arg(Arg::new("output").required(true))
                .arg(
                    Arg::new("libraries")
                        .long("libraries")
                        .short('l')
                        .takes_value(true)
                        .help("Prop libraries directory (overrides the config file)"),
                )
                .arg(
                    Arg::new("no-convert")
                        .long("no-convert")
                        .action(ArgAction::SetTrue)
                        .help("Skip the coordinate conversion in both directions"),
                ),
        )
        .get_matches();

    let config = matches
        .get_one::<String>("config")
        .map(|path| load_config(Path::new(path)))
        .unwrap_or_default();

    let result = match matches.subcommand() {
        Some(("libraries", sub)) => cmd_libraries(sub, &config),
        Some(("inspect", sub)) => cmd_inspect(sub),
        Some(("validate", sub)) => cmd_validate(sub, &config),
        Some(("roundtrip", sub)) => cmd_roundtrip(sub, &config),
        _ => unreachable!("subcommand is required"),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::error!("{error:#}");
            ExitCode::FAILURE
        }
    }
}

fn libraries_dir(sub: &ArgMatches, config: &Config) -> anyhow::Result<PathBuf> {
    if let Some(dir) = sub.get_one::<String>("libraries") {
        return Ok(PathBuf::from(dir));
    }
    if config.prop_libraries_dir.as_os_str().is_empty() {
        bail!("no prop libraries directory given (use --libraries or a config file)");
    }
    Ok(config.prop_libraries_dir.clone())
}

fn cmd_libraries(sub: &ArgMatches, config: &Config) -> anyhow::Result<()> {
    let dir = PathBuf::from(sub.get_one::<String>("dir").unwrap());
    let (index, warnings) = PropLibraryIndex::build(&dir, config.duplicate_policy)?;

    let mut names: Vec<String> = index.iter().map(|entry| entry.id.to_string()).collect();
    names.sort();
    for name in &names {
        println!("{name}");
    }
    println!("{} props indexed from {}", index.len(), dir.display());
    for warning in &warnings {
        println!("warning: {warning}");
    }
    Ok(())
}

fn cmd_inspect(sub: &ArgMatches) -> anyhow::Result<()> {
    let path = PathBuf::from(sub.get_one::<String>("map").unwrap());
    let bytes = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
    let (document, warnings) = MapDocument::parse(&bytes)?;

    let mut per_library: BTreeMap<&str, usize> = BTreeMap::new();
    for prop in &document.placed_props {
        *per_library.entry(prop.id.library.as_str()).or_default() += 1;
    }

    println!("{}: {} props", path.display(), document.placed_props.len());
    for (library, count) in per_library {
        println!("  {library}: {count}");
    }
    for warning in &warnings {
        println!("warning: {warning}");
    }
    Ok(())
}

fn cmd_validate(sub: &ArgMatches, config: &Config) -> anyhow::Result<()> {
    let map_path = PathBuf::from(sub.get_one::<String>("map").unwrap());
    let mut options = config.import_options();
    options.prop_libraries_dir = libraries_dir(sub, config)?;

    let (index, index_warnings) =
        PropLibraryIndex::build(&options.prop_libraries_dir, options.duplicate_policy)?;

    let mut scene = MemoryScene::new();
    let report = import_map_with_index(&map_path, &index, &options, &mut scene)?;

    println!("{}", report.summary());
    for warning in index_warnings.iter().chain(&report.warnings) {
        println!("warning: {warning}");
    }
    Ok(())
}

fn cmd_roundtrip(sub: &ArgMatches, config: &Config) -> anyhow::Result<()> {
    let input = PathBuf::from(sub.get_one::<String>("input").unwrap());
    let output = PathBuf::from(sub.get_one::<String>("output").unwrap());
    let no_convert = sub.get_one::<bool>("no-convert").copied().unwrap_or(false);

    let mut import_options = config.import_options();
    import_options.prop_libraries_dir = libraries_dir(sub, config)?;
    let mut export_options = config.export_options();
    if no_convert {
        import_options.apply_coordinate_conversion = false;
        export_options.apply_coordinate_conversion = false;
    }

    let (index, index_warnings) =
        PropLibraryIndex::build(&import_options.prop_libraries_dir, config.duplicate_policy)?;

    let mut scene = MemoryScene::new();
    let import_report = import_map_with_index(&input, &index, &import_options, &mut scene)?;
    println!("import: {}", import_report.summary());
    for warning in index_warnings.iter().chain(&import_report.warnings) {
        println!("warning: {warning}");
    }

    let export_report = export_map_to_file(&scene, &export_options, &output)?;
    println!("export: {}", export_report.summary());
    Ok(())
}
