//! `qrstash` - CLI for the saved-QR library
//!
//! This binary saves, lists and decodes QR code images and manages the
//! category tabs they are filed under.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use clap::Parser;

use qrstash::category::{resolve_selection, ALL};
use qrstash::cli::{
    AddCommand, Cli, Command, ConfigCommand, ListCommand, ShowCommand, TabsCommand,
};
use qrstash::images::normalize_to_jpeg;
use qrstash::preview::NO_IMAGE;
use qrstash::storage::SqliteStore;
use qrstash::{init_logging, Category, Config, Library, PreviewSlot, SavedQrRecord};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> CliResult {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Tabs(tabs_cmd) => handle_tabs(&Library::open(&config)?, tabs_cmd),
        Command::Add(add_cmd) => handle_add(&config, &add_cmd),
        Command::List(list_cmd) => handle_list(&Library::open(&config)?, &list_cmd),
        Command::Show(show_cmd) => handle_show(&Library::open(&config)?, &show_cmd).await,
        Command::Status(status_cmd) => handle_status(&config, status_cmd.json),
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

fn handle_tabs(library: &Library<SqliteStore>, cmd: TabsCommand) -> CliResult {
    let registry = library.categories();
    match cmd {
        TabsCommand::List { json } => {
            let tabs = registry.load()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tabs)?);
            } else {
                for tab in &tabs {
                    println!("{tab}");
                }
            }
        }
        TabsCommand::Add { label } => {
            let Some(category) = Category::parse(&label) else {
                return Err("category label must not be empty".into());
            };
            if registry.add(&label)? {
                println!("Added tab {category}");
            } else {
                println!("Tab {category} already exists");
            }
        }
        TabsCommand::Remove { label } => {
            let label = label.trim();
            if registry.remove(label)? {
                println!("Removed tab {label}; its QR codes remain under All");
            } else if label == ALL {
                println!("The All tab cannot be removed");
            } else {
                println!("No tab named {label}");
            }
        }
    }
    Ok(())
}

fn handle_add(config: &Config, cmd: &AddCommand) -> CliResult {
    let library = Library::open(config)?;

    let category = library
        .categories()
        .find(&cmd.category)?
        .ok_or_else(|| format!("unknown category {:?}; see `qrstash tabs list`", cmd.category))?;

    let bytes = std::fs::read(&cmd.image)?;
    let bytes = if cmd.raw {
        bytes
    } else {
        normalize_to_jpeg(&bytes, config.storage.jpeg_quality)?
    };

    let record = library.save_qr(&bytes, category.as_str(), &cmd.title)?;
    println!(
        "Saved {} as {} under {}",
        cmd.image.display(),
        record.file_name,
        record.category
    );
    Ok(())
}

/// Records under the tab `selected`, falling back to `All` when it is
/// not a current tab.
fn browse_selected(
    library: &Library<SqliteStore>,
    selected: &str,
) -> Result<(Category, Vec<SavedQrRecord>), Box<dyn std::error::Error>> {
    let tabs = library.categories().load()?;
    let category = resolve_selection(&tabs, selected.trim());
    let records = library.browse(category.as_str())?;
    Ok((category, records))
}

fn handle_list(library: &Library<SqliteStore>, cmd: &ListCommand) -> CliResult {
    let (category, records) = browse_selected(library, &cmd.category)?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No saved QR-codes in {category}");
        return Ok(());
    }

    for (i, record) in records.iter().enumerate() {
        let image = if library.images().contains(&record.file_name) {
            record.file_name.as_str()
        } else {
            NO_IMAGE
        };
        println!(
            "{:>3}. {:<20}  {:<12}  {}",
            i + 1,
            record.display_title(),
            record.category,
            image
        );
    }
    Ok(())
}

async fn handle_show(library: &Library<SqliteStore>, cmd: &ShowCommand) -> CliResult {
    let (category, records) = browse_selected(library, &cmd.category)?;

    let record = cmd
        .index
        .checked_sub(1)
        .and_then(|i| records.get(i))
        .ok_or_else(|| {
            format!(
                "no QR code #{} in {category} ({} saved)",
                cmd.index,
                records.len()
            )
        })?;

    let slot = PreviewSlot::new();
    library.open_preview(&slot, record).await;
    let Some(preview) = slot.current() else {
        return Err("preview was dismissed before decoding finished".into());
    };

    if cmd.json {
        let out = serde_json::json!({
            "title": preview.title,
            "fileName": preview.file_name,
            "category": record.category,
            "imagePresent": library.images().contains(&record.file_name),
            "payload": preview.payload,
            "linkEnabled": preview.is_link_enabled(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("{}", preview.title);
    println!("{}", "-".repeat(preview.title.chars().count()));
    match library.images().path_for(&record.file_name) {
        Some(path) if path.is_file() => println!("Image:  {}", path.display()),
        _ => println!("Image:  {NO_IMAGE}"),
    }
    println!("Text:   {}", preview.text());
    println!(
        "Link:   {}",
        if preview.is_link_enabled() {
            "enabled"
        } else {
            "disabled"
        }
    );
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> CliResult {
    let library = Library::open(config)?;
    let tabs = library.categories().load()?;
    let records = library.records().load_all()?;
    let missing = records
        .iter()
        .filter(|r| !library.images().contains(&r.file_name))
        .count();
    let per_tab: Vec<(String, usize)> = tabs
        .iter()
        .map(|tab| {
            let count = records.iter().filter(|r| r.in_category(tab.as_str())).count();
            (tab.to_string(), count)
        })
        .collect();

    if json {
        let status = serde_json::json!({
            "database_path": library.store().path(),
            "images_dir": library.images().dir(),
            "decoder": library.decoder().decoder_name(),
            "tabs": per_tab
                .iter()
                .map(|(tab, count)| serde_json::json!({ "label": tab, "count": count }))
                .collect::<Vec<_>>(),
            "records": records.len(),
            "missing_images": missing,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("qrstash status");
        println!("--------------");
        println!("Database:       {}", library.store().path().display());
        println!("Images:         {}", library.images().dir().display());
        println!("Decoder:        {}", library.decoder().decoder_name());
        println!("Saved QR-codes: {}", records.len());
        println!("Missing images: {missing}");
        println!();
        println!("[Tabs]");
        for (tab, count) in &per_tab {
            println!("  {tab:<12}  {count}");
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> CliResult {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Images directory:   {}", config.images_dir().display());
                println!("  Image extension:    {}", config.storage.image_extension);
                println!("  JPEG quality:       {}", config.storage.jpeg_quality);
                println!();
                println!("[Decode]");
                println!("  Max dimension:      {}", config.decode.max_dimension);
                println!();
                println!("[Categories]");
                println!("  Seed:               {}", config.categories.seed.join(", "));
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
