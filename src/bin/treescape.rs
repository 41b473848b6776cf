//! Treescape CLI: category registry administration and taxon enrichment.
//!
//! Usage:
//!   treescape categories seed|list|add|rename|remove [--db path]
//!   treescape taxon add|pending [--db path]
//!   treescape schema [--db path]
//!   treescape enrich [--config file] [--limit n] [--db path]
//!   treescape show <name> [--db path]

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};
use treescape::config::default_db_path;
use treescape::{
    AttributeStore, BatchEnricher, CategoryRegistry, EnrichmentConfig, EnrichmentEngine, OpenStore, SqliteStore,
    Taxon, TaxonRank, TaxonStore, Taxonomy,
};

#[derive(Parser)]
#[command(name = "treescape", version, about = "Attribute enrichment for agroforestry taxa")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Path to SQLite database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the category registry
    Categories {
        #[command(subcommand)]
        action: CategoriesAction,
    },
    /// Manage taxa
    Taxon {
        #[command(subcommand)]
        action: TaxonAction,
    },
    /// Print the schema generated from the live registry
    Schema,
    /// Enrich every taxon that has no attributes yet
    Enrich {
        /// YAML enrichment configuration
        #[arg(long)]
        config: Option<PathBuf>,
        /// Enrich at most this many taxa
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print the stored attributes of a taxon
    Show {
        /// Taxon name
        name: String,
    },
}

#[derive(Subcommand)]
enum CategoriesAction {
    /// Install the default taxonomy values
    Seed,
    /// List values, optionally of one taxonomy
    List {
        /// e.g. growth_habit or growth_habits
        taxonomy: Option<String>,
    },
    /// Add a value to a taxonomy
    Add {
        taxonomy: String,
        name: String,
        #[arg(default_value = "")]
        description: String,
    },
    /// Change the display name of a value
    Rename {
        taxonomy: String,
        slug: String,
        name: String,
    },
    /// Remove a value no taxon references
    Remove { taxonomy: String, slug: String },
}

#[derive(Subcommand)]
enum TaxonAction {
    /// Register a taxon
    Add {
        name: String,
        /// family, genus or species
        #[arg(long, default_value = "species")]
        rank: String,
        /// File with descriptive text the answer should be based on
        #[arg(long)]
        reference_file: Option<PathBuf>,
    },
    /// List taxa without attributes
    Pending,
}

fn open_store(db: Option<PathBuf>) -> Result<Arc<SqliteStore>, String> {
    let db_path = db.unwrap_or_else(default_db_path);
    let store = SqliteStore::open(&db_path).map_err(|e| format!("Failed to open database: {}", e))?;
    Ok(Arc::new(store))
}

fn parse_taxonomy(raw: &str) -> Result<Taxonomy, i32> {
    raw.parse().map_err(|e| {
        eprintln!("Error: {}", e);
        1
    })
}

fn cmd_categories_seed(store: &SqliteStore) -> i32 {
    match store.seed_default_categories() {
        Ok(inserted) => {
            println!("Seeded {} category value(s)", inserted);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_categories_list(store: &SqliteStore, taxonomy: Option<&str>) -> i32 {
    let taxonomies = match taxonomy {
        Some(raw) => match parse_taxonomy(raw) {
            Ok(t) => vec![t],
            Err(code) => return code,
        },
        None => Taxonomy::ALL.to_vec(),
    };

    for taxonomy in taxonomies {
        let values = match store.list(taxonomy) {
            Ok(values) => values,
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        };
        println!("{} ({} values)", taxonomy.label(), values.len());
        for value in values {
            println!("  {:<48}  {}", value.slug, value.name);
        }
    }
    0
}

fn cmd_categories_add(store: &SqliteStore, taxonomy: &str, name: &str, description: &str) -> i32 {
    let taxonomy = match parse_taxonomy(taxonomy) {
        Ok(t) => t,
        Err(code) => return code,
    };
    match store.add_value(taxonomy, name, description) {
        Ok(value) => {
            println!("Added {} '{}' ({})", taxonomy, value.name, value.slug);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_categories_rename(store: &SqliteStore, taxonomy: &str, slug: &str, name: &str) -> i32 {
    let taxonomy = match parse_taxonomy(taxonomy) {
        Ok(t) => t,
        Err(code) => return code,
    };
    match store.rename_value(taxonomy, slug, name) {
        Ok(()) => {
            println!("Renamed {}/{} to '{}'", taxonomy, slug, name);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_categories_remove(store: &SqliteStore, taxonomy: &str, slug: &str) -> i32 {
    let taxonomy = match parse_taxonomy(taxonomy) {
        Ok(t) => t,
        Err(code) => return code,
    };
    match store.remove_value(taxonomy, slug) {
        Ok(()) => {
            println!("Removed {}/{}", taxonomy, slug);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_taxon_add(store: &SqliteStore, name: &str, rank: &str, reference_file: Option<&Path>) -> i32 {
    let rank: TaxonRank = match rank.parse() {
        Ok(rank) => rank,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let mut taxon = Taxon::new(name, rank);
    if let Some(path) = reference_file {
        match std::fs::read_to_string(path) {
            Ok(text) => taxon = taxon.with_reference_text(text),
            Err(e) => {
                eprintln!("Error: cannot read '{}': {}", path.display(), e);
                return 1;
            }
        }
    }
    match store.add_taxon(&taxon) {
        Ok(()) => {
            println!("Added {} '{}' ({})", taxon.rank, taxon.name, taxon.id);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_taxon_pending(store: &SqliteStore) -> i32 {
    match store.list_unenriched() {
        Ok(taxa) if taxa.is_empty() => {
            println!("Every taxon has attributes.");
            0
        }
        Ok(taxa) => {
            println!("{:<36}  {:<8}  NAME", "ID", "RANK");
            println!("{}", "-".repeat(72));
            for taxon in taxa {
                println!("{:<36}  {:<8}  {}", taxon.id, taxon.rank, taxon.name);
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_schema(store: Arc<SqliteStore>) -> i32 {
    let catalog = match store.catalog() {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let schema = store
        .snapshot()
        .map_err(|e| e.to_string())
        .and_then(|registry| treescape::enrichment::generate_schema(&catalog, &registry).map_err(|e| e.to_string()));
    match schema {
        Ok(schema) => {
            println!("{}", schema.pretty());
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_enrich(store: Arc<SqliteStore>, config: Option<&Path>, limit: Option<usize>) -> i32 {
    let config = match config {
        Some(path) => EnrichmentConfig::load(path),
        None => Ok(EnrichmentConfig::default()),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let engine = match EnrichmentEngine::from_config(&config, store.clone(), store.clone()) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let mut taxa = match store.list_unenriched() {
        Ok(taxa) => taxa,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if let Some(limit) = limit {
        taxa.truncate(limit);
    }
    if taxa.is_empty() {
        println!("Nothing to enrich.");
        return 0;
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: cannot start runtime: {}", e);
            return 1;
        }
    };
    let batch = BatchEnricher::new(engine).with_concurrency(config.concurrency);
    let summary = runtime.block_on(batch.run(taxa));

    println!(
        "Enriched {} taxa, {} without usable data, {} failed",
        summary.enriched,
        summary.no_data,
        summary.failed_count()
    );
    for name in &summary.failed {
        println!("  failed: {}", name);
    }
    0
}

fn cmd_show(store: &SqliteStore, name: &str) -> i32 {
    let taxon = match store.find_taxon_by_name(name) {
        Ok(Some(taxon)) => taxon,
        Ok(None) => {
            eprintln!("Error: taxon '{}' not found", name);
            return 1;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    match store.load_aggregate(&taxon.id) {
        Ok(Some(aggregate)) => match serde_json::to_string_pretty(&aggregate) {
            Ok(json) => {
                println!("{}", json);
                0
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
        Ok(None) => {
            println!("'{}' has no stored attributes.", name);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let store = match open_store(cli.db) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Categories { action } => match action {
            CategoriesAction::Seed => cmd_categories_seed(&store),
            CategoriesAction::List { taxonomy } => cmd_categories_list(&store, taxonomy.as_deref()),
            CategoriesAction::Add {
                taxonomy,
                name,
                description,
            } => cmd_categories_add(&store, &taxonomy, &name, &description),
            CategoriesAction::Rename { taxonomy, slug, name } => {
                cmd_categories_rename(&store, &taxonomy, &slug, &name)
            }
            CategoriesAction::Remove { taxonomy, slug } => cmd_categories_remove(&store, &taxonomy, &slug),
        },
        Commands::Taxon { action } => match action {
            TaxonAction::Add {
                name,
                rank,
                reference_file,
            } => cmd_taxon_add(&store, &name, &rank, reference_file.as_deref()),
            TaxonAction::Pending => cmd_taxon_pending(&store),
        },
        Commands::Schema => cmd_schema(store),
        Commands::Enrich { config, limit } => cmd_enrich(store, config.as_deref(), limit),
        Commands::Show { name } => cmd_show(&store, &name),
    };
    std::process::exit(code);
}
