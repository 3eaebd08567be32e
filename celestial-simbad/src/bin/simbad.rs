use anyhow::Context;
use celestial_simbad::query::{
    Direction, Filter, Ordering, QueryScript, StarQuery, BASIC, IDENT, OTYPEDEF,
};
use celestial_simbad::table::Table;
use celestial_simbad::{
    BookmarkStore, Bookmarks, Simbad, SimbadConfig, SimbadSqlSource, StarDataSource, StarDetails,
    StarOverview,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Parser)]
#[command(name = "simbad")]
#[command(about = "Query the SIMBAD astronomical database")]
struct Cli {
    /// SIMBAD mirror base URL
    #[arg(long, env = "SIMBAD_MIRROR")]
    mirror: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "SIMBAD_TIMEOUT_SECS")]
    timeout: Option<u64>,

    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List stars by common name
    Search {
        /// Pattern matched against common names (substring)
        #[arg(long)]
        name: Option<String>,
        /// Substring of the object type description
        #[arg(long = "type")]
        otype: Option<String>,
        /// Maximum number of results
        #[arg(long)]
        limit: Option<u32>,
        /// Sort column as table.field, e.g. allfluxes.V
        #[arg(long)]
        order: Option<String>,
        /// Sort descending
        #[arg(long, requires = "order")]
        desc: bool,
    },
    /// Show details of one object
    Details {
        /// SIMBAD object identifier
        oid: i64,
    },
    /// Run a sim-script query
    Script {
        #[arg(long, default_value = "10")]
        limit: u32,
        /// Output fields, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        fields: Vec<String>,
        /// Query criteria, e.g. "Vmag < 2"
        #[arg(long)]
        criteria: String,
    },
    /// Run raw ADQL against the TAP endpoint
    Adql {
        query: String,
    },
    /// Print the ADQL a search would send, without sending it
    Compile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "type")]
        otype: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        order: Option<String>,
        #[arg(long, requires = "order")]
        desc: bool,
    },
    /// Manage bookmarked stars
    Bookmarks {
        /// Bookmark file
        #[arg(long, env = "SIMBAD_BOOKMARKS", default_value = "bookmarks.json")]
        file: PathBuf,
        #[command(subcommand)]
        action: BookmarkAction,
    },
}

#[derive(Subcommand)]
enum BookmarkAction {
    List,
    Add { oid: i64 },
    Remove { oid: i64 },
    Clear,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = cli.format;

    match cli.command {
        Commands::Compile {
            name,
            otype,
            limit,
            order,
            desc,
        } => {
            let query = search_query(name, otype, limit, order, desc)?;
            println!("{}", query.build());
        }
        Commands::Search {
            name,
            otype,
            limit,
            order,
            desc,
        } => {
            let query = search_query(name, otype, limit, order, desc)?;
            let source = open_source(cli.mirror, cli.timeout)?;
            let stars = source.list_stars(&query);
            print_overviews(&stars, format)?;
        }
        Commands::Details { oid } => {
            let source = open_source(cli.mirror, cli.timeout)?;
            match source.star_details(oid) {
                Some(details) => print_details(&details, format)?,
                None => anyhow::bail!("No details available for oid {}", oid),
            }
        }
        Commands::Script {
            limit,
            fields,
            criteria,
        } => {
            let source = open_source(cli.mirror, cli.timeout)?;
            let script = QueryScript::new(limit, fields, criteria);
            let output = source
                .run_script(&script)
                .context("Script query failed")?;
            for section in output.metadata.section_names() {
                eprintln!("::{}::", section);
                eprint!("{}", output.metadata.get(section).unwrap_or_default());
            }
            print_table(&output.table, format)?;
        }
        Commands::Adql { query } => {
            let source = open_source(cli.mirror, cli.timeout)?;
            let table = source.run_adql(&query).context("ADQL query failed")?;
            print_table(&table, format)?;
        }
        Commands::Bookmarks { file, action } => {
            let mut store = BookmarkStore::open(&file);
            match action {
                BookmarkAction::List => print_overviews(store.list(), format)?,
                BookmarkAction::Add { oid } => {
                    let source = open_source(cli.mirror, cli.timeout)?;
                    let query = StarQuery::new()
                        .filter(BASIC, Filter::eq("oid", oid.to_string()))
                        .filter(IDENT, Filter::like("id", "NAME%"))
                        .limit(1);
                    let star = source
                        .list_stars(&query)
                        .into_iter()
                        .next()
                        .with_context(|| format!("No named object with oid {}", oid))?;
                    println!("Bookmarked {} ({})", star.name, star.oid);
                    store.add(star)?;
                }
                BookmarkAction::Remove { oid } => {
                    if !store.remove(oid)? {
                        eprintln!("oid {} was not bookmarked", oid);
                    }
                }
                BookmarkAction::Clear => store.clear()?,
            }
        }
    }

    Ok(())
}

fn open_source(mirror: Option<String>, timeout: Option<u64>) -> anyhow::Result<SimbadSqlSource> {
    let mut config = SimbadConfig::from_env();
    if let Some(mirror) = mirror {
        config = config.with_mirror(mirror);
    }
    if let Some(secs) = timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    let simbad = Simbad::new(config).context("Failed to create SIMBAD client")?;
    Ok(SimbadSqlSource::new(simbad))
}

fn search_query(
    name: Option<String>,
    otype: Option<String>,
    limit: Option<u32>,
    order: Option<String>,
    desc: bool,
) -> anyhow::Result<StarQuery> {
    let mut query = StarQuery::new();
    if let Some(name) = name {
        query = query.filter(IDENT, Filter::like("id", &format!("NAME %{}%", name)));
    }
    if let Some(otype) = otype {
        query = query.filter(OTYPEDEF, Filter::contains("description", &otype));
    }
    if let Some(order) = order {
        query = query.order(parse_ordering(&order, desc)?);
    }
    if let Some(limit) = limit {
        query = query.limit(limit);
    }
    Ok(query)
}

fn parse_ordering(s: &str, desc: bool) -> anyhow::Result<Ordering> {
    let (table, field) = s
        .split_once('.')
        .filter(|(t, f)| !t.is_empty() && !f.is_empty())
        .ok_or_else(|| anyhow::anyhow!("Cannot parse ordering '{}', expected table.field", s))?;
    let direction = if desc { Direction::Desc } else { Direction::Asc };
    Ok(Ordering::new(table, field, direction))
}

fn print_overviews(stars: &[StarOverview], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => {
            for (i, star) in stars.iter().enumerate() {
                println!("{:4}: {:>12}  {:<30} {}", i + 1, star.oid, star.name, star.otype);
            }
            if stars.is_empty() {
                println!("No stars found.");
            } else {
                println!("\nTotal results: {}", stars.len());
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(stars)?),
        OutputFormat::Csv => {
            println!("oid,name,otype");
            for star in stars {
                println!("{},{},{}", star.oid, csv_field(&star.name), csv_field(&star.otype));
            }
        }
    }
    Ok(())
}

fn print_details(details: &StarDetails, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => {
            println!("{} (oid {})", details.name, details.oid);
            println!("  RA   {:.6}°", details.ra);
            println!("  Dec  {:+.6}°", details.dec);
            println!("  V    {:.2}", details.magnitude);
            println!("  Type {} ({})", details.otype, details.short_type);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(details)?),
        OutputFormat::Csv => {
            println!("oid,name,ra,dec,magnitude,short_type,otype");
            println!(
                "{},{},{},{},{},{},{}",
                details.oid,
                csv_field(&details.name),
                details.ra,
                details.dec,
                details.magnitude,
                csv_field(&details.short_type),
                csv_field(&details.otype)
            );
        }
    }
    Ok(())
}

fn print_table(table: &Table, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => {
            println!("{}", table);
            eprintln!("{} rows", table.row_count());
        }
        OutputFormat::Json => {
            let rows: Vec<serde_json::Map<String, serde_json::Value>> = table
                .rows()
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|(column, cell)| (column.to_string(), cell.into()))
                        .collect()
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Csv => {
            let header: Vec<String> = table.columns().iter().map(|c| csv_field(c)).collect();
            println!("{}", header.join(","));
            for row in table.rows() {
                let cells: Vec<String> = row.cells().iter().map(|c| csv_field(c)).collect();
                println!("{}", cells.join(","));
            }
        }
    }
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
