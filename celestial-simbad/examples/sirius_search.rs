use celestial_simbad::query::{Filter, Ordering};
use celestial_simbad::{Simbad, SimbadConfig, SimbadSqlSource, StarDataSource};

fn main() -> anyhow::Result<()> {
    let pattern = std::env::args().nth(1).unwrap_or_else(|| "Sirius".to_string());

    let source = SimbadSqlSource::new(Simbad::new(SimbadConfig::from_env())?);
    let request = source
        .list_stars_request()
        .filter("ident", Filter::like("id", &format!("NAME %{}%", pattern)))
        .order(Ordering::asc("allfluxes", "V"))
        .limit(10);

    println!("{}", request.build());
    let stars = request.fetch();
    println!("{} stars matching '{}':\n", stars.len(), pattern);

    for star in &stars {
        println!("  {:>12}  {:<24} {}", star.oid, star.name, star.otype);
    }

    if let Some(first) = stars.first() {
        match source.star_details(first.oid) {
            Some(d) => println!(
                "\n{}: RA {:.6}°  Dec {:+.6}°  V {:.2}  {} ({})",
                d.name, d.ra, d.dec, d.magnitude, d.otype, d.short_type
            ),
            None => println!("\nNo details for {}", first.name),
        }
    }

    Ok(())
}
