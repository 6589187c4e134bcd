use crate::db;
use crate::error::Result;
use crate::fmt::format_bytes;
use crate::guard::RouteTable;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = settings.db_path();

    println!(
        "Organization: {}",
        if settings.organization_name.is_empty() { "(not set)" } else { settings.organization_name.as_str() }
    );
    println!("Data dir:     {}", settings.data_dir);
    println!("Database:     {}", db_path.display());
    println!(
        "Time zone:    {}",
        settings.utc_offset.as_deref().unwrap_or("local")
    );
    println!("Page size:    {}", settings.page_size);

    let routes = RouteTable::standard();
    println!();
    println!("Routes:");
    for path in routes.paths() {
        let roles: Vec<&str> = routes
            .required_roles(path)
            .unwrap_or_default()
            .iter()
            .map(|r| r.as_str())
            .collect();
        println!("  {path:<24}{}", roles.join(", "));
    }

    if db_path.exists() {
        let size = std::fs::metadata(&db_path)?.len();
        println!("DB size:      {}", format_bytes(size));

        let conn = db::open(&db_path)?;
        let mut stmt = conn.prepare(
            "SELECT collection, count(*) FROM documents GROUP BY collection ORDER BY collection",
        )?;
        let counts: Vec<(String, i64)> = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<std::result::Result<_, _>>()?;
        let accounts: i64 = conn.query_row("SELECT count(*) FROM credentials", [], |r| r.get(0))?;

        println!();
        println!("Accounts:     {accounts}");
        for (collection, count) in counts {
            println!("{:<14}{count}", format!("{collection}:"));
        }
    } else {
        println!();
        println!("Database not found. Run `fleetdesk init` to set up.");
    }

    Ok(())
}
