use crate::db::get_connection;
use crate::settings::load_settings;

pub fn run() -> anyhow::Result<()> {
    let settings = load_settings();
    let db_path = settings.db_path();

    println!("Data dir:   {}", settings.data_dir);
    println!("Database:   {}", db_path.display());
    println!("Owner:      {}", settings.default_owner);
    println!("Currency:   {}", settings.currency_symbol);
    println!("Rules:      {} custom, {} total", settings.rules.len(), settings.categorizer()?.rule_count());

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `ledgerwise init` to set up.");
        return Ok(());
    }

    let conn = get_connection(&db_path)?;
    let transactions: i64 = conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0))?;
    let imports: i64 = conn.query_row("SELECT count(*) FROM imports", [], |r| r.get(0))?;
    println!();
    println!("Transactions:  {transactions}");
    println!("Imports:       {imports}");

    let mut stmt = conn.prepare("SELECT owner, count(*) FROM transactions GROUP BY owner ORDER BY owner")?;
    let owners = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?;
    for row in owners {
        let (owner, count) = row?;
        println!("  {owner:<12} {count}");
    }
    Ok(())
}
