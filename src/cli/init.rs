use anyhow::Context;

use crate::settings::{load_settings, save_settings, shellexpand_path};

pub fn run(data_dir: Option<String>, owner: Option<String>, currency: Option<String>) -> anyhow::Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    if let Some(owner) = owner.filter(|o| !o.trim().is_empty()) {
        settings.default_owner = owner.trim().to_string();
    }
    if let Some(symbol) = currency.filter(|c| !c.trim().is_empty()) {
        settings.currency_symbol = symbol.trim().to_string();
    }

    let conn = super::open_db(&settings)?;
    drop(conn);
    save_settings(&settings).context("cannot write settings")?;

    println!("Initialized ledgerwise data at {}", settings.data_dir);
    println!("Database:      {}", settings.db_path().display());
    println!("Default owner: {}", settings.default_owner);
    Ok(())
}
