use crate::error::Result;
use crate::settings::{load_settings, save_settings};

pub fn run(delimiter: Option<char>, currency: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    let changed = delimiter.is_some() || currency.is_some();

    if let Some(d) = delimiter {
        settings.default_delimiter = d;
    }
    if let Some(c) = currency {
        settings.default_currency = c;
    }
    if changed {
        save_settings(&settings)?;
    }

    println!("default delimiter: {}", settings.default_delimiter);
    println!("default currency: {}", settings.default_currency);
    Ok(())
}
