use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::schema::ALL_SCHEMAS;

pub fn run() -> Result<()> {
    for schema in ALL_SCHEMAS {
        let mut table = Table::new();
        table.set_header(vec!["Field", "Label", "Required", "Keywords"]);
        for field in schema.fields {
            table.add_row(vec![
                Cell::new(field.key),
                Cell::new(field.label),
                Cell::new(if field.required { "yes" } else { "" }),
                Cell::new(field.keywords.join(", ")),
            ]);
        }
        println!("{}\n{table}\n", schema.import_type.key());
    }
    Ok(())
}
