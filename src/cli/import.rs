use colored::Colorize;

use crate::error::Result;

use super::SourceArgs;

pub fn run(source: &SourceArgs, exclude: &[usize], output: Option<&str>) -> Result<()> {
    let (mut pipeline, file_name) = super::open_pipeline(source)?;

    // Preview -> Clean: nothing recomputed, the user just marks exclusions
    pipeline.advance()?;
    for index in exclude {
        pipeline.exclude_row(*index);
    }

    // Clean -> Map: seed the entity maps, then straight on to Confirm
    pipeline.advance()?;
    pipeline.advance()?;

    let ready = pipeline.rows_ready();
    let failed = pipeline.state().error_map.len();
    let result = pipeline.publish(&file_name)?;

    println!(
        "{}",
        format!("{ready} rows ready, {} records published", result.records.len()).green()
    );
    if failed > 0 {
        println!(
            "{}",
            format!("{failed} rows had errors and were skipped (run `tally preview` to inspect)")
                .red()
        );
    }
    for account in &result.new_accounts {
        println!("new account: {} (id {})", account.name, account.id);
    }

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(path, format!("{json}\n"))?;
        println!("Wrote {path}");
    }
    Ok(())
}
