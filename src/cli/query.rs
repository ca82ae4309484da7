use std::fs;

use super::ConsoleContext;
use crate::console::QueryEditor;

pub struct QueryArgs {
    pub data_dir: Option<String>,
    pub workspace: Option<String>,
    pub sql: Option<String>,
    pub file: Option<String>,
    pub snapshot_id: Option<String>,
    pub as_of: Option<String>,
    pub limit: Option<u32>,
    pub json: bool,
}

pub async fn run_query(args: QueryArgs) -> anyhow::Result<()> {
    let ctx = ConsoleContext::open(args.data_dir)?;
    let client_id = ctx.active_workspace(args.workspace.as_deref()).await?;

    let mut editor = QueryEditor::new(ctx.api.clone(), ctx.cache.clone(), &client_id);
    match (args.sql, args.file) {
        (Some(_), Some(_)) => anyhow::bail!("Pass either a SQL statement or --file, not both"),
        (Some(sql), None) => editor.set_sql(sql),
        (None, Some(path)) => editor.set_sql(fs::read_to_string(&path)?),
        (None, None) => {}
    }
    if let Some(snapshot_id) = args.snapshot_id {
        editor.set_snapshot_id(snapshot_id);
    }
    if let Some(as_of) = args.as_of {
        editor.set_as_of_timestamp(as_of);
    }
    editor.set_limit(args.limit);

    if !editor.run().await {
        anyhow::bail!("{}", editor.error().unwrap_or("Query failed to execute"));
    }

    if args.json {
        if let Some(result) = editor.result() {
            println!("{}", serde_json::to_string_pretty(result)?);
        }
        return Ok(());
    }

    if let Some(table) = editor.table() {
        println!();
        print!("{table}");
        if table.message().is_some() {
            println!();
        }
        println!();
    }
    if let Some(stats) = editor.stats_line() {
        println!("{stats}");
        println!();
    }
    Ok(())
}
