use crate::output::{print_json, print_table};
use shipgate_core::audit::AuditLog;
use std::path::Path;

pub fn run(config_path: Option<&Path>, app: &str, limit: u32, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let audit = AuditLog::open(&config.audit.path)?;

    let rt = super::runtime()?;
    let entries = rt.block_on(audit.get_history(app, limit))?;

    if json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("No history for {app}.");
        return Ok(());
    }

    let rows = entries
        .into_iter()
        .map(|e| vec![e.timestamp, e.user, e.action, e.result])
        .collect();
    print_table(&["TIMESTAMP", "USER", "ACTION", "RESULT"], rows);
    Ok(())
}
