use crate::output::print_json;
use shipgate_core::reply::{MemoryChannel, SharedChannel};
use shipgate_server::AppState;
use std::path::Path;

/// Dispatch one message and print the replies it produced.
///
/// The process exits once the dispatch returns, so an approval created here
/// is never answered; use `serve` for the approval flow.
pub fn run(config_path: Option<&Path>, user: &str, text: &str, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let rt = super::runtime()?;

    rt.block_on(async {
        let state = AppState::from_config(&config)?;
        let channel = MemoryChannel::new();
        let shared: SharedChannel = channel.clone();
        let dispatch = state.orchestrator.handle_message(text, user, shared).await;

        if json {
            print_json(&serde_json::json!({
                "dispatch": dispatch,
                "replies": channel.replies(),
            }))?;
        } else {
            for text in channel.texts() {
                println!("{text}");
                println!();
            }
        }
        Ok(())
    })
}
