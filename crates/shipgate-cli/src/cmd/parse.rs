use crate::output::print_json;
use shipgate_core::command::parse;

pub fn run(text: &str, json: bool) -> anyhow::Result<()> {
    let command = parse(text);

    if json {
        print_json(&command)?;
        return match &command.error {
            Some(e) => anyhow::bail!("{e}"),
            None => Ok(()),
        };
    }

    if let Some(e) = &command.error {
        anyhow::bail!("{e}");
    }

    println!("action:      {}", command.action);
    if let Some(app) = &command.app {
        println!("app:         {app}");
    }
    if let Some(branch) = &command.branch {
        println!("branch:      {branch}");
    }
    if let Some(build) = &command.build_number {
        println!("build:       {build}");
    }
    if let Some(env) = command.environment {
        println!("environment: {}", env.canonical_name());
    }
    Ok(())
}
