//! Parse command - show the target sequence of an instruction.

use clap::Args;
use console::style;

use clickcap_core::parse_instruction;

/// Arguments for the parse command.
#[derive(Args)]
pub struct ParseArgs {
    /// Instruction text, e.g. "请依次点击【圈,谁,船】"
    #[arg(required = true)]
    instruction: String,

    /// Print the targets as a JSON array
    #[arg(long)]
    json: bool,
}

pub async fn run(args: ParseArgs) -> anyhow::Result<()> {
    let targets = parse_instruction(&args.instruction);

    if args.json {
        let targets: Vec<String> = targets.iter().map(char::to_string).collect();
        println!("{}", serde_json::to_string(&targets)?);
        return Ok(());
    }

    if targets.is_empty() {
        anyhow::bail!("No target characters found in: {}", args.instruction);
    }

    println!(
        "{} {} targets: {}",
        style("✓").green(),
        targets.len(),
        targets
            .iter()
            .map(char::to_string)
            .collect::<Vec<_>>()
            .join(" → ")
    );

    Ok(())
}
