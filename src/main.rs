use std::sync::Arc;

use anyhow::Result;

use deskpilot::ai::chat::ChatClient;
use deskpilot::orchestrator::Orchestrator;
use deskpilot::response::{self, Block};
use deskpilot::AppConfig;

/// Smoke surface for the pipeline: one question in, parsed sections out.
#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let question = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    anyhow::ensure!(!question.is_empty(), "usage: deskpilot <question>");

    let config = AppConfig::load_default();
    let transport = Arc::new(ChatClient::new(&config));
    let orchestrator = Orchestrator::new(config, transport);

    orchestrator.dispatch(&question, &[], None, None).await;

    let view = orchestrator.view();
    let sections = response::parse_sections(&view.answer);
    if sections.is_empty() {
        println!("{}", view.answer);
    } else {
        for block in response::render(&sections) {
            print_block(&block);
        }
    }

    Ok(())
}

fn print_block(block: &Block) {
    match block {
        Block::Bullets { title, points } => {
            println!("{}:", title);
            for point in points {
                println!("  - {}", point);
            }
        }
        Block::Placeholder { title, text } => println!("{}: {}", title, text),
        Block::Code { title, body } => println!("{}:\n{}", title, body),
        Block::Complexity { time, space } => {
            println!("Complexity:\n  - {}\n  - {}", time, space)
        }
        Block::ComplexityFallback { body } => println!("Complexity: {}", body),
        Block::Preformatted { title, body } => println!("{}:\n{}", title, body),
        Block::Emphasis { title, body } => println!("{}: {}", title, body),
    }
    println!();
}
