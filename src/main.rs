//! Amorelia - 带情绪与记忆的对话 Agent
//!
//! 入口：初始化日志、加载配置与存档，然后在终端里逐行读取用户输入。
//! 空行存档；`/` 开头为命令；其余作为消息发送。

use std::io::Write;

use amorelia::{
    agent::Agent,
    config::load_config,
    core::{Command, TurnReply},
    llm::create_llm_from_config,
    mind::EmotionModel,
    observability,
};
use anyhow::Context;
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};

fn prompt(text: &str) -> anyhow::Result<()> {
    print!("{text}");
    std::io::stdout().flush()?;
    Ok(())
}

fn print_reply(name: &str, reply: &TurnReply) {
    if let Some(thoughts) = &reply.thoughts {
        println!("{name}'s thoughts:");
        for thought in thoughts {
            println!("- {thought}");
        }
    }
    println!("{name}: {}", reply.display_text());
}

async fn run_turn(agent: &mut Agent, text: &str) {
    match agent.send(text).await {
        Ok(reply) => print_reply(agent.name(), &reply),
        Err(e) => {
            tracing::error!("Turn failed: {}", e);
            println!(
                "{}: Oops! I seem to be having some trouble right now. Maybe try again in a few moments?",
                agent.name()
            );
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config = load_config(None).context("Failed to load config")?;
    let backends = create_llm_from_config(&config);
    let (mut agent, greeting) = Agent::start(config, backends)
        .await
        .context("Failed to start agent")?;

    if let Some(reply) = greeting {
        print_reply(agent.name(), &reply);
    }
    if let Some(scene) = agent.app_config().app.opening_scene.clone() {
        run_turn(&mut agent, &scene).await;
    }
    println!("Note: It's recommended not to enter any sensitive information.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let report = agent.state.tick(Utc::now());
        tracing::debug!("Idle tick: {:?}", report);
        println!("{}", agent.state.emotion.mood_status());
        if let Some(url) = agent.attached_image() {
            println!("Attached image: {url}");
        }

        prompt("User: ")?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let msg = line.trim();
        if msg.is_empty() {
            if let Err(e) = agent.save() {
                tracing::warn!("Save failed: {}", e);
            }
            continue;
        }

        if msg.starts_with('/') {
            match msg.parse::<Command>() {
                Ok(Command::Wipe) => {
                    if !agent.has_saved_state() {
                        println!("No saved data to erase.");
                        continue;
                    }
                    prompt(
                        "Are you sure you want to erase saved data and memories for this AI? \
                         Type 'yes' to erase data, or anything else to cancel: ",
                    )?;
                    let Some(choice) = lines.next_line().await? else {
                        break;
                    };
                    if choice.trim().eq_ignore_ascii_case("yes") {
                        match agent.execute(Command::Wipe).await {
                            Ok(output) => output.iter().for_each(|l| println!("{l}")),
                            Err(e) => println!("Error: {e}"),
                        }
                    } else {
                        println!("Cancelled.");
                    }
                }
                Ok(command) => {
                    if command == Command::Suggest {
                        println!("Suggesting possible user responses...");
                    }
                    match agent.execute(command).await {
                        Ok(output) => output.iter().for_each(|l| println!("{l}")),
                        Err(e) => println!("Error: {e}"),
                    }
                }
                Err(e) => println!("{e}"),
            }
            continue;
        }

        println!();
        run_turn(&mut agent, msg).await;
    }

    agent.save().context("Failed to save state on exit")?;
    Ok(())
}
