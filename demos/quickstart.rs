use adventure_session::codec;
use adventure_session::testing::ScriptedGateway;
use adventure_session::{
    create_conversation_store, spawn_sweeper, Narrator, NarratorConfig, NarratorError,
    SessionKey, SessionResult, Turn,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

fn scripted_turn(plot: &str, choices: &[&str]) -> SessionResult<String> {
    codec::encode(&Turn {
        plot: plot.to_string(),
        choices: choices.iter().map(|c| c.to_string()).collect(),
        hidden: "The dragon is only pretending to sleep.".to_string(),
    })
}

fn build_config() -> NarratorConfig {
    let mut config = NarratorConfig::default();
    config.openai.system_prompt =
        "You are the narrator of a short choose-your-own-adventure story".to_string();
    config
}

async fn run_scripted_demo() -> SessionResult<()> {
    println!("== Scripted story demo ==");
    let config = build_config();
    let store = create_conversation_store(config.session.backend());
    let gateway = Arc::new(ScriptedGateway::new());
    gateway
        .push_text(scripted_turn(
            "You stand before the dragon's castle.",
            &["Approach the castle quietly", "Challenge the dragon to a duel"],
        )?)
        .push_text(scripted_turn("You slip inside. The hoard glitters.", &[])?);

    let narrator = Narrator::new(&config, store.clone(), gateway)
        .map_err(|err| NarratorError::Internal(err.to_string()))?;
    let shutdown = CancellationToken::new();
    let sweeper = spawn_sweeper(store.clone(), config.session.sweep_interval(), shutdown.clone());

    let key = SessionKey::generate();
    let cancel = CancellationToken::new();
    let view = narrator.begin(&key, &cancel).await?;
    println!("Story {key}: {}", view.plot);
    for choice in &view.choices {
        println!("  - {choice}");
    }

    if let Err(err) = narrator.advance(&key, "Fly to the moon", &cancel).await {
        println!("Rejected: {err}");
    }

    let view = narrator
        .advance(&key, "Approach the castle quietly", &cancel)
        .await?;
    println!("{}", view.plot);
    if view.choices.is_empty() {
        println!("The end.");
    }

    shutdown.cancel();
    let _ = sweeper.await;
    Ok(())
}

#[tokio::main]
async fn main() -> SessionResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    run_scripted_demo().await
}
