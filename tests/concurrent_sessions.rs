use adventure_session::codec;
use adventure_session::inmemory::InMemoryConversationStore;
use adventure_session::testing::ScriptedGateway;
use adventure_session::{ConversationStore, Narrator, NarratorConfig, Role, SessionKey, Turn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn distinct_keys_advance_independently() {
    let mut config = NarratorConfig::default();
    config.openai.system_prompt = "You narrate".into();
    let reply = codec::encode(&Turn {
        plot: "The road goes on.".into(),
        choices: vec!["Continue".into(), "Rest".into()],
        hidden: String::new(),
    })
    .expect("encode");

    let store: Arc<dyn ConversationStore> = Arc::new(InMemoryConversationStore::new());
    let gateway = Arc::new(ScriptedGateway::always(reply));
    let narrator =
        Arc::new(Narrator::new(&config, store.clone(), gateway.clone()).expect("narrator"));

    let players = 32;
    let handles: Vec<_> = (0..players)
        .map(|n| {
            let narrator = Arc::clone(&narrator);
            tokio::spawn(async move {
                let key = SessionKey::parse(format!("player-{n}")).expect("key");
                let cancel = CancellationToken::new();
                narrator.create_story(&key, &cancel).await.expect("create");
                let choice = if n % 2 == 0 { "Continue" } else { "Rest" };
                narrator
                    .advance_story(&key, choice, &cancel)
                    .await
                    .expect("advance");
                (key, choice)
            })
        })
        .collect();

    for handle in handles {
        let (key, choice) = handle.await.expect("task");
        let history = store.get(&key).expect("history");
        assert_eq!(history.len(), 5);
        assert_eq!(history[0].role, Role::System);
        assert_eq!(history[1].content, narrator.opening_prompt(&key));
        assert_eq!(history[3].content, choice, "no cross-key interference");
    }
    assert_eq!(store.len(), players);
    assert_eq!(gateway.call_count(), players * 2);
}
