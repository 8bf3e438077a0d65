use lasttalk::config::Config;
use lasttalk::model::StyleMode;
use secrecy::ExposeSecret;

// Env-var mutation is process-global, so everything lives in one test.
#[test]
fn config_from_env_defaults_and_overrides() {
    unsafe {
        std::env::remove_var("DATABASE_URL");
        std::env::remove_var("OPENAI_API_KEY");
        std::env::remove_var("JINA_API_KEY");
        std::env::remove_var("OPENAI_MODEL");
        std::env::remove_var("OPENAI_TEMPERATURE");
        std::env::remove_var("MEMORY_TURNS");
        std::env::remove_var("RAG_MAX_DISTANCE");
        std::env::remove_var("STYLE_MODE");
    }

    let config = Config::from_env();
    assert!(config.database_url.is_none());
    assert!(config.openai_api_key.is_none());
    assert_eq!(config.openai_model, "gpt-4o-mini");
    assert_eq!(config.temperature, 0.3);
    assert_eq!(config.memory_turns, 8);
    assert_eq!(config.rag_max_distance, 0.85);
    assert_eq!(config.style_mode, StyleMode::Hybrid);

    unsafe {
        std::env::set_var("OPENAI_API_KEY", "sk-test-key");
        std::env::set_var("OPENAI_MODEL", "gpt-4o");
        std::env::set_var("OPENAI_TEMPERATURE", "0.7");
        std::env::set_var("MEMORY_TURNS", "not-a-number");
        std::env::set_var("STYLE_MODE", "rag");
        std::env::set_var("JINA_API_KEY", "   ");
    }

    let config = Config::from_env();
    assert_eq!(
        config.openai_api_key.as_ref().unwrap().expose_secret(),
        "sk-test-key"
    );
    assert_eq!(config.openai_model, "gpt-4o");
    assert_eq!(config.temperature, 0.7);
    // Unparseable numbers fall back to the default.
    assert_eq!(config.memory_turns, 8);
    assert_eq!(config.style_mode, StyleMode::Rag);
    // Blank secrets count as absent.
    assert!(config.jina_api_key.is_none());

    unsafe {
        std::env::remove_var("OPENAI_API_KEY");
        std::env::remove_var("OPENAI_MODEL");
        std::env::remove_var("OPENAI_TEMPERATURE");
        std::env::remove_var("MEMORY_TURNS");
        std::env::remove_var("STYLE_MODE");
        std::env::remove_var("JINA_API_KEY");
    }
}
