use care_dx::config::Config;
use care_dx::extractor::{BackendReply, ExtractionBackend, GeminiBackend};
use care_dx_common::{build_extraction_prompt, parse_extraction_response, MappingSet};

#[tokio::test]
async fn gemini_extraction_integration() {
    let mut config = Config::default();
    config.apply_env(|key| std::env::var(key).ok());

    if config.api_key().is_err() {
        eprintln!("GEMINI_API_KEY not set; skipping integration test");
        return;
    }

    let mapping = MappingSet::parse("性別：P18（男、女）\n氏名：D14").unwrap();
    let backend = GeminiBackend::new(&config).expect("backend init failed");

    let prompt = format!(
        "{}\n\n資料: 利用者は山田花子さん（女性、82歳）です。",
        build_extraction_prompt(mapping.fields())
    );

    let reply = backend.generate(&prompt, &[]).await.expect("request failed");
    let text = match reply {
        BackendReply::Text(text) => text,
        BackendReply::Blocked(reason) => panic!("blocked: {}", reason),
    };

    let values = parse_extraction_response(&text).expect("parse failed");
    assert!(values.iter().any(|v| v.label == "性別"));
}
