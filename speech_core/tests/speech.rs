//! Speech output against a mock TTS server, and voice input over a channel.

mod common;

use std::sync::Arc;

use futures::StreamExt;
use speech_core::{
    ChannelSource, RecognitionEvent, RecognitionResult, RemoteTts, SpeechEngine, SpeechError,
    Speaker, TranscriptUpdate, Utterance, VoiceInfo, VoiceInput,
};
use tokio_util::sync::CancellationToken;

use common::*;

fn wav_files(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    std::fs::read_dir(dir)
        .map(|entries| entries.flatten().map(|e| e.path()).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_remote_voices_are_listed() {
    let server = spawn_tts(false).await;
    let dir = tempfile::tempdir().unwrap();
    let engine = RemoteTts::new(&server.base_url, dir.path());

    let voices = engine.voices().await.unwrap();
    assert_eq!(
        voices,
        vec![
            VoiceInfo::new("de_DE-thorsten-medium", "de_DE"),
            VoiceInfo::new("en_US-lessac-medium", "en_US"),
        ]
    );
}

#[tokio::test]
async fn test_remote_speak_writes_clip() {
    let server = spawn_tts(false).await;
    let dir = tempfile::tempdir().unwrap();
    let engine = RemoteTts::new(&server.base_url, dir.path().join("speech"))
        .with_default_language("en_US");

    engine.speak(Utterance::new("Hello there")).await.unwrap();

    assert_eq!(server.seen().len(), 1);
    assert_eq!(server.seen()[0].text, "Hello there");
    assert_eq!(server.seen()[0].language.as_deref(), Some("en_US"));

    let files = wav_files(engine.output_dir());
    assert_eq!(files.len(), 1);
    let bytes = std::fs::read(&files[0]).unwrap();
    assert_eq!(&bytes[0..4], b"RIFF");
}

#[tokio::test]
async fn test_remote_failure_status() {
    let server = spawn_tts(true).await;
    let dir = tempfile::tempdir().unwrap();
    let engine = RemoteTts::new(&server.base_url, dir.path());

    let err = engine.speak(Utterance::new("x")).await.unwrap_err();
    assert!(matches!(err, SpeechError::Status(500)));
    assert!(wav_files(dir.path()).is_empty());
}

#[tokio::test]
async fn test_speaker_reads_reply_in_english_voice() {
    let server = spawn_tts(false).await;
    let dir = tempfile::tempdir().unwrap();
    let speaker = Speaker::new(Arc::new(RemoteTts::new(&server.base_url, dir.path())));
    speaker.set_enabled(true).unwrap();

    assert!(speaker.speak("## Answer\n\nUse `ls` to **list** files.").await);
    speaker.wait().await;

    let seen = server.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].text, "Answer Use ls to list files.");
    assert_eq!(seen[0].language.as_deref(), Some("en_US"));
    assert_eq!(wav_files(dir.path()).len(), 1);
}

#[tokio::test]
async fn test_configured_language_beats_english_voice() {
    let server = spawn_tts(false).await;
    let dir = tempfile::tempdir().unwrap();
    let engine = RemoteTts::new(&server.base_url, dir.path()).with_default_language("de_DE");
    let speaker = Speaker::new(Arc::new(engine)).with_language("de_DE");
    speaker.set_enabled(true).unwrap();

    assert!(speaker.speak("Guten Morgen").await);
    speaker.wait().await;

    let seen = server.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].language.as_deref(), Some("de_DE"));
}

#[tokio::test]
async fn test_voice_input_accumulates_and_restarts() {
    let (tx, source) = ChannelSource::new(16);
    let mut input = VoiceInput::new(source);
    let token = CancellationToken::new();

    tx.send(RecognitionEvent::Results {
        result_index: 0,
        results: vec![RecognitionResult::interim("hel")],
    })
    .await
    .unwrap();
    tx.send(RecognitionEvent::Results {
        result_index: 0,
        results: vec![RecognitionResult::final_result("hello")],
    })
    .await
    .unwrap();
    tx.send(RecognitionEvent::End).await.unwrap();
    tx.send(RecognitionEvent::Results {
        result_index: 0,
        results: vec![RecognitionResult::final_result("again")],
    })
    .await
    .unwrap();
    tx.send(RecognitionEvent::Error("no-speech".into())).await.unwrap();
    tx.send(RecognitionEvent::Results {
        result_index: 0,
        results: vec![RecognitionResult::final_result("unheard")],
    })
    .await
    .unwrap();

    let updates: Vec<TranscriptUpdate> = input.listen(token).unwrap().collect().await;

    assert_eq!(
        updates,
        vec![
            TranscriptUpdate {
                final_text: String::new(),
                interim: "hel".into()
            },
            TranscriptUpdate {
                final_text: "hello ".into(),
                interim: String::new()
            },
            TranscriptUpdate {
                final_text: "again ".into(),
                interim: String::new()
            },
        ]
    );
    // Started once, restarted once after `End`.
    assert_eq!(input.source().unwrap().starts(), 2);
}

#[tokio::test]
async fn test_voice_input_stops_on_cancel() {
    let (_tx, source) = ChannelSource::new(4);
    let mut input = VoiceInput::new(source);
    let token = CancellationToken::new();

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let updates: Vec<TranscriptUpdate> = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        input.listen(token).unwrap().collect(),
    )
    .await
    .expect("listening should stop when cancelled");
    assert!(updates.is_empty());
}
