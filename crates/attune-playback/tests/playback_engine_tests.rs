use std::sync::Arc;
use std::time::Duration;

use attune_codec::EncodedChunk;
use attune_playback::{MemorySink, PlaybackEngine, PlaybackEvent};

fn pcm_chunk(seed: f32, rate: u32) -> (String, String) {
    let samples: Vec<f32> = (0..256).map(|i| seed * ((i % 32) as f32 / 32.0)).collect();
    let chunk = EncodedChunk::from_samples(&samples, rate);
    (chunk.data, format!("audio/pcm;rate={}", rate))
}

async fn wait_until<F: Fn() -> bool>(cond: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}

#[tokio::test]
async fn chunks_play_in_submission_order() {
    let sink = Arc::new(MemorySink::new(10));
    let (engine, _events) = PlaybackEngine::new(sink.clone());

    let (a, mime) = pcm_chunk(0.1, 16_000);
    let (b, _) = pcm_chunk(0.2, 16_000);
    let (c, _) = pcm_chunk(0.3, 16_000);

    // B and C are submitted while A is still playing
    engine.play_audio(&a, &mime);
    engine.play_audio(&b, &mime);
    engine.play_audio(&c, &mime);

    assert!(
        wait_until(|| engine.played_chunks().len() == 3, Duration::from_secs(2)).await,
        "all three chunks should complete"
    );
    assert_eq!(engine.played_chunks(), vec![a, b, c]);
    // The sink saw exactly one buffer at a time, in order
    assert_eq!(sink.started().len(), 3);
}

#[tokio::test]
async fn stop_playback_preserves_ledger_prefix() {
    let sink = Arc::new(MemorySink::new(40));
    let (engine, _events) = PlaybackEngine::new(sink);

    let submitted: Vec<(String, String)> = (1..=5).map(|i| pcm_chunk(i as f32 * 0.1, 16_000)).collect();
    for (data, mime) in &submitted {
        engine.play_audio(data, mime);
    }

    // Let a couple of chunks finish, then interrupt mid-stream
    tokio::time::sleep(Duration::from_millis(100)).await;
    engine.stop_playback();

    let played = engine.played_chunks();
    assert!(!played.is_empty(), "some chunks completed before the stop");
    assert!(played.len() < 5, "the stop discarded queued chunks");

    // Ledger is a prefix of the submission order
    for (i, data) in played.iter().enumerate() {
        assert_eq!(data, &submitted[i].0, "ledger diverged at index {}", i);
    }

    // Nothing sneaks into the ledger after the stop
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(engine.played_chunks(), played);
}

#[tokio::test]
async fn corrupted_chunk_halts_queue_and_later_chunks_never_play() {
    let sink = Arc::new(MemorySink::new(5));
    let (engine, mut events) = PlaybackEngine::new(sink.clone());

    let (a, mime) = pcm_chunk(0.1, 16_000);
    engine.play_audio(&a, &mime);
    assert!(
        wait_until(|| engine.played_chunks().len() == 1, Duration::from_secs(2)).await,
        "valid chunk A plays"
    );

    // B is corrupted; the engine stops instead of skipping, and C is
    // rejected along with everything else queued
    let (c, _) = pcm_chunk(0.3, 16_000);
    engine.play_audio("%%%corrupted%%%", &mime);
    engine.play_audio(&c, &mime);

    match tokio::time::timeout(Duration::from_secs(1), events.recv()).await {
        Ok(Some(PlaybackEvent::Error(msg))) => assert!(msg.contains("decode")),
        other => panic!("expected decode error event, got {:?}", other),
    }

    tokio::time::sleep(Duration::from_millis(100)).await;
    // A remains the only chunk that ever reached the sink and the ledger
    assert_eq!(engine.played_chunks(), vec![a]);
    assert_eq!(sink.started().len(), 1);
}

#[tokio::test]
async fn stop_with_empty_queue_is_harmless() {
    let sink = Arc::new(MemorySink::default());
    let (engine, _events) = PlaybackEngine::new(sink);

    engine.stop_playback();
    engine.stop_playback();
    assert!(engine.played_chunks().is_empty());
}

#[tokio::test]
async fn playback_resumes_after_stop() {
    let sink = Arc::new(MemorySink::new(5));
    let (engine, _events) = PlaybackEngine::new(sink);

    let (a, mime) = pcm_chunk(0.1, 16_000);
    engine.play_audio(&a, &mime);
    tokio::time::sleep(Duration::from_millis(50)).await;
    engine.stop_playback();

    let before = engine.played_chunks();

    // A fresh submission after a stop starts a new drain session
    let (b, _) = pcm_chunk(0.2, 16_000);
    engine.play_audio(&b, &mime);
    assert!(
        wait_until(
            || engine.played_chunks().len() == before.len() + 1,
            Duration::from_secs(2)
        )
        .await,
        "chunk after stop plays"
    );
}
