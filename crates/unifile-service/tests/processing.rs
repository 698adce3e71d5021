mod helpers;

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, watch};

use helpers::*;
use unifile_core::error::ErrorKind;
use unifile_core::events::EventType;
use unifile_core::types::{ProcessingOptions, UploadFileInfo, UploadStatus};

fn wav(samples: usize) -> Vec<u8> {
    let data_len = (samples * 2) as u32;
    let mut out = Vec::new();
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVEfmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&8000u32.to_le_bytes());
    out.extend_from_slice(&16000u32.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.resize(out.len() + data_len as usize, 0);
    out
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]));
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

fn audio_upload(uploader: &str) -> UploadFileInfo {
    UploadFileInfo::new(wav(16), "tone.wav", "test", uploader).with_mime_type("audio/wav")
}

/// Notified on every terminal processing event.
fn processing_done(env: &TestEnv) -> Arc<Notify> {
    let done = Arc::new(Notify::new());
    for kind in [EventType::ProcessingComplete, EventType::ProcessingError] {
        let done = done.clone();
        env.service.on_file_event(kind, move |_| done.notify_one());
    }
    done
}

async fn wait(done: &Notify) {
    tokio::time::timeout(Duration::from_secs(10), done.notified())
        .await
        .expect("processing did not finish");
}

#[tokio::test]
async fn test_image_processing_runs_after_upload_complete() {
    let env = env_with(
        |config| config.upload.max_file_size_bytes = 64 * 1024,
        |builder| builder,
    )
    .await;
    let events = env.record_events();
    let done = processing_done(&env);
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let worker = env.service.start_processing(cancel_rx);

    let file = UploadFileInfo::new(png(40, 20), "photo.png", "test", "alice").with_processing(
        ProcessingOptions {
            thumbnail_size: Some(16),
            ..Default::default()
        },
    );
    let meta = env.service.upload_file(file, None, None).await.unwrap();
    assert!(meta.artifacts.is_empty());
    wait(&done).await;

    assert_eq!(
        types_of(&events, meta.id),
        [
            "upload:start",
            "upload:progress",
            "upload:progress",
            "upload:complete",
            "processing:start",
            "processing:complete"
        ]
    );

    let stored = env
        .service
        .get_file_metadata(meta.id, Some("alice"))
        .await
        .unwrap();
    assert_eq!(stored.artifacts.len(), 1);
    let artifact = &stored.artifacts[0];
    assert_eq!(artifact.processor, "image");
    assert_eq!(artifact.mime_type, "image/jpeg");
    assert!(artifact.path.ends_with(&format!("{}_processed.jpg", meta.id)));
    assert_eq!(artifact.details["width"], 16);
    assert_eq!(artifact.details["height"], 8);
    assert!(env.dir.path().join(&artifact.path).exists());

    let progress = env.service.get_upload_progress(meta.id).unwrap();
    assert_eq!(progress.status, UploadStatus::Completed);
    assert_eq!(progress.progress, 100);

    cancel_tx.send(true).unwrap();
    worker.await.unwrap();
}

#[tokio::test]
async fn test_abandoned_upload_does_not_stall_the_worker() {
    let (env, store) = slow_env(
        |config| config.upload.max_file_size_bytes = 64 * 1024,
        Duration::from_millis(300),
    )
    .await;
    let events = env.record_events();
    let done = processing_done(&env);
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let worker = env.service.start_processing(cancel_rx);
    let photo = || {
        UploadFileInfo::new(png(40, 20), "photo.png", "test", "alice")
            .with_processing(ProcessingOptions::default())
    };

    store.stall_creates(1);
    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        env.service.upload_file(photo(), None, None),
    )
    .await;
    assert!(abandoned.is_err());

    let meta = env.service.upload_file(photo(), None, None).await.unwrap();
    wait(&done).await;

    let types = types_of(&events, meta.id);
    assert_eq!(types.last(), Some(&"processing:complete"));
    assert_eq!(
        events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.event_type() == EventType::ProcessingStart)
            .count(),
        1
    );
    assert_eq!(env.service.health_check().await.queue_len, 0);

    cancel_tx.send(true).unwrap();
    worker.await.unwrap();
}

#[tokio::test]
async fn test_processing_failure_keeps_the_original() {
    let env = env().await;
    let events = env.record_events();
    let done = processing_done(&env);
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let worker = env.service.start_processing(cancel_rx);

    let file = UploadFileInfo::new(b"not really ogg".to_vec(), "clip.ogg", "test", "alice")
        .with_mime_type("audio/ogg")
        .with_processing(ProcessingOptions::default());
    let meta = env.service.upload_file(file, None, None).await.unwrap();
    wait(&done).await;

    let types = types_of(&events, meta.id);
    assert_eq!(types[types.len() - 2..], ["processing:start", "processing:error"]);

    let progress = env.service.get_upload_progress(meta.id).unwrap();
    assert_eq!(progress.status, UploadStatus::Failed);
    assert!(progress.error.unwrap().starts_with("PROCESSING"));

    let bytes = env.service.download_file(meta.id, Some("alice")).await.unwrap();
    assert_eq!(bytes.as_ref(), b"not really ogg");
    assert!(env.stored(meta.id).await.artifacts.is_empty());

    cancel_tx.send(true).unwrap();
    worker.await.unwrap();
}

#[tokio::test]
async fn test_enqueue_beyond_capacity_is_queue_full() {
    let env = env().await;
    let mut ids = Vec::new();
    for _ in 0..=QUEUE_CAPACITY {
        let meta = env
            .service
            .upload_file(audio_upload("alice"), None, None)
            .await
            .unwrap();
        ids.push(meta.id);
    }

    for id in &ids[..QUEUE_CAPACITY] {
        env.service
            .enqueue_processing(*id, Some("alice"), ProcessingOptions::default())
            .await
            .unwrap();
    }
    let err = env
        .service
        .enqueue_processing(ids[QUEUE_CAPACITY], Some("alice"), ProcessingOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::QueueFull);
    assert!(!err.is_retryable());
    let last = env.stored(ids[QUEUE_CAPACITY]).await;
    assert!(!last.is_deleted);
    assert_eq!(env.service.health_check().await.queue_len, QUEUE_CAPACITY);
}

#[tokio::test]
async fn test_upload_succeeds_when_processing_queue_is_full() {
    let env = env().await;
    let events = env.record_events();
    let request = || audio_upload("alice").with_processing(ProcessingOptions::default());

    for _ in 0..QUEUE_CAPACITY {
        env.service.upload_file(request(), None, None).await.unwrap();
    }
    let meta = env.service.upload_file(request(), None, None).await.unwrap();

    assert_eq!(
        types_of(&events, meta.id),
        [
            "upload:start",
            "upload:progress",
            "upload:progress",
            "upload:complete",
            "processing:error"
        ]
    );
    let progress = env.service.get_upload_progress(meta.id).unwrap();
    assert_eq!(progress.status, UploadStatus::Completed);
    assert!(env.service.download_file(meta.id, Some("alice")).await.is_ok());
}

#[tokio::test]
async fn test_unsupported_processing_is_rejected_before_io() {
    let env = env().await;
    let file = text_file(10, "alice").with_processing(ProcessingOptions::default());

    let err = env.service.upload_file(file, None, None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let file = text_file(10, "alice").with_processing(ProcessingOptions {
        processor: Some("video".into()),
        ..Default::default()
    });
    let err = env.service.upload_file(file, None, None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(env.provider_uploads(), 0);
}

#[tokio::test]
async fn test_only_the_uploader_may_enqueue() {
    let env = env().await;
    let meta = env
        .service
        .upload_file(audio_upload("alice"), None, None)
        .await
        .unwrap();

    let err = env
        .service
        .enqueue_processing(meta.id, Some("bob"), ProcessingOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);
    assert_eq!(env.service.context().queue.len(), 0);
}

#[tokio::test]
async fn test_health_report() {
    let env = env().await;
    let report = env.service.health_check().await;
    assert!(report.cache);
    assert_eq!(report.queue_capacity, QUEUE_CAPACITY);
    assert_eq!(report.storage.get(&unifile_core::types::StorageType::Local), Some(&true));
}
