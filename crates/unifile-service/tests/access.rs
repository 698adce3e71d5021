mod helpers;

use helpers::*;
use unifile_core::error::ErrorKind;
use unifile_core::types::{FileId, Permission};

#[tokio::test]
async fn test_private_url_is_owner_only() {
    let env = env().await;
    let meta = env
        .service
        .upload_file(text_file(10, "alice"), None, None)
        .await
        .unwrap();

    let url = env
        .service
        .get_file_url(meta.id, Some("alice"), None)
        .await
        .unwrap();
    assert_eq!(url, format!("http://localhost:8080/files/{}", meta.storage_path));

    for user in [Some("bob"), None] {
        let err = env.service.get_file_url(meta.id, user, None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::AccessDenied);
        let err = env.service.download_file(meta.id, user).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::AccessDenied);
    }
}

#[tokio::test]
async fn test_public_file_is_readable_by_anyone() {
    let env = env().await;
    let file = text_file(10, "alice").with_permission(Permission::Public);
    let meta = env.service.upload_file(file, None, None).await.unwrap();

    assert!(env.service.download_file(meta.id, None).await.is_ok());
    assert!(env.service.download_file(meta.id, Some("bob")).await.is_ok());

    let err = env.service.delete_file(meta.id, Some("bob")).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);
    let err = env.service.delete_file(meta.id, None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);
}

#[tokio::test]
async fn test_denied_request_changes_nothing() {
    let env = env().await;
    let events = env.record_events();
    let meta = env
        .service
        .upload_file(text_file(10, "alice"), None, None)
        .await
        .unwrap();
    let before = events.lock().unwrap().len();

    assert!(env.service.download_file(meta.id, Some("bob")).await.is_err());
    assert!(env.service.delete_file(meta.id, Some("bob")).await.is_err());

    let stored = env.stored(meta.id).await;
    assert_eq!(stored.access_count, 0);
    assert!(!stored.is_deleted);
    assert_eq!(events.lock().unwrap().len(), before);
}

#[tokio::test]
async fn test_second_delete_is_not_found() {
    let env = env().await;
    let events = env.record_events();
    let keep = env
        .service
        .upload_file(text_file(10, "alice"), None, None)
        .await
        .unwrap();
    let meta = env
        .service
        .upload_file(text_file(10, "alice"), None, None)
        .await
        .unwrap();
    assert_eq!(env.store.module_usage("test").file_count, 2);

    env.service.delete_file(meta.id, Some("alice")).await.unwrap();
    assert_eq!(env.store.module_usage("test").file_count, 1);
    assert!(types_of(&events, meta.id).contains(&"delete:complete"));

    let err = env.service.delete_file(meta.id, Some("alice")).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    let usage = env.store.module_usage("test");
    assert_eq!(usage.file_count, 1);
    assert_eq!(usage.total_bytes, keep.size);
    let deletes = types_of(&events, meta.id)
        .into_iter()
        .filter(|t| *t == "delete:complete")
        .count();
    assert_eq!(deletes, 1);
}

#[tokio::test]
async fn test_deleted_file_is_gone_but_bytes_remain() {
    let env = env().await;
    let meta = env
        .service
        .upload_file(text_file(10, "alice"), None, None)
        .await
        .unwrap();
    // Warm the URL and metadata caches.
    env.service
        .get_file_url(meta.id, Some("alice"), None)
        .await
        .unwrap();

    env.service.delete_file(meta.id, Some("alice")).await.unwrap();

    for err in [
        env.service.download_file(meta.id, Some("alice")).await.unwrap_err(),
        env.service
            .get_file_url(meta.id, Some("alice"), None)
            .await
            .unwrap_err(),
        env.service
            .get_file_metadata(meta.id, Some("alice"))
            .await
            .unwrap_err(),
    ] {
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
    assert!(env.stored(meta.id).await.is_deleted);
    assert!(env.dir.path().join(&meta.storage_path).exists());
}

#[tokio::test]
async fn test_batch_delete_reports_each_failure() {
    let env = env().await;
    let mine = env
        .service
        .upload_file(text_file(10, "alice"), None, None)
        .await
        .unwrap();
    let theirs = env
        .service
        .upload_file(text_file(10, "bob"), None, None)
        .await
        .unwrap();
    let unknown = FileId::new();

    let result = env
        .service
        .batch_delete_files(&[mine.id, theirs.id, unknown, mine.id], Some("alice"))
        .await
        .unwrap();

    assert_eq!(result.success_count, 1);
    assert_eq!(result.failure_count, 3);
    let failures: Vec<_> = result.failures.iter().map(|f| (f.file_id, f.kind)).collect();
    assert_eq!(
        failures,
        [
            (theirs.id, ErrorKind::AccessDenied),
            (unknown, ErrorKind::NotFound),
            (mine.id, ErrorKind::NotFound),
        ]
    );
    assert!(!env.stored(theirs.id).await.is_deleted);
}

#[tokio::test]
async fn test_listing_respects_visibility_and_updates() {
    let env = env().await;
    let public = env
        .service
        .upload_file(
            text_file(10, "alice").with_permission(Permission::Public),
            None,
            None,
        )
        .await
        .unwrap();
    let private = env
        .service
        .upload_file(text_file(10, "alice"), None, None)
        .await
        .unwrap();

    let ids = |files: Vec<unifile_core::types::FileMetadata>| {
        let mut ids: Vec<String> = files.into_iter().map(|f| f.id.to_string()).collect();
        ids.sort();
        ids
    };
    let sorted = |mut expected: Vec<FileId>| {
        expected.sort_by_key(|id| id.to_string());
        expected.into_iter().map(|id| id.to_string()).collect::<Vec<_>>()
    };
    assert_eq!(
        ids(env.service.list_files("test", Some("alice")).await.unwrap()),
        sorted(vec![public.id, private.id])
    );
    assert_eq!(
        ids(env.service.list_files("test", Some("bob")).await.unwrap()),
        sorted(vec![public.id])
    );

    env.service.delete_file(public.id, Some("alice")).await.unwrap();
    let later = env
        .service
        .upload_file(text_file(10, "alice"), None, None)
        .await
        .unwrap();
    assert_eq!(
        ids(env.service.list_files("test", Some("alice")).await.unwrap()),
        sorted(vec![private.id, later.id])
    );
    assert!(env.service.list_files("test", Some("bob")).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_read_does_not_revive_a_deleted_file() {
    let (env, store) = slow_env(|_| {}, std::time::Duration::from_millis(200)).await;
    let meta = env
        .service
        .upload_file(text_file(10, "alice"), None, None)
        .await
        .unwrap();
    env.service
        .context()
        .metadata_cache
        .evict(meta.id)
        .await
        .unwrap();

    store.stall_reads(1);
    let reader = {
        let service = env.service.clone();
        tokio::spawn(async move { service.get_file_metadata(meta.id, Some("alice")).await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    env.service.delete_file(meta.id, Some("alice")).await.unwrap();
    let read = reader.await.unwrap().unwrap();
    assert!(!read.is_deleted);

    assert!(env.stored(meta.id).await.is_deleted);
    let err = env
        .service
        .get_file_metadata(meta.id, Some("alice"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}
