use std::sync::Arc;

use gallery_api::AppStateInner;
use gallery_client::{ClientError, GalleryClient, OptimisticGallery, UploadFile};
use gallery_db::Database;
use gallery_spotify::SpotifyConfig;
use gallery_types::api::RegisterRequest;

async fn spawn_server() -> String {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let state = AppStateInner::new(db, "test-secret".into(), SpotifyConfig::default());
    let app = gallery_api::router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn png(name: &str) -> UploadFile {
    UploadFile {
        filename: name.into(),
        mime: "image/png".into(),
        data: b"\x89PNG\r\n\x1a\n".to_vec(),
    }
}

async fn seeded_gallery(base: &str) -> OptimisticGallery {
    let mut gallery = OptimisticGallery::new(GalleryClient::new(base));
    gallery
        .upload(vec![png("a.png"), png("b.png"), png("c.png")])
        .await
        .unwrap();
    gallery.refresh().await.unwrap();
    gallery
}

#[tokio::test]
async fn reorder_converges_with_server() {
    let base = spawn_server().await;
    let mut gallery = seeded_gallery(&base).await;

    let mut ids = gallery.cache().ids();
    ids.reverse();
    gallery.reorder(&ids).await.unwrap();
    assert_eq!(gallery.cache().ids(), ids);

    let server = GalleryClient::new(&base).list_media().await.unwrap();
    let server_ids: Vec<i64> = server.iter().map(|m| m.id).collect();
    assert_eq!(server_ids, ids);
    assert_eq!(gallery.items(), server.as_slice());
}

#[tokio::test]
async fn failed_reorder_rolls_back() {
    let base = spawn_server().await;
    let seeded = seeded_gallery(&base).await;
    let before = seeded.cache().clone();

    // Nothing listens on the discard port.
    let offline = GalleryClient::new("http://127.0.0.1:9");
    let mut gallery = OptimisticGallery::with_cache(offline, before.clone());

    let mut ids = before.ids();
    ids.reverse();
    let err = gallery.reorder(&ids).await.unwrap_err();
    assert!(matches!(err, ClientError::Http(_)));
    assert_eq!(gallery.cache(), &before);
}

#[tokio::test]
async fn failed_like_rolls_back() {
    let base = spawn_server().await;
    let mut gallery = seeded_gallery(&base).await;
    let target = gallery.cache().ids()[0];

    // Removed behind the cache's back.
    GalleryClient::new(&base).delete_media(target).await.unwrap();

    let err = gallery.set_liked(target, true).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(!gallery.cache().get(target).unwrap().liked);

    let other = gallery.cache().ids()[1];
    let updated = gallery.set_liked(other, true).await.unwrap();
    assert!(updated.liked);
    assert!(gallery.cache().get(other).unwrap().liked);
}

#[tokio::test]
async fn authenticated_upload_and_comment() {
    let base = spawn_server().await;
    let mut client = GalleryClient::new(&base);
    let auth = client
        .register(&RegisterRequest {
            email: "ada@example.com".into(),
            password: "correct horse".into(),
            first_name: Some("Ada".into()),
            last_name: None,
        })
        .await
        .unwrap();

    let created = client.upload(vec![png("mine.png")]).await.unwrap();
    assert_eq!(created[0].user_id, Some(auth.user.id));

    let comment = client.add_comment(created[0].id, "first").await.unwrap();
    assert_eq!(comment.user.first_name.as_deref(), Some("Ada"));

    let err = GalleryClient::new(&base)
        .add_comment(created[0].id, "anon")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(401));
}
