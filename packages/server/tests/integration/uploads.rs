use reqwest::header;

use crate::common::{TestApp, audio_part, file_part, photo_part, routes, sabia_form};

#[tokio::test]
async fn serves_stored_attachment() {
    let app = TestApp::spawn().await;
    let created = app
        .post_form(routes::BIRDS, sabia_form().part("photo", photo_part(b"0123456789")))
        .await;
    let url = created.str_field("photo_url").unwrap().to_string();

    let res = app.client.get(app.url(&url)).send().await.unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "image/jpeg");
    assert!(
        res.headers()[header::CACHE_CONTROL]
            .to_str()
            .unwrap()
            .contains("immutable")
    );
    assert_eq!(res.bytes().await.unwrap().as_ref(), b"0123456789");
}

#[tokio::test]
async fn audio_content_type_follows_extension() {
    let app = TestApp::spawn().await;
    let created = app
        .post_form(routes::BIRDS, sabia_form().part("audio", audio_part(b"chirp")))
        .await;
    let url = created.str_field("audio_url").unwrap().to_string();

    let res = app.client.get(app.url(&url)).send().await.unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "audio/mpeg");
}

#[tokio::test]
async fn image_named_as_html_is_served_as_image() {
    let app = TestApp::spawn().await;
    let created = app
        .post_form(
            routes::BIRDS,
            sabia_form().part(
                "photo",
                file_part(b"<script>alert(1)</script>", "x.html", "image/png"),
            ),
        )
        .await;
    assert_eq!(created.status, 200, "{}", created.text);
    let photo = created.str_field("photo").unwrap();
    assert!(photo.ends_with(".png"), "{photo}");

    let url = created.str_field("photo_url").unwrap().to_string();
    let res = app.client.get(app.url(&url)).send().await.unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(res.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
}

#[tokio::test]
async fn matching_etag_is_not_modified() {
    let app = TestApp::spawn().await;
    let created = app
        .post_form(routes::BIRDS, sabia_form().part("photo", photo_part(b"img")))
        .await;
    let url = created.str_field("photo_url").unwrap().to_string();

    let first = app.client.get(app.url(&url)).send().await.unwrap();
    let etag = first.headers()[header::ETAG].clone();

    let second = app
        .client
        .get(app.url(&url))
        .header(header::IF_NONE_MATCH, etag)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 304);
}

#[tokio::test]
async fn deleted_attachment_is_gone() {
    let app = TestApp::spawn().await;
    let created = app
        .post_form(routes::BIRDS, sabia_form().part("photo", photo_part(b"img")))
        .await;
    let url = created.str_field("photo_url").unwrap().to_string();

    app.delete(&routes::bird(&created.id())).await;

    let res = app.get(&url).await;
    assert_eq!(res.status, 404);
    assert_eq!(res.str_field("code"), Some("NOT_FOUND"));
}

#[tokio::test]
async fn unknown_or_unsafe_names_are_not_found() {
    let app = TestApp::spawn().await;

    assert_eq!(app.get("/uploads/1-123456789.jpg").await.status, 404);
    assert_eq!(app.get("/uploads/..%2Fbirdwatch.db").await.status, 404);
    assert_eq!(app.get("/uploads/.tmp").await.status, 404);
}
