use reqwest::multipart::Form;

use crate::common::{
    MAX_BLOB_SIZE, TestApp, audio_part, file_part, photo_part, routes, sabia_form,
};

mod sighting_create {
    use super::*;

    #[tokio::test]
    async fn create_with_photo_returns_record() {
        let app = TestApp::spawn().await;

        let res = app
            .post_form(
                routes::BIRDS,
                sabia_form()
                    .text("notes", "  singing at dawn ")
                    .part("photo", photo_part(b"0123456789")),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.str_field("species"), Some("Sabiá"));
        assert_eq!(res.body["latitude"].as_f64(), Some(-23.5));
        assert_eq!(res.body["longitude"].as_f64(), Some(-46.6));
        assert_eq!(res.str_field("notes"), Some("singing at dawn"));
        assert!(res.body["audio"].is_null());
        assert!(res.body["audio_url"].is_null());

        let photo = res.str_field("photo").expect("photo should be set");
        assert!(photo.ends_with(".jpg"));
        assert_eq!(
            res.str_field("photo_url"),
            Some(format!("/uploads/{photo}").as_str())
        );
        assert!(app.blob_on_disk(photo));
    }

    #[tokio::test]
    async fn observed_at_defaults_to_creation_time() {
        let app = TestApp::spawn().await;
        let res = app.post_form(routes::BIRDS, sabia_form()).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["observed_at"], res.body["created_at"]);
    }

    #[tokio::test]
    async fn missing_species_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .post_form(
                routes::BIRDS,
                Form::new()
                    .text("name", "Unknown")
                    .part("photo", photo_part(b"img")),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.str_field("code"), Some("VALIDATION_ERROR"));
        assert!(app.blobs_on_disk().is_empty());
    }

    #[tokio::test]
    async fn non_numeric_latitude_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .post_form(
                routes::BIRDS,
                Form::new()
                    .text("species", "Sabiá")
                    .text("latitude", "south")
                    .text("longitude", "-46.6"),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.str_field("code"), Some("VALIDATION_ERROR"));
        assert_eq!(app.get(routes::BIRDS).await.body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn wrong_mime_category_creates_nothing() {
        let app = TestApp::spawn().await;

        let res = app
            .post_form(
                routes::BIRDS,
                sabia_form().part("photo", file_part(b"hello", "notes.txt", "text/plain")),
            )
            .await;

        assert_eq!(res.status, 415);
        assert_eq!(res.str_field("code"), Some("UNSUPPORTED_MEDIA_KIND"));
        assert_eq!(app.get(routes::BIRDS).await.body, serde_json::json!([]));
        assert!(app.blobs_on_disk().is_empty());
    }

    #[tokio::test]
    async fn audio_in_photo_slot_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .post_form(routes::BIRDS, sabia_form().part("photo", audio_part(b"snd")))
            .await;

        assert_eq!(res.status, 415);
        assert!(app.blobs_on_disk().is_empty());
    }

    #[tokio::test]
    async fn oversized_attachment_is_rejected() {
        let app = TestApp::spawn().await;
        let too_big = vec![0u8; MAX_BLOB_SIZE as usize + 1];

        let res = app
            .post_form(routes::BIRDS, sabia_form().part("photo", photo_part(&too_big)))
            .await;

        assert_eq!(res.status, 413);
        assert_eq!(res.str_field("code"), Some("PAYLOAD_TOO_LARGE"));
        assert!(app.blobs_on_disk().is_empty());
        assert_eq!(app.get(routes::BIRDS).await.body, serde_json::json!([]));
    }
}

mod sighting_read {
    use super::*;

    #[tokio::test]
    async fn list_is_newest_observation_first() {
        let app = TestApp::spawn().await;
        let old = app
            .create_sighting(sabia_form().text("observed_at", "2024-01-01T06:00:00Z"))
            .await;
        let new = app
            .create_sighting(sabia_form().text("observed_at", "2024-06-01T06:00:00Z"))
            .await;
        let middle = app
            .create_sighting(sabia_form().text("observed_at", "2024-03-01T06:00:00Z"))
            .await;

        let res = app.get(routes::BIRDS).await;
        assert_eq!(res.status, 200);
        let ids: Vec<&str> = res
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec![new.as_str(), middle.as_str(), old.as_str()]);
    }

    #[tokio::test]
    async fn get_returns_single_record() {
        let app = TestApp::spawn().await;
        let id = app.create_sighting(sabia_form()).await;

        let res = app.get(&routes::bird(&id)).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.id(), id);
        assert_eq!(res.str_field("species"), Some("Sabiá"));
    }

    #[tokio::test]
    async fn get_unknown_is_not_found() {
        let app = TestApp::spawn().await;
        let res = app
            .get(&routes::bird("01936f0e-1234-7abc-8000-000000000001"))
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.str_field("code"), Some("NOT_FOUND"));
    }

    #[tokio::test]
    async fn malformed_id_is_rejected() {
        let app = TestApp::spawn().await;
        let res = app.get(&routes::bird("not-a-uuid")).await;
        assert_eq!(res.status, 400);
    }
}

mod sighting_update {
    use super::*;

    #[tokio::test]
    async fn sabia_photo_then_audio_then_delete() {
        let app = TestApp::spawn().await;
        let created = app
            .post_form(
                routes::BIRDS,
                sabia_form().part("photo", photo_part(b"0123456789")),
            )
            .await;
        assert_eq!(created.status, 200);
        let id = created.id();
        let photo = created.str_field("photo").unwrap().to_string();

        let updated = app
            .put_form(
                &routes::bird(&id),
                sabia_form().part("audio", audio_part(b"chirp")),
            )
            .await;
        assert_eq!(updated.status, 200, "{}", updated.text);
        assert_eq!(updated.str_field("photo"), Some(photo.as_str()));
        let audio = updated.str_field("audio").expect("audio should be set").to_string();
        assert!(app.blob_on_disk(&photo));
        assert!(app.blob_on_disk(&audio));
        assert_eq!(updated.body["observed_at"], created.body["observed_at"]);

        let deleted = app.delete(&routes::bird(&id)).await;
        assert_eq!(deleted.status, 200);
        assert_eq!(deleted.str_field("message"), Some("Sighting deleted"));
        assert_eq!(deleted.id(), id);

        assert!(!app.blob_on_disk(&photo));
        assert!(!app.blob_on_disk(&audio));
        assert_eq!(app.get(routes::BIRDS).await.body, serde_json::json!([]));
        assert_eq!(app.get(&routes::bird(&id)).await.status, 404);
    }

    #[tokio::test]
    async fn replacing_photo_removes_old_blob() {
        let app = TestApp::spawn().await;
        let created = app
            .post_form(routes::BIRDS, sabia_form().part("photo", photo_part(b"old")))
            .await;
        let id = created.id();
        let old = created.str_field("photo").unwrap().to_string();

        let updated = app
            .put_form(&routes::bird(&id), sabia_form().part("photo", photo_part(b"new")))
            .await;

        assert_eq!(updated.status, 200);
        let new = updated.str_field("photo").unwrap();
        assert_ne!(new, old);
        assert!(app.blob_on_disk(new));
        assert!(!app.blob_on_disk(&old));
        assert_eq!(app.blobs_on_disk(), vec![new.to_string()]);
    }

    #[tokio::test]
    async fn remove_flag_clears_attachment() {
        let app = TestApp::spawn().await;
        let created = app
            .post_form(
                routes::BIRDS,
                sabia_form()
                    .part("photo", photo_part(b"img"))
                    .part("audio", audio_part(b"snd")),
            )
            .await;
        let id = created.id();
        let photo = created.str_field("photo").unwrap().to_string();

        let updated = app
            .put_form(&routes::bird(&id), sabia_form().text("remove_photo", "true"))
            .await;

        assert_eq!(updated.status, 200);
        assert!(updated.body["photo"].is_null());
        assert!(updated.body["photo_url"].is_null());
        assert_eq!(updated.body["audio"], created.body["audio"]);
        assert!(!app.blob_on_disk(&photo));
    }

    #[tokio::test]
    async fn upload_and_remove_same_slot_is_rejected() {
        let app = TestApp::spawn().await;
        let id = app.create_sighting(sabia_form()).await;

        let res = app
            .put_form(
                &routes::bird(&id),
                sabia_form()
                    .text("remove_photo", "true")
                    .part("photo", photo_part(b"img")),
            )
            .await;

        assert_eq!(res.status, 400);
        assert!(app.blobs_on_disk().is_empty());
    }

    #[tokio::test]
    async fn omitted_fields_are_cleared() {
        let app = TestApp::spawn().await;
        let id = app
            .create_sighting(
                sabia_form()
                    .text("city", "Campinas")
                    .text("country", "Brasil"),
            )
            .await;

        let res = app
            .put_form(
                &routes::bird(&id),
                Form::new().text("species", "Sabiá-laranjeira"),
            )
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.str_field("species"), Some("Sabiá-laranjeira"));
        assert!(res.body["city"].is_null());
        assert!(res.body["country"].is_null());
        assert!(res.body["latitude"].is_null());
    }

    #[tokio::test]
    async fn observed_at_is_fixed_after_creation() {
        let app = TestApp::spawn().await;
        let id = app
            .create_sighting(sabia_form().text("observed_at", "2024-01-01T06:00:00Z"))
            .await;

        let res = app
            .put_form(
                &routes::bird(&id),
                sabia_form().text("observed_at", "2030-01-01T00:00:00Z"),
            )
            .await;

        let observed = |r: &crate::common::TestResponse| {
            chrono::DateTime::parse_from_rfc3339(r.str_field("observed_at").unwrap()).unwrap()
        };
        let expected = chrono::DateTime::parse_from_rfc3339("2024-01-01T06:00:00Z").unwrap();

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(observed(&res), expected);
        assert_eq!(observed(&app.get(&routes::bird(&id)).await), expected);
    }

    #[tokio::test]
    async fn update_unknown_is_not_found_and_stores_nothing() {
        let app = TestApp::spawn().await;

        let res = app
            .put_form(
                &routes::bird("01936f0e-1234-7abc-8000-000000000001"),
                sabia_form().part("photo", photo_part(b"img")),
            )
            .await;

        assert_eq!(res.status, 404);
        assert!(app.blobs_on_disk().is_empty());
    }

    #[tokio::test]
    async fn wrong_mime_on_update_leaves_record_untouched() {
        let app = TestApp::spawn().await;
        let created = app
            .post_form(routes::BIRDS, sabia_form().part("photo", photo_part(b"img")))
            .await;
        let id = created.id();

        let res = app
            .put_form(
                &routes::bird(&id),
                Form::new()
                    .text("species", "Changed")
                    .part("audio", photo_part(b"not audio")),
            )
            .await;

        assert_eq!(res.status, 415);
        let current = app.get(&routes::bird(&id)).await;
        assert_eq!(current.body, created.body);
        assert_eq!(app.blobs_on_disk().len(), 1);
    }
}

mod sighting_delete {
    use super::*;

    #[tokio::test]
    async fn delete_unknown_is_not_found() {
        let app = TestApp::spawn().await;
        let res = app
            .delete(&routes::bird("01936f0e-1234-7abc-8000-000000000001"))
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.str_field("code"), Some("NOT_FOUND"));
    }

    #[tokio::test]
    async fn delete_only_touches_own_blobs() {
        let app = TestApp::spawn().await;
        let keep = app
            .post_form(routes::BIRDS, sabia_form().part("photo", photo_part(b"a")))
            .await;
        let gone = app
            .post_form(routes::BIRDS, sabia_form().part("photo", photo_part(b"b")))
            .await;

        let res = app.delete(&routes::bird(&gone.id())).await;
        assert_eq!(res.status, 200);

        assert_eq!(
            app.blobs_on_disk(),
            vec![keep.str_field("photo").unwrap().to_string()]
        );
        assert_eq!(app.get(&routes::bird(&keep.id())).await.status, 200);
    }
}
