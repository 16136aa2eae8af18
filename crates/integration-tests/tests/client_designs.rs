//! Two-phase design writes and reconciled listings against the fake backend.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use serde_json::json;

use kickforge_client::services::{AuthService, DesignService, PhaseResult};
use kickforge_client::{AppState, ToastLevel};
use kickforge_core::{ColorMap, ColorValue, Design, DesignSource, PartName};
use kickforge_integration_tests::FakeBackend;

const EMAIL: &str = "asha@kickforge.in";
const PASSWORD: &str = "hunter22!";

fn design(name: &str) -> Design {
    let mut colors = ColorMap::new();
    colors.insert(
        PartName::parse("sole").unwrap(),
        ColorValue::parse("#1a1a1a").unwrap(),
    );
    colors.insert(
        PartName::parse("laces").unwrap(),
        ColorValue::parse("#ff6600").unwrap(),
    );
    Design::new(name, colors, None)
}

async fn signed_in(backend: &FakeBackend) -> (AppState, String) {
    let user_id = backend.add_account("Asha", EMAIL, PASSWORD);
    let state = backend.client();
    AuthService::new(&state).login(EMAIL, PASSWORD).await.unwrap();
    (state, user_id)
}

#[tokio::test]
async fn test_anonymous_save_stays_on_device() {
    let backend = FakeBackend::start().await;
    let state = backend.client();

    let (_, outcome) = DesignService::new(&state).save(design("Night Court")).await;
    assert_eq!(outcome.local, PhaseResult::Done);
    assert_eq!(outcome.remote, PhaseResult::Skipped);
    assert_eq!(outcome.toast().level, ToastLevel::Info);
    assert!(backend.designs().is_empty());
}

#[tokio::test]
async fn test_signed_in_save_adopts_backend_id() {
    let backend = FakeBackend::start().await;
    let (state, user_id) = signed_in(&backend).await;
    let draft = design("Night Court");
    let draft_id = draft.id.clone();

    let (saved, outcome) = DesignService::new(&state).save(draft).await;
    assert!(outcome.is_complete());
    assert_eq!(outcome.toast().message, "Design saved.");
    assert_ne!(saved.id, draft_id);
    assert_eq!(outcome.design_id, saved.id);
    assert_eq!(saved.owner.as_ref().unwrap().as_str(), user_id);

    let stored = backend.designs();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["_id"], saved.id.as_str());
    assert_eq!(stored[0]["colors"]["laces"], "#ff6600");

    // The local copy was re-keyed, so the merged list has one entry.
    assert!(state.store().designs().get(&draft_id).await.unwrap().is_none());
    let listed = DesignService::new(&state).list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, saved.id);
}

#[tokio::test]
async fn test_list_merges_legacy_and_local_designs() {
    let backend = FakeBackend::start().await;
    let (state, user_id) = signed_in(&backend).await;

    backend.insert_design(json!({
        "_id": "65f1aaaa",
        "name": "Sunset Court",
        "colors": {"sole": "#FFF"},
        "createdAt": "2024-03-13T09:30:00.000Z",
        "userId": user_id,
    }));
    // Older records have no id and a millisecond timestamp.
    backend.insert_design(json!({
        "name": "Red Runner",
        "colors": {},
        "createdAt": 1_700_000_000_000_i64,
        "userId": user_id,
    }));
    // Malformed records are skipped.
    backend.insert_design(json!({ "colors": {}, "userId": user_id }));
    // Someone else's design is never listed.
    backend.insert_design(json!({
        "_id": "65f1bbbb",
        "name": "Not Mine",
        "createdAt": "2024-05-01T00:00:00Z",
        "userId": "u-other",
    }));

    let local = design("Draft On Device");
    state.store().designs().save(&local).await.unwrap();

    let listed = DesignService::new(&state).list().await.unwrap();
    let names: Vec<&str> = listed.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["Draft On Device", "Sunset Court", "Red Runner"]);
    assert!(listed[2].id.is_synthetic());
    assert_eq!(listed[1].colors.values().next().unwrap().as_str(), "#ffffff");
}

#[tokio::test]
async fn test_bad_record_does_not_hide_its_neighbours() {
    let backend = FakeBackend::start().await;
    let (state, user_id) = signed_in(&backend).await;

    backend.insert_design(json!({
        "_id": "65f1aaaa",
        "name": "Sunset Court",
        "colors": {"sole": "#FFF"},
        "createdAt": "2024-03-13T09:30:00.000Z",
        "userId": user_id,
    }));
    backend.insert_design(json!({
        "_id": "65f1bbbb",
        "name": "Blank Canvas",
        "colors": null,
        "createdAt": "2024-03-14T09:30:00.000Z",
        "userId": user_id,
    }));
    backend.insert_design(json!({
        "_id": "65f1cccc",
        "id": 1_710_000_000_000_i64,
        "name": "Migrated",
        "colors": {"laces": "#000"},
        "createdAt": "2024-03-15T09:30:00.000Z",
        "userId": user_id,
    }));
    backend.insert_design(json!({
        "_id": "65f1dddd",
        "name": "Numeric Sole",
        "colors": {"sole": 5},
        "createdAt": "2024-03-16T09:30:00.000Z",
        "userId": user_id,
    }));

    let listed = DesignService::new(&state).list().await.unwrap();
    let ids: Vec<&str> = listed.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, ["65f1cccc", "65f1bbbb", "65f1aaaa"]);
    assert!(listed[1].colors.is_empty());
}

#[tokio::test]
async fn test_backend_outage_keeps_local_copy() {
    let backend = FakeBackend::start().await;
    let (state, _) = signed_in(&backend).await;
    backend.set_designs_down(true);

    let (saved, outcome) = DesignService::new(&state).save(design("Offline")).await;
    assert_eq!(outcome.local, PhaseResult::Done);
    assert!(outcome.remote.is_failed());
    let toast = outcome.toast();
    assert_eq!(toast.level, ToastLevel::Warning);
    assert!(toast.message.starts_with("Design saved on this device, but not in your account"));

    let listed = DesignService::new(&state).list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, saved.id);
    assert!(backend.designs().is_empty());
}

#[tokio::test]
async fn test_delete_removes_both_copies() {
    let backend = FakeBackend::start().await;
    let (state, _) = signed_in(&backend).await;
    let service = DesignService::new(&state);
    let (saved, _) = service.save(design("Short Lived")).await;

    let outcome = service.delete(&saved.id).await;
    assert!(outcome.is_complete());
    assert_eq!(outcome.remote, PhaseResult::Done);
    assert!(backend.designs().is_empty());
    assert!(service.list().await.unwrap().is_empty());

    // Already gone on the backend still counts as deleted.
    let outcome = service.delete(&saved.id).await;
    assert_eq!(outcome.remote, PhaseResult::Done);
    assert_eq!(outcome.toast().message, "Design deleted.");
}

#[tokio::test]
async fn test_generate_reuses_image_for_same_prompt() {
    let backend = FakeBackend::start().await;
    let (state, _) = signed_in(&backend).await;
    let service = DesignService::new(&state);

    let (first, outcome) = service.generate("Chrome high tops").await.unwrap();
    assert!(outcome.is_complete());
    assert_eq!(first.source, DesignSource::Generated);
    assert_eq!(first.prompt.as_deref(), Some("Chrome high tops"));

    let (second, _) = service.generate("  chrome HIGH tops ").await.unwrap();
    assert_eq!(backend.generate_calls(), 1);
    assert_eq!(first.preview, second.preview);
    assert_ne!(first.id, second.id);

    let stored = backend.designs();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0]["source"], "generated");
}
