mod common;

use anyhow::Result;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

/// Token holding every capability, for scenario plumbing
fn admin_token() -> String {
    let grants: Vec<String> = ["garden", "seed", "farm", "farm_note"]
        .iter()
        .flat_map(|resource| {
            ["create", "list", "retrieve", "update", "delete"]
                .iter()
                .map(move |action| format!("{}:{}", resource, action))
        })
        .collect();
    let refs: Vec<&str> = grants.iter().map(String::as_str).collect();
    common::mint_token("admin", &refs)
}

macro_rules! require_store {
    ($server:expr) => {
        if !common::store_ready($server).await {
            eprintln!("skipping: database not reachable from the spawned server");
            return Ok(());
        }
    };
}

#[tokio::test]
async fn garden_lifecycle() -> Result<()> {
    let server = common::ensure_server().await?;
    require_store!(server);
    let client = Client::new();
    let token = admin_token();

    // Create, then retrieve by the returned id: writable fields match
    let code = common::unique_code("G");
    let res = client
        .post(format!("{}/v1/gardens", server.base_url))
        .bearer_auth(&token)
        .json(&json!({"code": code, "size": 10}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await?;
    let id = created["id"].as_i64().expect("created garden has an id");
    assert_eq!(created["code"], code.as_str());
    assert_eq!(created["size"], 10);

    let res = client
        .get(format!("{}/v1/gardens/{}", server.base_url, id))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let fetched: Value = res.json().await?;
    assert_eq!(fetched["code"], code.as_str());
    assert_eq!(fetched["size"], 10);

    // Partial update touches only the provided field
    let res = client
        .patch(format!("{}/v1/gardens/{}", server.base_url, id))
        .bearer_auth(&token)
        .json(&json!({"size": 25}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let patched: Value = res.json().await?;
    assert_eq!(patched["size"], 25);
    assert_eq!(patched["code"], code.as_str());

    // Delete, then the row is gone
    let res = client
        .delete(format!("{}/v1/gardens/{}", server.base_url, id))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(format!("{}/v1/gardens/{}", server.base_url, id))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Deleting it again is a NotFound, not a silent success
    let res = client
        .delete(format!("{}/v1/gardens/{}", server.base_url, id))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn duplicate_code_is_a_conflict() -> Result<()> {
    let server = common::ensure_server().await?;
    require_store!(server);
    let client = Client::new();
    let token = admin_token();

    let code = common::unique_code("G");
    let body = json!({"code": code, "size": 1});
    let res = client
        .post(format!("{}/v1/gardens", server.base_url))
        .bearer_auth(&token)
        .json(&body)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .post(format!("{}/v1/gardens", server.base_url))
        .bearer_auth(&token)
        .json(&body)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let error: Value = res.json().await?;
    assert_eq!(error["code"], "CONFLICT");
    Ok(())
}

#[tokio::test]
async fn upsert_creates_then_updates_in_place() -> Result<()> {
    let server = common::ensure_server().await?;
    require_store!(server);
    let client = Client::new();
    let token = admin_token();

    let id = common::unique_id();
    let code = common::unique_code("G");

    // Unknown id: created with exactly that id
    let res = client
        .put(format!("{}/v1/gardens/{}", server.base_url, id))
        .bearer_auth(&token)
        .json(&json!({"code": code, "size": 3}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await?;
    assert_eq!(created["id"].as_i64(), Some(id as i64));

    // Existing id: sparse update in place
    let res = client
        .put(format!("{}/v1/gardens/{}", server.base_url, id))
        .bearer_auth(&token)
        .json(&json!({"size": 4}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await?;
    assert_eq!(updated["size"], 4);
    assert_eq!(updated["code"], code.as_str());
    Ok(())
}

#[tokio::test]
async fn upsert_permission_follows_existence() -> Result<()> {
    let server = common::ensure_server().await?;
    require_store!(server);
    let client = Client::new();
    let admin = admin_token();
    // Can update gardens but never create them
    let updater = common::mint_token("carol", &["garden:update"]);

    // Nonexistent target: the create capability is the one that matters
    let res = client
        .put(format!("{}/v1/gardens/{}", server.base_url, common::unique_id()))
        .bearer_auth(&updater)
        .json(&json!({"code": common::unique_code("G"), "size": 1}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Existing target: the same token is now sufficient
    let id = common::unique_id();
    let res = client
        .put(format!("{}/v1/gardens/{}", server.base_url, id))
        .bearer_auth(&admin)
        .json(&json!({"code": common::unique_code("G"), "size": 1}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .put(format!("{}/v1/gardens/{}", server.base_url, id))
        .bearer_auth(&updater)
        .json(&json!({"size": 2}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn full_scenario_garden_to_farm_note() -> Result<()> {
    let server = common::ensure_server().await?;
    require_store!(server);
    let client = Client::new();
    let token = admin_token();

    // Garden
    let garden_code = common::unique_code("G");
    let res = client
        .post(format!("{}/v1/gardens", server.base_url))
        .bearer_auth(&token)
        .json(&json!({"code": garden_code, "size": 10}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let garden: Value = res.json().await?;

    // Seed
    let res = client
        .post(format!("{}/v1/seeds", server.base_url))
        .bearer_auth(&token)
        .json(&json!({"name": "Tomato"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let seed: Value = res.json().await?;

    // Farm referencing both
    let farm_code = common::unique_code("F");
    let res = client
        .post(format!("{}/v1/farms", server.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "code": farm_code,
            "born_date": "2024-01-01",
            "gardem_id": garden["id"],
            "seed_id": seed["id"],
            "state": "germinating"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let farm: Value = res.json().await?;
    let farm_id = farm["id"].as_i64().unwrap();

    // Nested note with a server-assigned timestamp
    let res = client
        .post(format!("{}/v1/farms/{}/notes", server.base_url, farm_id))
        .bearer_auth(&token)
        .json(&json!({"note": "watered", "note_type": "note", "value": 0}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let note: Value = res.json().await?;
    let note_id = note["id"].as_i64().unwrap();
    assert_eq!(note["farm_id"].as_i64(), Some(farm_id));
    assert_eq!(note["note"], "watered");
    assert!(note["created_at"].is_string());

    // Patch only the state
    let res = client
        .patch(format!("{}/v1/farms/{}", server.base_url, farm_id))
        .bearer_auth(&token)
        .json(&json!({"state": "fruiting"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let patched: Value = res.json().await?;
    assert_eq!(patched["state"], "fruiting");
    assert_eq!(patched["code"], farm_code.as_str());
    assert_eq!(patched["born_date"], "2024-01-01");

    // Delete the farm; it and its notes are gone
    let res = client
        .delete(format!("{}/v1/farms/{}", server.base_url, farm_id))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(format!("{}/v1/farms/{}", server.base_url, farm_id))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(format!(
            "{}/v1/farms/{}/notes/{}",
            server.base_url, farm_id, note_id
        ))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn list_count_is_total_regardless_of_paging() -> Result<()> {
    let server = common::ensure_server().await?;
    require_store!(server);
    let client = Client::new();
    let token = admin_token();

    for name in ["Basil", "Chili", "Pumpkin"] {
        let res = client
            .post(format!("{}/v1/seeds", server.base_url))
            .bearer_auth(&token)
            .json(&json!({"name": name}))
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let res = client
        .get(format!("{}/v1/seeds?limit=2", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let page: Value = res.json().await?;
    let count = page["count"].as_i64().unwrap();
    assert!(count >= 3);
    assert!(page["items"].as_array().unwrap().len() <= 2);
    assert!(page["next"].is_null());
    assert!(page["previous"].is_null());

    // Count does not shift with the window
    let res = client
        .get(format!("{}/v1/seeds?offset=2&limit=2", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    let shifted: Value = res.json().await?;
    assert_eq!(shifted["count"].as_i64(), Some(count));
    Ok(())
}

#[tokio::test]
async fn note_creation_requires_its_own_capability() -> Result<()> {
    let server = common::ensure_server().await?;
    require_store!(server);
    let client = Client::new();
    // Full farm access, no note capabilities
    let token = common::mint_token(
        "dave",
        &["farm:create", "farm:retrieve", "farm:update", "farm:delete"],
    );

    let res = client
        .post(format!("{}/v1/farms/1/notes", server.base_url))
        .bearer_auth(&token)
        .json(&json!({"note": "watered"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}
