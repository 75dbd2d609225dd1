//! Shared test fixtures for the booster SDK integration tests.
//!
//! Provides a small sample catalog (three boosters, every rarity in `op01`)
//! either as an in-memory [`Catalog`] or written into a temporary offline
//! cache directory.

#![allow(dead_code)]

use booster_sdk::{BoosterSdk, Catalog};
use std::fs;

pub fn sample_catalog_json() -> serde_json::Value {
    serde_json::json!({
        "boosters": [
            {
                "id": "op01",
                "code": "OP-01",
                "name": "Romance Dawn",
                "series": "OP",
                "cardCount": 5,
                "description": "First booster set",
                "releaseDate": "2022-07-22"
            },
            {
                "id": "op02",
                "code": "OP-02",
                "name": "Paramount War",
                "series": "OP",
                "cardCount": 3,
                "description": null,
                "releaseDate": "2022-11-04"
            },
            {
                "id": "op99",
                "code": "OP-99",
                "name": "Commons Only",
                "series": null,
                "cardCount": 5,
                "description": null,
                "releaseDate": null
            }
        ],
        "cards": [
            card("op01-001", "Nami", "common", "op01"),
            card("op01-002", "Usopp", "common", "op01"),
            card("op01-003", "Zoro", "common", "op01"),
            card("op01-004", "Sanji", "common", "op01"),
            card("op01-010", "Koby", "uncommon", "op01"),
            card("op01-011", "Helmeppo", "uncommon", "op01"),
            card("op01-020", "Shanks", "rare", "op01"),
            card("op01-021", "Buggy", "rare", "op01"),
            card("op01-030", "Monkey D. Luffy", "leader", "op01"),
            card("op01-040", "Roronoa Zoro", "super_rare", "op01"),
            card("op01-050", "Gol D. Roger", "secret_rare", "op01"),
            card("op02-001", "Whitebeard", "common", "op02"),
            card("op02-010", "Marco", "uncommon", "op02"),
            card("op02-020", "Ace", "rare", "op02"),
            card("op99-001", "Marine Soldier", "common", "op99"),
        ]
    })
}

fn card(id: &str, name: &str, rarity: &str, booster_id: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "character": name,
        "rarity": rarity,
        "cost": 2,
        "power": 3000,
        "counter": 1000,
        "color": ["red"],
        "type": "character",
        "booster_id": booster_id,
        "image_url": null
    })
}

pub fn sample_catalog() -> Catalog {
    Catalog::from_json(sample_catalog_json()).unwrap()
}

/// Create an offline [`BoosterSdk`] whose cache directory already holds the
/// sample catalog.
///
/// Returns `(BoosterSdk, tempfile::TempDir)`. The caller must keep the
/// `TempDir` alive for the duration of the test.
pub fn setup_cached_sdk() -> (BoosterSdk, tempfile::TempDir) {
    let tmp_dir = tempfile::tempdir().unwrap();
    write_cached_catalog(tmp_dir.path());

    let sdk = BoosterSdk::builder()
        .cache_dir(tmp_dir.path())
        .offline(true)
        .build()
        .unwrap();
    (sdk, tmp_dir)
}

pub fn write_cached_catalog(dir: &std::path::Path) {
    fs::write(
        dir.join("catalog.json"),
        serde_json::to_string(&sample_catalog_json()).unwrap(),
    )
    .unwrap();
    fs::write(dir.join("version.txt"), "2024.1\n").unwrap();
}

/// Minimal HTTP server answering every request with
/// `{"version": <current version>}`.
pub struct MetaServer {
    pub base_url: String,
    version: std::sync::Arc<std::sync::Mutex<String>>,
}

impl MetaServer {
    pub fn start(version: &str) -> Self {
        use std::io::{Read, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}/api", listener.local_addr().unwrap());
        let version = std::sync::Arc::new(std::sync::Mutex::new(version.to_string()));

        let served = version.clone();
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let mut buf = [0u8; 4096];
                let mut request = Vec::new();
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let body = serde_json::json!({ "version": *served.lock().unwrap() }).to_string();
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });

        Self { base_url, version }
    }

    pub fn set_version(&self, version: &str) {
        *self.version.lock().unwrap() = version.to_string();
    }
}
