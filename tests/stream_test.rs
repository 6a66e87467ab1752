//! Integration tests for the ranged download route.

mod common;

use common::{content, test_config, TestHarness, CHUNK};
use serde_json::Value;

#[tokio::test]
async fn full_download_returns_whole_file() {
    let (h, addr) = TestHarness::with_server().await;
    let data = content(3 * CHUNK + 100);
    let token = h.insert_video("Movie.2023.[@Group].mkv", data.clone());

    let resp = reqwest::Client::new()
        .get(format!("http://{addr}/dl/{token}/video.mkv"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let headers = resp.headers().clone();
    assert_eq!(headers["content-type"], "video/x-matroska");
    assert_eq!(headers["accept-ranges"], "bytes");
    assert_eq!(headers["content-length"], data.len().to_string().as_str());
    assert!(headers.get("content-range").is_none());
    assert_eq!(
        headers["content-disposition"],
        "inline; filename=\"Movie.2023.mkv\"; filename*=UTF-8''Movie.2023.mkv"
    );

    let body = resp.bytes().await.unwrap();
    assert_eq!(body.as_ref(), data.as_slice());
    h.wait_for_idle().await;
}

#[tokio::test]
async fn whole_range_matches_full_download() {
    let (h, addr) = TestHarness::with_server().await;
    let data = content(2 * CHUNK + 17);
    let token = h.insert_video("clip.mkv", data.clone());
    let client = reqwest::Client::new();
    let url = format!("http://{addr}/dl/{token}/clip.mkv");

    let full = client.get(&url).send().await.unwrap();
    assert_eq!(full.status(), 200);
    let full = full.bytes().await.unwrap();

    let ranged = client
        .get(&url)
        .header("Range", "bytes=0-")
        .send()
        .await
        .unwrap();
    assert_eq!(ranged.status(), 206);
    assert_eq!(
        ranged.headers()["content-range"],
        format!("bytes 0-{}/{}", data.len() - 1, data.len()).as_str()
    );
    let ranged = ranged.bytes().await.unwrap();

    assert_eq!(full, ranged);
    h.wait_for_idle().await;
}

#[tokio::test]
async fn unaligned_range_returns_exact_slice() {
    let (h, addr) = TestHarness::with_server().await;
    let data = content(4 * CHUNK);
    let token = h.insert_video("clip.mkv", data.clone());

    let start = CHUNK - 10;
    let end = 2 * CHUNK + 9;
    let resp = reqwest::Client::new()
        .get(format!("http://{addr}/dl/{token}/clip.mkv"))
        .header("Range", format!("bytes={start}-{end}"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 206);
    assert_eq!(
        resp.headers()["content-range"],
        format!("bytes {start}-{end}/{}", data.len()).as_str()
    );
    assert_eq!(
        resp.headers()["content-length"],
        (end - start + 1).to_string().as_str()
    );
    let body = resp.bytes().await.unwrap();
    assert_eq!(body.as_ref(), &data[start..=end]);
    h.wait_for_idle().await;
}

#[tokio::test]
async fn suffix_range_returns_tail() {
    let (h, addr) = TestHarness::with_server().await;
    let data = content(CHUNK + 500);
    let token = h.insert_video("clip.mkv", data.clone());

    let resp = reqwest::Client::new()
        .get(format!("http://{addr}/dl/{token}/clip.mkv"))
        .header("Range", "bytes=-600")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 206);
    let body = resp.bytes().await.unwrap();
    assert_eq!(body.as_ref(), &data[data.len() - 600..]);
}

#[tokio::test]
async fn unsatisfiable_range_returns_416() {
    let (h, addr) = TestHarness::with_server().await;
    let data = content(1000);
    let token = h.insert_video("clip.mkv", data);

    let resp = reqwest::Client::new()
        .get(format!("http://{addr}/dl/{token}/clip.mkv"))
        .header("Range", "bytes=1000-")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 416);
    assert_eq!(resp.headers()["content-range"], "bytes */1000");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "range_not_satisfiable");

    // The lease taken for the request is returned.
    h.wait_for_idle().await;
}

#[tokio::test]
async fn malformed_range_is_ignored() {
    let (h, addr) = TestHarness::with_server().await;
    let data = content(CHUNK);
    let token = h.insert_video("clip.mkv", data.clone());

    let resp = reqwest::Client::new()
        .get(format!("http://{addr}/dl/{token}/clip.mkv"))
        .header("Range", "bytes=0-10,20-30")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.bytes().await.unwrap().len(), data.len());
}

#[tokio::test]
async fn invalid_token_returns_400() {
    let (_h, addr) = TestHarness::with_server().await;

    let resp = reqwest::Client::new()
        .get(format!("http://{addr}/dl/not*a*token/clip.mkv"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "decode_error");
}

#[tokio::test]
async fn missing_message_returns_404() {
    let (h, addr) = TestHarness::with_server().await;

    // Bare message ids resolve against the default chat.
    let resp = reqwest::Client::new()
        .get(format!("http://{addr}/dl/424242/clip.mkv"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 404);
    h.wait_for_idle().await;
}

#[tokio::test]
async fn bare_message_id_streams_from_default_chat() {
    let (h, addr) = TestHarness::with_server().await;
    let data = content(700);
    let message = h
        .store
        .insert_file(
            common::CHAT,
            reelgate_fileid::MediaKind::Document,
            "notes.bin",
            "application/octet-stream",
            data.clone(),
            None,
        )
        .unwrap();

    let resp = reqwest::Client::new()
        .get(format!("http://{addr}/dl/{}/notes.bin", message.message_id))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.bytes().await.unwrap().as_ref(), data.as_slice());
}

#[tokio::test]
async fn empty_pool_returns_503() {
    let (_h, addr) = TestHarness::with_server_options(test_config(), 0, None).await;

    let resp = reqwest::Client::new()
        .get(format!("http://{addr}/dl/1/clip.mkv"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 503);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "pool_exhausted");
}

#[tokio::test]
async fn transient_fetch_failure_is_retried() {
    let (h, addr) = TestHarness::with_server().await;
    let data = content(2 * CHUNK);
    let token = h.insert_video("clip.mkv", data.clone());
    h.store.fail_next_fetches(1);

    let resp = reqwest::Client::new()
        .get(format!("http://{addr}/dl/{token}/clip.mkv"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.bytes().await.unwrap().as_ref(), data.as_slice());
}

#[tokio::test]
async fn first_chunk_failure_returns_502() {
    let (h, addr) = TestHarness::with_server().await;
    let token = h.insert_video("clip.mkv", content(2 * CHUNK));
    h.store.fail_next_fetches(2);

    let resp = reqwest::Client::new()
        .get(format!("http://{addr}/dl/{token}/clip.mkv"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 502);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "stream_error");
    h.wait_for_idle().await;
}

#[tokio::test]
async fn unknown_size_streams_without_length() {
    let (h, addr) = TestHarness::with_server().await;
    let data = content(CHUNK + 33);
    let token = h.insert_video_sized("clip.mkv", data.clone(), Some(0));

    let resp = reqwest::Client::new()
        .get(format!("http://{addr}/dl/{token}/clip.mkv"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert!(resp.headers().get("content-length").is_none());
    assert_eq!(resp.bytes().await.unwrap().as_ref(), data.as_slice());
}

#[tokio::test]
async fn disconnects_release_every_lease() {
    let (h, addr) = TestHarness::with_server().await;
    let token = h.insert_video("big.mkv", content(256 * CHUNK));
    let url = format!("http://{addr}/dl/{token}/big.mkv");

    for _ in 0..100 {
        let mut resp = reqwest::Client::new().get(&url).send().await.unwrap();
        assert_eq!(resp.status(), 200);
        let first = resp.chunk().await.unwrap();
        assert!(first.is_some());
        drop(resp);
    }

    h.wait_for_idle().await;
    assert!(h.pool().snapshot().iter().all(|(_, load)| *load == 0));
}

#[tokio::test]
async fn concurrent_streams_spread_across_credentials() {
    let (h, addr) = TestHarness::with_server().await;
    let token = h.insert_video("big.mkv", content(256 * CHUNK));
    let url = format!("http://{addr}/dl/{token}/big.mkv");
    h.store.set_fetch_delay(Some(std::time::Duration::from_millis(20)));

    let client = reqwest::Client::new();
    let first = client.get(&url).send().await.unwrap();
    let second = client.get(&url).send().await.unwrap();
    assert_eq!(first.status(), 200);
    assert_eq!(second.status(), 200);

    let loads: Vec<usize> = h.pool().snapshot().into_iter().map(|(_, l)| l).collect();
    assert_eq!(loads, vec![1, 1]);

    drop(first);
    drop(second);
    h.wait_for_idle().await;
}
