use assert_cmd::Command;
use assert_cmd::cargo;
use mockito::{Matcher, Server};
use predicates::prelude::*;
use tempfile::tempdir;

fn gbif(api_url: &str) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("gbif"));
    for var in [
        "GBIF_API_URL",
        "GBIF_MAPS_URL",
        "GBIF_TIMEOUT_SECS",
        "GBIF_CACHE_TTL_SECS",
        "GBIF_USERNAME",
        "GBIF_PASSWORD",
        "GBIF_CLIENT_ID",
        "GBIF_CLIENT_SECRET",
        "GBIF_TOKEN_URL",
    ] {
        cmd.env_remove(var);
    }
    cmd.arg("--api-url").arg(api_url).arg("--no-retry");
    cmd
}

#[test]
fn test_get_with_params() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/species/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "puma".into()),
            Matcher::UrlEncoded("limit".into(), "1".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"count": 1, "results": [{"scientificName": "Puma concolor"}]}"#)
        .create();

    gbif(&server.url())
        .args(["get", "species/search", "-p", "q=puma", "-p", "limit=1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"scientificName\": \"Puma concolor\""));

    mock.assert();
}

#[test]
fn test_occurrence_not_found_prints_error_json() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/occurrence/1")
        .with_status(404)
        .with_body(r#"{"message": "Not found"}"#)
        .create();

    gbif(&server.url())
        .args(["occurrence", "1"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("HTTP error occurred: 404 Not Found"))
        .stdout(predicate::str::contains("\"message\": \"Not found\""));
}

#[test]
fn test_parse_name() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/parser/name")
        .match_query(Matcher::UrlEncoded("name".into(), "Abies alba Mill.".into()))
        .with_status(200)
        .with_body(r#"[{"genusOrAbove": "Abies", "specificEpithet": "alba"}]"#)
        .create();

    gbif(&server.url())
        .args(["parse-name", "Abies alba Mill."])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"specificEpithet\": \"alba\""));

    mock.assert();
}

#[test]
fn test_search_repeats_taxon_key() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/occurrence/search?taxonKey=1&taxonKey=2")
        .with_status(200)
        .with_body(r#"{"count": 0, "results": []}"#)
        .create();

    gbif(&server.url())
        .args(["search", "--taxon-key", "1", "--taxon-key", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"count\": 0"));

    mock.assert();
}

#[test]
fn test_cancel_download_requires_credentials() {
    let server = Server::new();

    gbif(&server.url())
        .args(["cancel-download", "0001"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("requires authentication"));
}

#[test]
fn test_cancel_download_with_basic_auth() {
    let mut server = Server::new();
    let mock = server
        .mock("DELETE", "/occurrence/download/request/0001")
        .match_header("authorization", "Basic dXNlcjpwYXNz")
        .with_status(204)
        .create();

    gbif(&server.url())
        .env("GBIF_USERNAME", "user")
        .env("GBIF_PASSWORD", "pass")
        .args(["cancel-download", "0001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Occurrence download canceled"));

    mock.assert();
}

#[test]
fn test_fetch_download_writes_zip() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/occurrence/download/request/0001")
        .with_status(200)
        .with_body("PK-archive")
        .create();

    let dir = tempdir().unwrap();

    gbif(&server.url())
        .args(["fetch-download", "0001", "-o"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("0001.zip"));

    let saved = std::fs::read_to_string(dir.path().join("0001.zip")).unwrap();
    assert_eq!(saved, "PK-archive");
}

#[test]
fn test_map_summary_rejects_two_primary_params() {
    let server = Server::new();

    gbif(&server.url())
        .arg("--maps-url")
        .arg(server.url())
        .args(["map-summary", "--taxon-key", "1", "--dataset-key", "abc"])
        .assert()
        .failure()
        .stdout(predicate::str::contains(
            "Only one primary search parameter is permitted",
        ));
}

#[test]
fn test_server_error_without_retry() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/occurrence/download/0001")
        .with_status(503)
        .expect(1)
        .create();

    gbif(&server.url())
        .args(["download-status", "0001"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Max retries exceeded"));

    mock.assert();
}

#[test]
fn test_match_name() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/species/match")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("name".into(), "Puma concolor".into()),
            Matcher::UrlEncoded("kingdom".into(), "Animalia".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"usageKey": 2435099, "matchType": "EXACT"}"#)
        .create();

    gbif(&server.url())
        .args(["match-name", "Puma concolor", "--kingdom", "Animalia"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"usageKey\": 2435099"));

    mock.assert();
}

#[test]
fn test_literature_search() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/literature/search?gbifTaxonKey=2435099&q=puma")
        .with_status(200)
        .with_body(r#"{"count": 12, "results": []}"#)
        .create();

    gbif(&server.url())
        .args(["literature", "--q", "puma", "--taxon-key", "2435099"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"count\": 12"));

    mock.assert();
}
