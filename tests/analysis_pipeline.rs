use assert_fs::prelude::*;
use predicates::prelude::*;

use cloudready::config::Config;
use cloudready::core::{AnalyzeOptions, Engine, FileRecord, LocalCrawler, CloudReadinessAnalyzer};

fn fixture_repo() -> assert_fs::TempDir {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("Dockerfile")
        .write_str("FROM node:20\nWORKDIR /srv\nCMD [\"node\", \"server.js\"]\n")
        .unwrap();
    temp.child("docker-compose.yml")
        .write_str("services:\n  web:\n    build: .\n")
        .unwrap();
    temp.child("package.json")
        .write_str("{\"dependencies\": {\"express\": \"^4.19.0\"}}\n")
        .unwrap();
    temp.child("server.js")
        .write_str(
            "const express = require('express');\n\
             const app = express();\n\
             const port = process.env.PORT;\n\
             app.get('/health', (req, res) => res.send('ok'));\n\
             app.listen(port);\n",
        )
        .unwrap();
    temp.child("config/settings.js")
        .write_str("module.exports = { apiKey: process.env.API_KEY, region: process.env.AWS_REGION };\n")
        .unwrap();
    temp.child("node_modules/express/index.js")
        .write_str("module.exports = function express() {};\n")
        .unwrap();
    temp
}

#[test]
fn crawler_skips_excluded_directories() {
    let repo = fixture_repo();
    let files = LocalCrawler::new(repo.path(), &Config::default().crawl).crawl().unwrap();
    let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();

    assert!(paths.contains(&"server.js"));
    assert!(paths.contains(&"config/settings.js"));
    assert!(!paths.iter().any(|p| p.starts_with("node_modules/")));
}

#[tokio::test]
async fn analyzer_report_reflects_fixture() {
    let repo = fixture_repo();
    let config = Config::default();
    let files: Vec<FileRecord> = LocalCrawler::new(repo.path(), &config.crawl).crawl().unwrap();

    let report = CloudReadinessAnalyzer::new(&config.analysis)
        .analyze(files, "fixture", false)
        .await
        .unwrap();

    assert_eq!(report.files_analyzed, 5);
    assert!(report.environment_variables.variables.contains("PORT"));
    assert!(report.overall_score <= 100);
    assert!(report.recommendations.iter().any(|r| r.category == "ci_cd"));
}

#[tokio::test]
async fn engine_writes_json_and_markdown_reports() {
    let repo = fixture_repo();
    let out = assert_fs::TempDir::new().unwrap();

    let engine = Engine::with_config(Config::default());
    engine
        .analyze(AnalyzeOptions {
            source: Some(repo.path().to_path_buf()),
            project_name: Some("fixture".to_string()),
            output: Some(out.path().to_path_buf()),
            format: Some("both".to_string()),
            ..AnalyzeOptions::default()
        })
        .await
        .unwrap();

    let json = out.child("fixture/cloud_readiness.json");
    json.assert(predicate::path::exists());
    json.assert(predicate::str::contains("\"project_name\": \"fixture\""));
    json.assert(predicate::str::contains("\"max_scores\""));
    json.assert(predicate::str::contains("\"readiness_level\""));

    out.child("fixture/cloud_readiness.md")
        .assert(predicate::str::starts_with("# Cloud Readiness Report: fixture"));
}

#[tokio::test]
async fn engine_rejects_empty_source() {
    let repo = assert_fs::TempDir::new().unwrap();
    let out = assert_fs::TempDir::new().unwrap();

    let engine = Engine::with_config(Config::default());
    let result = engine
        .analyze(AnalyzeOptions {
            source: Some(repo.path().to_path_buf()),
            output: Some(out.path().to_path_buf()),
            ..AnalyzeOptions::default()
        })
        .await;

    assert!(result.is_err());
    out.child("fixture").assert(predicate::path::missing());
}
