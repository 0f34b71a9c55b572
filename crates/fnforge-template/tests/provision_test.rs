use fnforge_template::error::{FetchError, ProvisionError};
use fnforge_template::fetcher::{FetchSummary, TemplateFetcher, extract_templates};
use fnforge_template::provision::{Provisioned, TemplateProvisioner};
use mockall::mock;
use std::io::{Cursor, Write};
use std::path::Path;
use tempfile::TempDir;

mock! {
    Fetcher {}

    impl TemplateFetcher for Fetcher {
        async fn fetch(
            &self,
            url: &str,
            dest: &Path,
            overwrite: bool,
        ) -> Result<FetchSummary, FetchError>;
    }
}

const URL: &str = "https://example.com/templates.zip";

// ── ensure_templates ──

#[tokio::test]
async fn existing_directory_skips_fetch() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("template");
    std::fs::create_dir(&dir).unwrap();

    let mut mock = MockFetcher::new();
    mock.expect_fetch().never();

    let provisioner = TemplateProvisioner::with_fetcher(mock, &dir);
    let first = provisioner.ensure_templates(URL).await.unwrap();
    let second = provisioner.ensure_templates(URL).await.unwrap();

    assert_eq!(first, Provisioned::AlreadyPresent);
    assert_eq!(second, Provisioned::AlreadyPresent);
}

#[tokio::test]
async fn missing_directory_fetches_once_without_overwrite() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("template");

    let mut mock = MockFetcher::new();
    let expected_dir = dir.clone();
    mock.expect_fetch()
        .times(1)
        .withf(move |url, dest, overwrite| url == URL && *dest == expected_dir && !*overwrite)
        .returning(|_, _, _| {
            Ok(FetchSummary {
                written: 4,
                skipped: 0,
            })
        });

    let provisioner = TemplateProvisioner::with_fetcher(mock, &dir);
    let result = provisioner.ensure_templates(URL).await.unwrap();

    assert_eq!(
        result,
        Provisioned::Fetched(FetchSummary {
            written: 4,
            skipped: 0
        })
    );
}

#[tokio::test]
async fn plain_file_at_template_path_triggers_fetch() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("template");
    std::fs::write(&dir, "not a directory").unwrap();

    let mut mock = MockFetcher::new();
    let expected_dir = dir.clone();
    mock.expect_fetch()
        .times(1)
        .withf(move |_, dest, overwrite| *dest == expected_dir && !*overwrite)
        .returning(|_, _, _| Ok(FetchSummary::default()));

    let provisioner = TemplateProvisioner::with_fetcher(mock, &dir);
    let result = provisioner.ensure_templates(URL).await.unwrap();

    assert_eq!(result, Provisioned::Fetched(FetchSummary::default()));
}

#[tokio::test]
async fn fetch_failure_is_surfaced() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("template");

    let mut mock = MockFetcher::new();
    mock.expect_fetch().returning(|_, dest, _| {
        Err(FetchError::Write {
            path: dest.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        })
    });

    let provisioner = TemplateProvisioner::with_fetcher(mock, &dir);
    let err = provisioner.ensure_templates(URL).await.unwrap_err();

    assert!(matches!(err, ProvisionError::Fetch { ref url, .. } if url == URL));
    assert!(err.to_string().contains("could not pull templates"));
}

// ── extract_templates ──

fn archive(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[test]
fn extract_writes_template_tree_only() {
    let tmp = TempDir::new().unwrap();
    let dest = tmp.path().join("template");
    let bytes = archive(&[
        ("templates-master/README.md", "readme"),
        ("templates-master/template/go/template.yml", "language: go\n"),
        ("templates-master/template/go/Dockerfile", "FROM golang"),
    ]);

    let summary = extract_templates(&bytes, URL, &dest, false).unwrap();

    assert_eq!(summary.written, 2);
    assert!(dest.join("go/template.yml").exists());
    assert!(dest.join("go/Dockerfile").exists());
    assert!(!dest.join("README.md").exists());
}

#[test]
fn extract_keeps_existing_files_without_overwrite() {
    let tmp = TempDir::new().unwrap();
    let dest = tmp.path().join("template");
    std::fs::create_dir_all(dest.join("go")).unwrap();
    std::fs::write(dest.join("go/template.yml"), "local edit").unwrap();
    let bytes = archive(&[("repo-main/template/go/template.yml", "language: go\n")]);

    let summary = extract_templates(&bytes, URL, &dest, false).unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(
        std::fs::read_to_string(dest.join("go/template.yml")).unwrap(),
        "local edit"
    );
}

#[test]
fn extract_overwrites_when_asked() {
    let tmp = TempDir::new().unwrap();
    let dest = tmp.path().join("template");
    std::fs::create_dir_all(dest.join("go")).unwrap();
    std::fs::write(dest.join("go/template.yml"), "local edit").unwrap();
    let bytes = archive(&[("repo-main/template/go/template.yml", "language: go\n")]);

    extract_templates(&bytes, URL, &dest, true).unwrap();

    assert_eq!(
        std::fs::read_to_string(dest.join("go/template.yml")).unwrap(),
        "language: go\n"
    );
}

#[test]
fn extract_without_template_dir_errors() {
    let tmp = TempDir::new().unwrap();
    let bytes = archive(&[("repo-main/README.md", "nothing here")]);

    let err = extract_templates(&bytes, URL, tmp.path(), false).unwrap_err();
    assert!(matches!(err, FetchError::NoTemplates { .. }));
}

#[test]
fn extract_rejects_non_zip_payload() {
    let tmp = TempDir::new().unwrap();
    let err = extract_templates(b"<html>not a zip</html>", URL, tmp.path(), false).unwrap_err();
    assert!(matches!(err, FetchError::Archive { .. }));
}
