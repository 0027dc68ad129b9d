//! Checks build-info documents produced elsewhere.

use std::path::Path;

use anyhow::Context;
use build_info::BuildInfo;

/// Read, parse and check the document at `path`, returning a one-line summary.
pub fn validate_document(path: &Path) -> anyhow::Result<String> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let build = BuildInfo::from_json(&raw)
        .with_context(|| format!("parsing {}", path.display()))?;
    summarize(&build)
}

fn summarize(build: &BuildInfo) -> anyhow::Result<String> {
    build.validate()?;
    let started = build.started_at()?;

    Ok(format!(
        "{} #{} started {} ({} modules)",
        build.name,
        build.number,
        started.to_rfc3339(),
        build.modules.as_ref().map_or(0, Vec::len)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use build_info::BuildInfoError;
    use std::io::Write;

    fn document(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_valid_document() {
        let file = document(
            r#"{
                "name": "app",
                "number": "17",
                "started": "2024-01-01T00:00:00.000+0000",
                "modules": [{ "id": "core" }, { "id": "web" }]
            }"#,
        );
        let summary = validate_document(file.path()).unwrap();
        assert_eq!(summary, "app #17 started 2024-01-01T00:00:00+00:00 (2 modules)");
    }

    #[test]
    fn test_blank_number_is_rejected() {
        let file = document(
            r#"{ "name": "app", "number": " ", "started": "2024-01-01T00:00:00.000+0000" }"#,
        );
        let err = validate_document(file.path()).unwrap_err();
        assert_eq!(err.to_string(), "Build number must be set");
    }

    #[test]
    fn test_malformed_start_is_rejected() {
        let file = document(r#"{ "name": "app", "number": "17", "started": "last tuesday" }"#);
        let err = validate_document(file.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildInfoError>(),
            Some(BuildInfoError::StartedFormat { .. })
        ));
    }

    #[test]
    fn test_unreadable_document() {
        let file = document("not json");
        let err = validate_document(file.path()).unwrap_err();
        assert!(err.to_string().starts_with("parsing "));

        let missing = Path::new("/nonexistent/build-info.json");
        let err = validate_document(missing).unwrap_err();
        assert!(err.to_string().starts_with("reading "));
    }
}
