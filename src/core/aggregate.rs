use crate::core::Storage;
use crate::utils::error::{ProbeError, Result};

/// Appends the values of every listed JSON object, in list order and in
/// each object's key order. Values must be strings; numbers, booleans and
/// nested values are rejected rather than stringified. Any missing or
/// malformed file fails the call.
pub async fn combine<S: Storage>(
    storage: &S,
    source_dir: &str,
    filenames: &[String],
) -> Result<Vec<String>> {
    let mut combined = Vec::new();

    for filename in filenames {
        let path = format!("{}/{}", source_dir.trim_end_matches('/'), filename);
        let bytes = storage.read_file(&path).await?;

        let value: serde_json::Value = serde_json::from_slice(&bytes)?;
        let serde_json::Value::Object(object) = value else {
            return Err(ProbeError::ValidationError {
                message: format!("{} must be a JSON object mapping keys to word strings", path),
            });
        };

        for (key, value) in object {
            match value {
                serde_json::Value::String(text) => combined.push(text),
                other => {
                    return Err(ProbeError::ValidationError {
                        message: format!(
                            "{}: value of '{}' is {}, but every value must be a word string",
                            path, key, other
                        ),
                    })
                }
            }
        }

        tracing::debug!("📂 Combined {} ({} words so far)", path, combined.len());
    }

    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn with_files(files: &[(&str, &str)]) -> Self {
            Self {
                files: Arc::new(Mutex::new(
                    files
                        .iter()
                        .map(|(p, c)| (p.to_string(), c.as_bytes().to_vec()))
                        .collect(),
                )),
            }
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                ProbeError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        async fn exists(&self, path: &str) -> bool {
            self.files.lock().await.contains_key(path)
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_combine_preserves_file_and_key_order() {
        let storage = MockStorage::with_files(&[
            ("in/boys.json", r#"{"z": "strong", "a": "brave"}"#),
            ("in/men.json", r#"{"m": "tall"}"#),
        ]);

        let words = combine(&storage, "in/", &names(&["boys.json", "men.json"]))
            .await
            .unwrap();
        assert_eq!(words, vec!["strong", "brave", "tall"]);
    }

    #[tokio::test]
    async fn test_combine_length_is_sum_of_values() {
        let storage = MockStorage::with_files(&[
            ("in/a.json", r#"{"1": "x", "2": "y", "3": "x"}"#),
            ("in/b.json", r#"{}"#),
            ("in/c.json", r#"{"1": "z"}"#),
        ]);

        let words = combine(&storage, "in", &names(&["a.json", "b.json", "c.json"]))
            .await
            .unwrap();
        assert_eq!(words.len(), 4);
    }

    #[tokio::test]
    async fn test_missing_file_fails_whole_combine() {
        let storage = MockStorage::with_files(&[("in/a.json", r#"{"1": "x"}"#)]);

        let err = combine(&storage, "in", &names(&["a.json", "missing.json"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::IoError(_)));
    }

    #[tokio::test]
    async fn test_malformed_inputs_fail() {
        let storage = MockStorage::with_files(&[
            ("in/broken.json", "{not json"),
            ("in/array.json", r#"["a", "b"]"#),
            ("in/nested.json", r#"{"a": ["x"]}"#),
        ]);

        assert!(matches!(
            combine(&storage, "in", &names(&["broken.json"])).await,
            Err(ProbeError::SerializationError(_))
        ));
        assert!(matches!(
            combine(&storage, "in", &names(&["array.json"])).await,
            Err(ProbeError::ValidationError { .. })
        ));
        assert!(matches!(
            combine(&storage, "in", &names(&["nested.json"])).await,
            Err(ProbeError::ValidationError { .. })
        ));
    }

    #[tokio::test]
    async fn test_non_string_value_error_names_the_rule() {
        let storage = MockStorage::with_files(&[("in/scores.json", r#"{"1": "brave", "2": 7, "3": true}"#)]);

        let err = combine(&storage, "in", &names(&["scores.json"])).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("in/scores.json"));
        assert!(message.contains("'2' is 7"));
        assert!(message.contains("must be a word string"));
        assert!(err.recovery_suggestion().contains("word strings"));
    }
}
