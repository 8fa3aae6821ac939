use anyhow::Result;
use lexiprobe::config::toml_config::{CombineConfig, GroupConfig};
use lexiprobe::{CombinePipeline, LocalStorage, ProbeError, StageEngine};
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, path: &str, content: &str) -> Result<()> {
    let full = root.join(path);
    if let Some(parent) = full.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(full, content)?;
    Ok(())
}

fn read_list(root: &Path, path: &str) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(root.join(path))?;
    Ok(serde_json::from_str(&content)?)
}

fn gender_config() -> CombineConfig {
    CombineConfig {
        source_dirs: vec![
            "outputs/gender_prompt1".to_string(),
            "outputs/gender_prompt2".to_string(),
        ],
        output_dir: "outputs/gender".to_string(),
        groups: vec![
            GroupConfig {
                name: "male".to_string(),
                files: vec!["boys.json".to_string(), "men.json".to_string()],
            },
            GroupConfig {
                name: "female".to_string(),
                files: vec!["girls.json".to_string()],
            },
        ],
    }
}

#[tokio::test]
async fn test_groups_are_written_in_source_order() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();

    write(root, "outputs/gender_prompt1/boys.json", r#"{"a": "strong", "b": "brave"}"#)?;
    write(root, "outputs/gender_prompt1/men.json", r#"{"a": "tall"}"#)?;
    write(root, "outputs/gender_prompt1/girls.json", r#"{"c": "kind"}"#)?;
    write(root, "outputs/gender_prompt2/boys.json", r#"{"z": "loud"}"#)?;
    write(root, "outputs/gender_prompt2/men.json", r#"{"y": "strong"}"#)?;
    write(root, "outputs/gender_prompt2/girls.json", r#"{"x": "gentle", "w": "kind"}"#)?;

    let storage = LocalStorage::new(root.to_str().unwrap().to_string());
    let pipeline = CombinePipeline::new(storage, gender_config());
    let output_dir = StageEngine::new(pipeline).run().await?;
    assert_eq!(output_dir, "outputs/gender");

    let male = read_list(root, "outputs/gender/male.json")?;
    let female = read_list(root, "outputs/gender/female.json")?;

    assert_eq!(male, vec!["strong", "brave", "tall", "loud", "strong"]);
    assert_eq!(female, vec!["kind", "gentle", "kind"]);
    Ok(())
}

#[tokio::test]
async fn test_non_ascii_words_survive_combine() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();

    write(root, "in/girls.json", r#"{"1": "naïve", "2": "溫柔"}"#)?;

    let config = CombineConfig {
        source_dirs: vec!["in".to_string()],
        output_dir: "out".to_string(),
        groups: vec![GroupConfig {
            name: "female".to_string(),
            files: vec!["girls.json".to_string()],
        }],
    };
    let storage = LocalStorage::new(root.to_str().unwrap().to_string());
    StageEngine::new(CombinePipeline::new(storage, config)).run().await?;

    let raw = std::fs::read_to_string(root.join("out/female.json"))?;
    assert!(raw.contains("溫柔"));
    assert_eq!(read_list(root, "out/female.json")?, vec!["naïve", "溫柔"]);
    Ok(())
}

#[tokio::test]
async fn test_missing_value_file_is_fatal() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();

    write(root, "outputs/gender_prompt1/boys.json", r#"{"a": "strong"}"#)?;

    let storage = LocalStorage::new(root.to_str().unwrap().to_string());
    let err = StageEngine::new(CombinePipeline::new(storage, gender_config()))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, ProbeError::IoError(_)));
    assert!(!root.join("outputs/gender/male.json").exists());
    Ok(())
}
