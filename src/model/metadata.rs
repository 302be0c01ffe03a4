use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};

use crate::settings::ModelSettings;

/// Either a bare JSON array of class names or an object with a `classes` array.
#[derive(Deserialize)]
#[serde(untagged)]
enum LabelsFile {
    List(Vec<String>),
    Encoder { classes: Vec<String> },
}

#[derive(Debug, Default, Deserialize)]
struct InfoFile {
    #[serde(default)]
    num_classes: Option<usize>,
}

/// Class labels and model facts that live next to the model graph.
#[derive(Debug, Clone)]
pub struct ModelMetadata {
    pub class_names: Vec<String>,
    pub num_classes: usize,
}

impl ModelMetadata {
    pub fn load(settings: &ModelSettings) -> Result<Self> {
        let labels_path = settings.labels_path();
        let info_path = settings.info_path();

        let class_names = match read_json::<LabelsFile>(&labels_path)? {
            LabelsFile::List(names) => names,
            LabelsFile::Encoder { classes } => classes,
        };
        let info: InfoFile = read_json(&info_path)?;

        let num_classes = class_names.len();
        if let Some(expected) = info.num_classes.filter(|&n| n != num_classes) {
            log::warn!(
                "class count mismatch: {} declares {}, {} has {}",
                info_path.display(),
                expected,
                labels_path.display(),
                num_classes
            );
        }

        log::info!("Loaded {} class labels from {}", num_classes, labels_path.display());

        Ok(Self {
            class_names,
            num_classes,
        })
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Invalid JSON in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn model_dir(labels: &str, info: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("signcapture-model-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("labels.json"), labels).unwrap();
        fs::write(dir.join("model_info.json"), info).unwrap();
        dir
    }

    fn settings(dir: PathBuf) -> ModelSettings {
        ModelSettings {
            model_dir: dir,
            ..ModelSettings::default()
        }
    }

    #[test]
    fn loads_both_label_layouts() {
        let dir = model_dir(r#"["hola", "gracias"]"#, r#"{"num_classes": 2}"#);
        let meta = ModelMetadata::load(&settings(dir.clone())).unwrap();
        assert_eq!(meta.class_names, vec!["hola", "gracias"]);
        fs::remove_dir_all(dir).ok();

        let dir = model_dir(r#"{"classes": ["a", "b", "c"]}"#, "{}");
        let meta = ModelMetadata::load(&settings(dir.clone())).unwrap();
        assert_eq!(meta.num_classes, 3);
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn count_mismatch_trusts_the_labels() {
        let dir = model_dir(r#"["a", "b"]"#, r#"{"num_classes": 5}"#);
        let meta = ModelMetadata::load(&settings(dir.clone())).unwrap();
        assert_eq!(meta.num_classes, 2);
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn missing_files_are_errors() {
        let dir = std::env::temp_dir().join(format!("signcapture-empty-{}", uuid::Uuid::new_v4()));
        assert!(ModelMetadata::load(&settings(dir)).is_err());
    }
}
