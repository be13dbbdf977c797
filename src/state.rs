use crate::config::LabelsConfig;
use std::{
    fs::File,
    io::{self, BufRead},
    path::PathBuf,
};

pub trait State: Send + Sync + 'static {
    fn new(labels_cfg: Option<&LabelsConfig>) -> Result<Self, String>
    where
        Self: Sized;
    fn label_for(&self, index: usize) -> Option<&str>;
    fn has_labels(&self) -> bool;
}

/// Holds the ordered index-to-label mapping for the loaded classifier.
/// When no labels file is configured the service reports raw class indices.
#[derive(Debug)]
pub struct ServiceState {
    class_labels: Option<Vec<String>>,
}

impl State for ServiceState {
    fn new(labels_cfg: Option<&LabelsConfig>) -> Result<ServiceState, String> {
        let class_labels = match labels_cfg {
            Some(cfg) => match load_class_labels(&cfg.get_path()) {
                Ok(labels) => Some(labels),
                Err(e) => return Err(format!("Failed to load labels: {}", e)),
            },
            None => None,
        };

        Ok(ServiceState { class_labels })
    }

    fn label_for(&self, index: usize) -> Option<&str> {
        self.class_labels
            .as_ref()
            .and_then(|labels| labels.get(index))
            .map(|s| s.as_str())
    }

    fn has_labels(&self) -> bool {
        self.class_labels.is_some()
    }
}

pub fn load_class_labels(filepath: &PathBuf) -> io::Result<Vec<String>> {
    let file = File::open(filepath)?;
    parse_class_labels(io::BufReader::new(file))
}

fn parse_class_labels<R: BufRead>(reader: R) -> io::Result<Vec<String>> {
    let mut labels = Vec::new();

    for line_result in reader.lines() {
        let line = line_result?;
        let label = line.trim();
        if label.is_empty() {
            continue;
        }
        labels.push(label.to_string());
    }

    if labels.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "labels file contains no labels",
        ));
    }

    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_class_labels() {
        let input = Cursor::new("Glioma\nMeningioma\nNo Tumor\nPituitary\n");
        let labels = parse_class_labels(input).unwrap();

        assert_eq!(labels, vec!["Glioma", "Meningioma", "No Tumor", "Pituitary"]);
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let input = Cursor::new("Glioma\n\n  \nMeningioma\n");
        let labels = parse_class_labels(input).unwrap();

        assert_eq!(labels, vec!["Glioma", "Meningioma"]);
    }

    #[test]
    fn test_parse_rejects_empty_file() {
        let input = Cursor::new("");
        assert!(parse_class_labels(input).is_err());
    }

    #[test]
    fn test_state_without_labels_reports_none() {
        let state = ServiceState::new(None).unwrap();

        assert!(!state.has_labels());
        assert!(state.label_for(0).is_none());
    }
}
