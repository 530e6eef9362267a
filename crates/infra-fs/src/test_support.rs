// Deposit directories on disk for adapter tests

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const DEPOSIT_ID: &str = "7f4b5a3c-1d2e-4f60-8a9b-0c1d2e3f4a5b";

pub struct DepositFixture {
    id: String,
    properties: String,
    bag_info: String,
    dataset: Option<String>,
    files: Vec<(String, String)>,
}

pub struct WrittenDeposit {
    // Keeps the directory alive for the duration of the test
    pub _tmp: TempDir,
    pub root: PathBuf,
    pub dir: PathBuf,
}

impl DepositFixture {
    pub fn new() -> Self {
        Self {
            id: DEPOSIT_ID.to_string(),
            properties: format!(
                "state.label=SUBMITTED\ndepositor.userId=user001\ndataverse.sword-token=sword:{}\n",
                DEPOSIT_ID
            ),
            bag_info: "Bagging-Date: 2020-02-15\nCreated: 2020-02-15T08:01:00.000+01:00\n"
                .to_string(),
            dataset: Some(
                r#"{"title": "Survey 2020", "description": "Raw data", "authors": ["A. Author"], "license": "CC0-1.0"}"#
                    .to_string(),
            ),
            files: vec![],
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn with_properties(mut self, properties: &str) -> Self {
        self.properties = properties.to_string();
        self
    }

    pub fn with_bag_info(mut self, bag_info: &str) -> Self {
        self.bag_info = bag_info.to_string();
        self
    }

    pub fn with_dataset(mut self, dataset: Option<&str>) -> Self {
        self.dataset = dataset.map(str::to_string);
        self
    }

    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.push((path.to_string(), content.to_string()));
        self
    }

    pub fn write(self) -> WrittenDeposit {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().to_path_buf();
        let dir = self.write_into(&root);
        WrittenDeposit {
            _tmp: tmp,
            root,
            dir,
        }
    }

    /// Write the deposit as a sub-directory of `root`
    pub fn write_into(self, root: &Path) -> PathBuf {
        let dir = root.join(&self.id);
        let bag = dir.join("bag");
        fs::create_dir_all(bag.join("data")).unwrap();
        fs::write(dir.join("deposit.properties"), &self.properties).unwrap();
        fs::write(bag.join("bag-info.txt"), &self.bag_info).unwrap();

        if let Some(dataset) = &self.dataset {
            fs::create_dir_all(bag.join("metadata")).unwrap();
            fs::write(bag.join("metadata/dataset.json"), dataset).unwrap();
        }

        if !self.files.is_empty() {
            let mut manifest = String::new();
            for (path, content) in &self.files {
                let file = bag.join(path);
                fs::create_dir_all(file.parent().unwrap()).unwrap();
                fs::write(&file, content).unwrap();
                manifest.push_str(&format!("{:040x}  {}\n", content.len(), path));
            }
            fs::write(bag.join("manifest-sha1.txt"), manifest).unwrap();
        }
        dir
    }
}
