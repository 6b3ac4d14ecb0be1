use std::fs;
use std::path::PathBuf;

pub struct FilePoolConfiguration {
    pub root: Option<PathBuf>,
    pub hash_seed: u64,
}

pub struct FilePoolConfigurationBuilder {
    config: FilePoolConfiguration,
}

impl FilePoolConfigurationBuilder {
    fn new(config: FilePoolConfiguration) -> Self {
        Self {
            config
        }
    }

    pub fn set_root(mut self, root: impl Into<PathBuf>) -> FilePoolConfigurationBuilder {
        self.config.root = Some(root.into());
        self
    }

    pub fn set_hash_seed(mut self, hash_seed: u64) -> FilePoolConfigurationBuilder {
        self.config.hash_seed = hash_seed;
        self
    }

    pub fn create_dir(self, create: bool) -> FilePoolConfigurationBuilder {
        if create {
            let root = self.config.root.as_ref().expect("pool root not set");
            if !root.exists() {
                let result = fs::create_dir_all(root);
                if let Err(e) = result {
                    panic!("{}", e);
                }
            }
        }
        self
    }

    pub fn build(self) -> FilePoolConfiguration {
        self.validate()
    }

    fn validate(self) -> FilePoolConfiguration {
        if self.config.root == None {
            panic!("pool root not set");
        }

        self.config
    }
}

impl FilePoolConfiguration {
    pub fn new() -> FilePoolConfigurationBuilder {
        let config = FilePoolConfiguration {
            root: None,
            hash_seed: 0,
        };
        FilePoolConfigurationBuilder::new(config)
    }
}
