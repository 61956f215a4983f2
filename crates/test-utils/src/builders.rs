#![allow(dead_code)]

use asmpipe::config::{
    ConfigFile, InputsSpec, RawConfigFile, ResourceSection, RuleSpec, StageConfig,
};
use asmpipe::errors::Result;
use asmpipe::types::{HistoryMode, StageKind};

/// Builder for `ConfigFile` to simplify test setup.
pub struct PipelineConfigBuilder {
    config: RawConfigFile,
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn root(mut self, root: &str) -> Self {
        self.config.catalog.root = root.to_string();
        self
    }

    pub fn suffix(mut self, suffix: &str) -> Self {
        self.config.catalog.suffixes.push(suffix.to_string());
        self
    }

    pub fn max_jobs(mut self, n: usize) -> Self {
        self.config.config.max_jobs = n;
        self
    }

    pub fn history(mut self, mode: HistoryMode) -> Self {
        self.config.config.history = mode;
        self
    }

    pub fn default_cpus(mut self, cpus: u32) -> Self {
        self.config.default.cpus = Some(cpus);
        self
    }

    pub fn stage(mut self, stage: StageConfig) -> Self {
        self.config.stage.push(stage);
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for PipelineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for one `[[stage]]` entry.
pub struct StageConfigBuilder {
    stage: StageConfig,
}

impl StageConfigBuilder {
    pub fn new(name: &str, kind: StageKind) -> Self {
        Self {
            stage: StageConfig {
                name: name.to_string(),
                kind,
                inputs: None,
                rules: Vec::new(),
                variant: None,
                outputs: Vec::new(),
                script: format!("scripts/{name}"),
                job_name: None,
                resources: ResourceSection::default(),
                follows: Vec::new(),
                required: false,
            },
        }
    }

    pub fn originate(name: &str) -> Self {
        Self::new(name, StageKind::Originate)
    }

    pub fn transform(name: &str) -> Self {
        Self::new(name, StageKind::Transform)
    }

    pub fn collate(name: &str) -> Self {
        Self::new(name, StageKind::Collate)
    }

    pub fn subdivide(name: &str) -> Self {
        Self::new(name, StageKind::Subdivide)
    }

    pub fn merge(name: &str) -> Self {
        Self::new(name, StageKind::Merge)
    }

    pub fn from_root(mut self) -> Self {
        self.stage.inputs = Some(InputsSpec::One("root".to_string()));
        self
    }

    pub fn from_stage(mut self, producer: &str) -> Self {
        self.stage.inputs = Some(InputsSpec::One(producer.to_string()));
        self
    }

    pub fn from_stages(mut self, producers: &[&str]) -> Self {
        self.stage.inputs = Some(InputsSpec::Many(
            producers.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    pub fn regex(mut self, pattern: &str) -> Self {
        self.stage.rules.push(RuleSpec::Regex(pattern.to_string()));
        self
    }

    pub fn suffix(mut self, literal: &str) -> Self {
        self.stage.rules.push(RuleSpec::Suffix(literal.to_string()));
        self
    }

    pub fn fixed(mut self, literal: &str) -> Self {
        self.stage.rules.push(RuleSpec::Fixed(literal.to_string()));
        self
    }

    pub fn variant(mut self, field: &str) -> Self {
        self.stage.variant = Some(field.to_string());
        self
    }

    pub fn output(mut self, template: &str) -> Self {
        self.stage.outputs.push(template.to_string());
        self
    }

    pub fn script(mut self, script: &str) -> Self {
        self.stage.script = script.to_string();
        self
    }

    pub fn job_name(mut self, name: &str) -> Self {
        self.stage.job_name = Some(name.to_string());
        self
    }

    pub fn cpus(mut self, cpus: u32) -> Self {
        self.stage.resources.cpus = Some(cpus);
        self
    }

    pub fn mem_mb(mut self, mem: u64) -> Self {
        self.stage.resources.mem_mb = Some(mem);
        self
    }

    pub fn follows(mut self, stage: &str) -> Self {
        self.stage.follows.push(stage.to_string());
        self
    }

    pub fn required(mut self) -> Self {
        self.stage.required = true;
        self
    }

    pub fn build(self) -> StageConfig {
        self.stage
    }
}
