//! Data-only description of the remote training pipeline that consumes the
//! prepared artifacts. Nothing here talks to a platform: descriptors are
//! validated and serialized for an external orchestrator to submit.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::orchestration::{
    BEST_PARAMS_OUTPUT, BEST_STEP, DEFAULT_COMPUTE_TARGET, DEFAULT_TRAIN_SCRIPT, MODEL_OUTPUT,
    REGISTER_STEP, RETRAIN_STEP, TUNE_RUN_OUTPUT, TUNE_STEP,
};
use crate::errors::PairsError;
use crate::pipeline::ArtifactName;
use crate::types::StepName;

/// Identity of the remote workspace, passed explicitly to whatever needs it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Billing subscription owning the workspace.
    pub subscription_id: String,
    /// Resource group holding the workspace.
    pub resource_group: String,
    /// Workspace the steps run in.
    pub workspace_name: String,
    /// Optional region hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl WorkspaceConfig {
    /// Load and validate a workspace description from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, PairsError> {
        let bytes = fs::read(path)?;
        let config: Self = serde_json::from_slice(&bytes)?;
        config.validate()?;
        Ok(config)
    }

    /// Require every identity field to be non-blank.
    pub fn validate(&self) -> Result<(), PairsError> {
        for (field, value) in [
            ("subscription_id", &self.subscription_id),
            ("resource_group", &self.resource_group),
            ("workspace_name", &self.workspace_name),
        ] {
            if value.trim().is_empty() {
                return Err(PairsError::Configuration(format!(
                    "workspace {field} is required"
                )));
            }
        }
        Ok(())
    }
}

/// Named argument value handed to a step script.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepArgument {
    /// Whole-number argument.
    Integer(i64),
    /// Floating-point argument.
    Float(f64),
    /// Free-form string argument.
    Text(String),
}

impl From<i64> for StepArgument {
    fn from(value: i64) -> Self {
        StepArgument::Integer(value)
    }
}

impl From<f64> for StepArgument {
    fn from(value: f64) -> Self {
        StepArgument::Float(value)
    }
}

impl From<&str> for StepArgument {
    fn from(value: &str) -> Self {
        StepArgument::Text(value.to_string())
    }
}

/// Where a step reads one of its inputs from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepInput {
    /// A table produced by the local preparation pipeline.
    Artifact {
        /// Table to read.
        artifact: ArtifactName,
    },
    /// A named output of an upstream step.
    StepOutput {
        /// Producing step.
        step: StepName,
        /// Output name declared by that step.
        output: String,
    },
}

/// One remote script invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RemoteStep {
    /// Unique step name within the pipeline.
    pub name: StepName,
    /// Script the step runs.
    pub script: PathBuf,
    /// Compute target the script runs on.
    pub compute_target: String,
    /// Named script arguments.
    #[serde(default)]
    pub arguments: BTreeMap<String, StepArgument>,
    /// Artifacts and upstream outputs read by the script.
    #[serde(default)]
    pub inputs: Vec<StepInput>,
    /// Outputs other steps may consume.
    #[serde(default)]
    pub outputs: Vec<String>,
    /// Steps that must finish first.
    #[serde(default)]
    pub dependencies: Vec<StepName>,
}

impl RemoteStep {
    /// Step with no arguments, inputs, or outputs yet.
    pub fn new(
        name: impl Into<StepName>,
        script: impl Into<PathBuf>,
        compute_target: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            script: script.into(),
            compute_target: compute_target.into(),
            arguments: BTreeMap::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    /// Set argument `key`, replacing any earlier value.
    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<StepArgument>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    /// Read a locally prepared table.
    pub fn with_artifact(mut self, artifact: ArtifactName) -> Self {
        self.inputs.push(StepInput::Artifact { artifact });
        self
    }

    /// Consume `output` of `step`; also records the dependency.
    pub fn with_step_output(mut self, step: impl Into<StepName>, output: impl Into<String>) -> Self {
        let step = step.into();
        if !self.dependencies.contains(&step) {
            self.dependencies.push(step.clone());
        }
        self.inputs.push(StepInput::StepOutput {
            step,
            output: output.into(),
        });
        self
    }

    /// Declare an output for downstream steps.
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.outputs.push(output.into());
        self
    }
}

/// Knobs of the standard tune → extract best → retrain → register pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingPipelineOptions {
    /// Pipeline name.
    pub name: String,
    /// Compute target shared by every step.
    pub compute_target: String,
    /// Script used by the tuning and retraining steps.
    pub train_script: PathBuf,
    /// Script picking the best tuning run.
    pub best_script: PathBuf,
    /// Script registering the retrained model.
    pub register_script: PathBuf,
    /// Metric the search maximizes.
    pub primary_metric: String,
    /// Trial budget of the search.
    pub max_total_runs: i64,
    /// Trials allowed to run at once.
    pub max_concurrent_runs: i64,
    /// Name the model is registered under.
    pub model_name: String,
}

impl Default for TrainingPipelineOptions {
    fn default() -> Self {
        Self {
            name: "duplicate-matching".to_string(),
            compute_target: DEFAULT_COMPUTE_TARGET.to_string(),
            train_script: PathBuf::from(DEFAULT_TRAIN_SCRIPT),
            best_script: PathBuf::from("scripts/get_best.py"),
            register_script: PathBuf::from("scripts/register_model.py"),
            primary_metric: "accuracy_at_1".to_string(),
            max_total_runs: 96,
            max_concurrent_runs: 8,
            model_name: "duplicate-matcher".to_string(),
        }
    }
}

/// Ordered set of remote steps bound to a workspace.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingPipeline {
    /// Pipeline name.
    pub name: String,
    /// Workspace every step runs in.
    pub workspace: WorkspaceConfig,
    /// Steps in submission order.
    pub steps: Vec<RemoteStep>,
}

impl TrainingPipeline {
    /// Empty pipeline bound to `workspace`.
    pub fn new(name: impl Into<String>, workspace: &WorkspaceConfig) -> Self {
        Self {
            name: name.into(),
            workspace: workspace.clone(),
            steps: Vec::new(),
        }
    }

    /// Append `step`.
    pub fn with_step(mut self, step: RemoteStep) -> Self {
        self.steps.push(step);
        self
    }

    /// The four-step pipeline over the prepared train/tune/test tables.
    pub fn standard(workspace: &WorkspaceConfig, options: &TrainingPipelineOptions) -> Self {
        let tune = RemoteStep::new(TUNE_STEP, &options.train_script, &options.compute_target)
            .with_artifact(ArtifactName::PairsTrain)
            .with_artifact(ArtifactName::PairsTune)
            .with_argument("primary_metric", options.primary_metric.as_str())
            .with_argument("max_total_runs", options.max_total_runs)
            .with_argument("max_concurrent_runs", options.max_concurrent_runs)
            .with_output(TUNE_RUN_OUTPUT);
        let best = RemoteStep::new(BEST_STEP, &options.best_script, &options.compute_target)
            .with_step_output(TUNE_STEP, TUNE_RUN_OUTPUT)
            .with_argument("primary_metric", options.primary_metric.as_str())
            .with_output(BEST_PARAMS_OUTPUT);
        let retrain = RemoteStep::new(RETRAIN_STEP, &options.train_script, &options.compute_target)
            .with_artifact(ArtifactName::PairsTrain)
            .with_artifact(ArtifactName::PairsTest)
            .with_step_output(BEST_STEP, BEST_PARAMS_OUTPUT)
            .with_output(MODEL_OUTPUT);
        let register = RemoteStep::new(REGISTER_STEP, &options.register_script, &options.compute_target)
            .with_step_output(RETRAIN_STEP, MODEL_OUTPUT)
            .with_argument("model_name", options.model_name.as_str());

        Self::new(options.name.clone(), workspace)
            .with_step(tune)
            .with_step(best)
            .with_step(retrain)
            .with_step(register)
    }

    /// Check step wiring: unique names, dependencies on earlier steps only, and
    /// every step-output input declared by a dependency.
    pub fn validate(&self) -> Result<(), PairsError> {
        self.workspace.validate()?;
        if self.steps.is_empty() {
            return Err(PairsError::Configuration(format!(
                "pipeline '{}' has no steps",
                self.name
            )));
        }
        let mut declared: HashMap<&str, HashSet<&str>> = HashMap::new();
        for step in &self.steps {
            if step.name.trim().is_empty() {
                return Err(PairsError::Configuration("step name is required".to_string()));
            }
            if step.compute_target.trim().is_empty() {
                return Err(PairsError::Configuration(format!(
                    "step '{}' has no compute target",
                    step.name
                )));
            }
            for dependency in &step.dependencies {
                if !declared.contains_key(dependency.as_str()) {
                    return Err(PairsError::Configuration(format!(
                        "step '{}' depends on '{dependency}', which is not an earlier step",
                        step.name
                    )));
                }
            }
            for input in &step.inputs {
                if let StepInput::StepOutput { step: upstream, output } = input {
                    let provided = step.dependencies.contains(upstream)
                        && declared
                            .get(upstream.as_str())
                            .is_some_and(|outputs| outputs.contains(output.as_str()));
                    if !provided {
                        return Err(PairsError::Configuration(format!(
                            "step '{}' reads '{output}' from '{upstream}', which does not provide it",
                            step.name
                        )));
                    }
                }
            }
            let outputs = step.outputs.iter().map(String::as_str).collect();
            if declared.insert(step.name.as_str(), outputs).is_some() {
                return Err(PairsError::Configuration(format!(
                    "step name '{}' is used more than once",
                    step.name
                )));
            }
        }
        Ok(())
    }

    /// Validate and write the descriptor as pretty JSON.
    pub fn write_to(&self, path: &Path) -> Result<(), PairsError> {
        self.validate()?;
        fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn workspace() -> WorkspaceConfig {
        WorkspaceConfig {
            subscription_id: "sub".to_string(),
            resource_group: "rg".to_string(),
            workspace_name: "ws".to_string(),
            region: None,
        }
    }

    #[test]
    fn standard_pipeline_is_valid_and_ordered() {
        let pipeline = TrainingPipeline::standard(&workspace(), &TrainingPipelineOptions::default());
        pipeline.validate().unwrap();
        let names: Vec<&str> = pipeline.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["tune", "extract_best", "retrain", "register"]);
        assert_eq!(pipeline.steps[2].dependencies, vec!["extract_best".to_string()]);
    }

    #[test]
    fn forward_dependencies_are_rejected() {
        let pipeline = TrainingPipeline::new("p", &workspace())
            .with_step(RemoteStep::new("a", "a.py", "cpu").with_step_output("b", "out"))
            .with_step(RemoteStep::new("b", "b.py", "cpu").with_output("out"));
        let err = pipeline.validate().unwrap_err();
        assert!(matches!(err, PairsError::Configuration(ref msg) if msg.contains("not an earlier step")));
    }

    #[test]
    fn undeclared_outputs_and_repeated_names_are_rejected() {
        let missing_output = TrainingPipeline::new("p", &workspace())
            .with_step(RemoteStep::new("a", "a.py", "cpu"))
            .with_step(RemoteStep::new("b", "b.py", "cpu").with_step_output("a", "model"));
        assert!(matches!(
            missing_output.validate(),
            Err(PairsError::Configuration(ref msg)) if msg.contains("does not provide")
        ));

        let repeated = TrainingPipeline::new("p", &workspace())
            .with_step(RemoteStep::new("a", "a.py", "cpu"))
            .with_step(RemoteStep::new("a", "a.py", "cpu"));
        assert!(matches!(
            repeated.validate(),
            Err(PairsError::Configuration(ref msg)) if msg.contains("more than once")
        ));
    }

    #[test]
    fn workspace_requires_every_identity_field() {
        let mut config = workspace();
        config.resource_group = " ".to_string();
        assert!(matches!(config.validate(), Err(PairsError::Configuration(ref msg)) if msg.contains("resource_group")));
    }

    #[test]
    fn workspace_and_pipeline_round_trip_through_json_files() {
        let dir = tempdir().unwrap();
        let ws_path = dir.path().join("config.json");
        fs::write(
            &ws_path,
            r#"{"subscription_id":"s","resource_group":"r","workspace_name":"w","region":"eastus"}"#,
        )
        .unwrap();
        let ws = WorkspaceConfig::from_json_file(&ws_path).unwrap();
        assert_eq!(ws.region.as_deref(), Some("eastus"));

        let pipeline = TrainingPipeline::standard(&ws, &TrainingPipelineOptions::default());
        let out = dir.path().join("pipeline.json");
        pipeline.write_to(&out).unwrap();
        let back: TrainingPipeline = serde_json::from_slice(&fs::read(&out).unwrap()).unwrap();
        assert_eq!(back, pipeline);
        assert_eq!(
            back.steps[0].arguments.get("max_total_runs"),
            Some(&StepArgument::Integer(96))
        );
    }
}
