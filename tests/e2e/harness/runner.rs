use super::assertions::Assertion;
use super::clock::MockClock;
use super::faults::FaultSwitch;
use super::steps::ScenarioStep;
use super::workspace::TestWorkspace;
use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashMap;
use std::time::Duration;
use vellum_core::{DocumentService, ErrorKind, Patch, VellumError, VersionSelector};

/// Exclusion timestamp no scenario uses, for plain replays.
const NO_EXCLUSION: i64 = i64::MIN;

/// Executes scenarios against a real service over a durable store
pub struct ScenarioRunner {
    workspace: TestWorkspace,
    project: String,
    service: Option<DocumentService>,
    faults: FaultSwitch,
    clock: MockClock,
    /// What the editor currently shows, per file
    editor_texts: HashMap<String, String>,
    /// Labelled commits: label -> (file, generation)
    labels: HashMap<String, (String, i64)>,
    current_step: usize,
}

impl ScenarioRunner {
    /// Create a new runner with a fresh data directory
    pub fn new(project: &str) -> Result<Self> {
        let workspace = TestWorkspace::empty()?;
        let clock = MockClock::new();
        let faults = FaultSwitch::new();
        let service = workspace.open_service(&clock, &faults)?;

        Ok(Self {
            workspace,
            project: project.to_string(),
            service: Some(service),
            faults,
            clock,
            editor_texts: HashMap::new(),
            labels: HashMap::new(),
            current_step: 0,
        })
    }

    /// Get current step number
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Execute all steps in sequence
    pub fn execute(&mut self, steps: &[ScenarioStep]) -> Result<()> {
        for (i, step) in steps.iter().enumerate() {
            self.current_step = i;
            self.execute_step(step)
                .with_context(|| format!("Step {}: {:?}", i, step))?;
        }
        Ok(())
    }

    /// Execute a single step
    fn execute_step(&mut self, step: &ScenarioStep) -> Result<()> {
        match step {
            ScenarioStep::OpenVersion {
                file,
                content,
                reset_editor,
            } => self.handle_open_version(file, content, *reset_editor),
            ScenarioStep::Edit {
                file,
                user,
                new_text,
                timestamp,
            } => self.handle_edit(file, user, new_text, *timestamp),
            ScenarioStep::RawPatch {
                file,
                text,
                timestamp,
            } => self.handle_raw_patch(file, text, *timestamp),
            ScenarioStep::Commit { file, label } => self.handle_commit(file, label.as_deref()),
            ScenarioStep::CommitProject => self.handle_commit_project(),
            ScenarioStep::DeleteFile {
                file,
                name,
                removal_timestamp,
            } => self.handle_delete_file(file, name, *removal_timestamp),

            ScenarioStep::Wait { duration } => self.handle_wait(*duration),

            ScenarioStep::StorageFails { message } => {
                self.faults.fail_writes(message);
                Ok(())
            }
            ScenarioStep::StorageRecovers => {
                self.faults.recover();
                Ok(())
            }
            ScenarioStep::Restart => self.handle_restart(),

            ScenarioStep::ExpectError { step, kind } => self.handle_expect_error(step, *kind),

            ScenarioStep::Assert { assertion } => self.handle_assertion(assertion),
        }
    }

    fn service(&self) -> Result<&DocumentService> {
        self.service
            .as_ref()
            .ok_or_else(|| anyhow!("Service not available"))
    }

    // ===== Editor action handlers =====

    fn handle_open_version(&mut self, file: &str, content: &str, reset_editor: bool) -> Result<()> {
        self.service()?.create_version(&self.project, file, content);
        if reset_editor {
            self.editor_texts
                .insert(file.to_string(), content.to_string());
        }
        Ok(())
    }

    fn handle_edit(&mut self, file: &str, user: &str, new_text: &str, timestamp: i64) -> Result<()> {
        let service = self.service()?;
        let old_text = self
            .editor_texts
            .get(file)
            .map(String::as_str)
            .unwrap_or("");
        let text = service.make_patch(old_text, new_text)?;
        service.create_patch(&self.project, file, Patch::new(user, text, timestamp))?;

        self.editor_texts
            .insert(file.to_string(), new_text.to_string());
        Ok(())
    }

    fn handle_raw_patch(&mut self, file: &str, text: &str, timestamp: i64) -> Result<()> {
        self.service()?
            .create_patch(&self.project, file, Patch::new("editor", text, timestamp))?;
        Ok(())
    }

    fn handle_commit(&mut self, file: &str, label: Option<&str>) -> Result<()> {
        let generation = self.service()?.commit_version(&self.project, file)?;
        if let Some(label) = label {
            self.labels
                .insert(label.to_string(), (file.to_string(), generation));
        }
        Ok(())
    }

    fn handle_commit_project(&mut self) -> Result<()> {
        self.service()?.commit_project(&self.project)?;
        Ok(())
    }

    fn handle_delete_file(&mut self, file: &str, name: &str, removal_timestamp: i64) -> Result<()> {
        self.service()?
            .delete_file(&self.project, file, name, removal_timestamp)?;
        Ok(())
    }

    fn handle_wait(&mut self, duration: Duration) -> Result<()> {
        self.clock.advance(duration);
        Ok(())
    }

    // ===== Failure simulation =====

    fn handle_restart(&mut self) -> Result<()> {
        // The database must be closed before it can be reopened.
        self.service = None;
        let service = self.workspace.open_service(&self.clock, &self.faults)?;
        self.service = Some(service);
        Ok(())
    }

    fn handle_expect_error(&mut self, step: &ScenarioStep, expected: ErrorKind) -> Result<()> {
        match self.execute_step(step) {
            Ok(()) => bail!("expected {:?} error, but the step succeeded", expected),
            Err(e) => {
                let err = e
                    .downcast_ref::<VellumError>()
                    .ok_or_else(|| anyhow!("expected {:?} error, got: {:?}", expected, e))?;
                if err.kind() != expected {
                    bail!("expected {:?} error, got {:?}: {}", expected, err.kind(), err);
                }
                Ok(())
            }
        }
    }

    // ===== Assertions =====

    fn label(&self, label: &str) -> Result<(String, i64)> {
        self.labels
            .get(label)
            .cloned()
            .ok_or_else(|| anyhow!("Unknown commit label: {}", label))
    }

    fn handle_assertion(&mut self, assertion: &Assertion) -> Result<()> {
        let service = self.service()?;
        let project = self.project.as_str();

        match assertion {
            Assertion::GenerationCount { file, count } => {
                let actual = service.file_version_list(project, file)?.len();
                if actual != *count {
                    bail!("Expected {} generations of {}, found {}", count, file, actual);
                }
                Ok(())
            }
            Assertion::LatestContent { file, content } => {
                let actual = service.get_version(project, file, VersionSelector::Latest)?;
                if actual != content.as_bytes() {
                    bail!(
                        "Latest content of {} is {:?}, expected {:?}",
                        file,
                        String::from_utf8_lossy(&actual),
                        content
                    );
                }
                Ok(())
            }
            Assertion::ContentAt { label, content } => {
                let (file, generation) = self.label(label)?;
                let actual = service.get_version(project, &file, generation.into())?;
                if actual != content.as_bytes() {
                    bail!(
                        "Content at {} is {:?}, expected {:?}",
                        label,
                        String::from_utf8_lossy(&actual),
                        content
                    );
                }
                Ok(())
            }
            Assertion::CreatedAt { label, millis } => {
                let (file, generation) = self.label(label)?;
                let record = service.get_version_record(project, &file, generation.into())?;
                if record.created_at != *millis {
                    bail!("{} was created at {}, expected {}", label, record.created_at, millis);
                }
                Ok(())
            }
            Assertion::FileMissing { file } => {
                match service.get_version(project, file, VersionSelector::Latest) {
                    Err(VellumError::FileNotFound { .. }) => Ok(()),
                    other => bail!("Expected {} to be missing, got {:?}", file, other),
                }
            }
            Assertion::DraftPatchCount { file, count } => {
                let patches = service
                    .get_patch_list(project, file)
                    .ok_or_else(|| anyhow!("No open draft for {}", file))?;
                if patches.len() != *count {
                    bail!(
                        "Draft of {} holds {} patches, expected {}",
                        file,
                        patches.len(),
                        count
                    );
                }
                Ok(())
            }
            Assertion::NoDraft { file } => {
                if let Some(patches) = service.get_patch_list(project, file) {
                    bail!("Expected no draft for {}, found {} patches", file, patches.len());
                }
                Ok(())
            }
            Assertion::ReconstructsTo {
                label,
                exclude,
                expected,
            } => {
                let (file, generation) = self.label(label)?;
                let actual = service.delete_patch(project, &file, generation, *exclude)?;
                if actual != *expected {
                    bail!(
                        "Reconstruction of {} without {} gave {:?}, expected {:?}",
                        label,
                        exclude,
                        actual,
                        expected
                    );
                }
                Ok(())
            }
            Assertion::ReplayMatchesSnapshots { file } => {
                for generation in service.file_version_list(project, file)? {
                    let replayed = service.delete_patch(project, file, generation, NO_EXCLUSION)?;
                    let stored = service.get_version(project, file, generation.into())?;
                    if replayed.as_bytes() != stored.as_slice() {
                        bail!(
                            "Replay of {} at {} gave {:?}, stored {:?}",
                            file,
                            generation,
                            replayed,
                            String::from_utf8_lossy(&stored)
                        );
                    }
                }
                Ok(())
            }
            Assertion::CoffinCount(count) => {
                let actual = service.list_coffins(project)?.len();
                if actual != *count {
                    bail!("Expected {} coffins, found {}", count, actual);
                }
                Ok(())
            }
            Assertion::CoffinFor { file, name } => {
                let found = service
                    .list_coffins(project)?
                    .iter()
                    .any(|c| c.file_id == *file && c.file_name == *name);
                if !found {
                    bail!("No coffin for {} named {:?}", file, name);
                }
                Ok(())
            }
            Assertion::Custom(f) => f(service),
        }
    }
}
