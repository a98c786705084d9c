use super::assertions::Assertion;
use super::runner::ScenarioRunner;
use super::steps::ScenarioStep;
use super::workspace::fixture_text;
use std::time::Duration;
use vellum_core::ErrorKind;

/// Fluent DSL for building test scenarios
pub struct Scenario {
    name: String,
    project: String,
    steps: Vec<ScenarioStep>,
    setup_error: Option<String>,
}

impl Scenario {
    /// Create a new scenario with the given name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            project: "project".to_string(),
            steps: Vec::new(),
            setup_error: None,
        }
    }

    // ===== Initial setup =====

    /// Run every step against `project` instead of the default one
    pub fn in_project(mut self, project: &str) -> Self {
        self.project = project.to_string();
        self
    }

    // ===== Editor actions =====

    /// Editor opens a draft with `content`
    pub fn open_version(mut self, file: &str, content: &str) -> Self {
        self.steps.push(ScenarioStep::OpenVersion {
            file: file.to_string(),
            content: content.to_string(),
            reset_editor: true,
        });
        self
    }

    /// Editor changes its text to `new_text`; the patch is computed from the
    /// editor's previous text
    pub fn edit(mut self, file: &str, new_text: &str, timestamp: i64) -> Self {
        self.steps.push(ScenarioStep::Edit {
            file: file.to_string(),
            user: "editor".to_string(),
            new_text: new_text.to_string(),
            timestamp,
        });
        self
    }

    /// Same as `edit`, attributed to `user`
    pub fn edit_as(mut self, user: &str, file: &str, new_text: &str, timestamp: i64) -> Self {
        self.steps.push(ScenarioStep::Edit {
            file: file.to_string(),
            user: user.to_string(),
            new_text: new_text.to_string(),
            timestamp,
        });
        self
    }

    /// Edit to the contents of a text fixture
    pub fn edit_to_fixture(self, file: &str, fixture: &str, timestamp: i64) -> Self {
        match fixture_text(fixture) {
            Ok(text) => self.edit(file, &text, timestamp),
            Err(e) => self.setup_failed(e),
        }
    }

    /// Open a draft with the contents of a text fixture
    pub fn open_fixture(self, file: &str, fixture: &str) -> Self {
        match fixture_text(fixture) {
            Ok(text) => self.open_version(file, &text),
            Err(e) => self.setup_failed(e),
        }
    }

    /// Record a patch with literal text, bypassing the codec
    pub fn raw_patch(mut self, file: &str, text: &str, timestamp: i64) -> Self {
        self.steps.push(ScenarioStep::RawPatch {
            file: file.to_string(),
            text: text.to_string(),
            timestamp,
        });
        self
    }

    /// Editor commits the draft; the draft becomes the new version
    pub fn commit(mut self, file: &str) -> Self {
        self.steps.push(ScenarioStep::Commit {
            file: file.to_string(),
            label: None,
        });
        self
    }

    /// Commit and remember the generation under `label`
    pub fn commit_as(mut self, file: &str, label: &str) -> Self {
        self.steps.push(ScenarioStep::Commit {
            file: file.to_string(),
            label: Some(label.to_string()),
        });
        self
    }

    /// Commit every open draft of the project
    pub fn commit_project(mut self) -> Self {
        self.steps.push(ScenarioStep::CommitProject);
        self
    }

    /// Tombstone a file
    pub fn delete_file(mut self, file: &str, name: &str, removal_timestamp: i64) -> Self {
        self.steps.push(ScenarioStep::DeleteFile {
            file: file.to_string(),
            name: name.to_string(),
            removal_timestamp,
        });
        self
    }

    // ===== Compound editor actions =====

    /// Open `file` with `baseline` and commit it as `label`
    pub fn baseline(self, file: &str, baseline: &str, label: &str) -> Self {
        self.open_version(file, baseline).commit_as(file, label)
    }

    /// Apply each `(text, timestamp)` edit in order, then commit as `label`.
    ///
    /// The draft is opened with the final text, the way an editor sends its
    /// snapshot, while each patch is diffed from the previous edit.
    pub fn edits_committed_as(mut self, file: &str, edits: &[(&str, i64)], label: &str) -> Self {
        if let Some((last, _)) = edits.last() {
            self.steps.push(ScenarioStep::OpenVersion {
                file: file.to_string(),
                content: last.to_string(),
                reset_editor: false,
            });
        }
        for (text, ts) in edits {
            self = self.edit(file, text, *ts);
        }
        self.commit_as(file, label)
    }

    /// One edit to the contents of a fixture, committed as `label`
    pub fn fixture_committed_as(self, file: &str, fixture: &str, timestamp: i64, label: &str) -> Self {
        match fixture_text(fixture) {
            Ok(text) => self.edits_committed_as(file, &[(text.as_str(), timestamp)], label),
            Err(e) => self.setup_failed(e),
        }
    }

    // ===== Time control =====

    /// Wait for a duration
    pub fn wait(mut self, duration: Duration) -> Self {
        self.steps.push(ScenarioStep::Wait { duration });
        self
    }

    /// Wait for N seconds
    pub fn wait_secs(self, secs: u64) -> Self {
        self.wait(Duration::from_secs(secs))
    }

    // ===== Failure simulation =====

    /// Every storage write fails with `message` from now on
    pub fn storage_fails(mut self, message: &str) -> Self {
        self.steps.push(ScenarioStep::StorageFails {
            message: message.to_string(),
        });
        self
    }

    /// Storage writes succeed again
    pub fn storage_recovers(mut self) -> Self {
        self.steps.push(ScenarioStep::StorageRecovers);
        self
    }

    /// Drop the service and reopen the durable store; drafts are lost
    pub fn restart(mut self) -> Self {
        self.steps.push(ScenarioStep::Restart);
        self
    }

    /// The previous step must fail with `kind`
    pub fn expect_error(mut self, kind: ErrorKind) -> Self {
        if let Some(step) = self.steps.pop() {
            self.steps.push(ScenarioStep::ExpectError {
                step: Box::new(step),
                kind,
            });
        }
        self
    }

    // ===== Assertions =====

    /// Add a general assertion
    pub fn assert(mut self, assertion: Assertion) -> Self {
        self.steps.push(ScenarioStep::Assert { assertion });
        self
    }

    /// Assert the number of committed generations
    pub fn assert_generations(self, file: &str, count: usize) -> Self {
        self.assert(Assertion::GenerationCount {
            file: file.to_string(),
            count,
        })
    }

    /// Assert the latest committed content
    pub fn assert_latest(self, file: &str, content: &str) -> Self {
        self.assert(Assertion::LatestContent {
            file: file.to_string(),
            content: content.to_string(),
        })
    }

    /// Assert the content of a labelled generation
    pub fn assert_content_at(self, label: &str, content: &str) -> Self {
        self.assert(Assertion::ContentAt {
            label: label.to_string(),
            content: content.to_string(),
        })
    }

    /// Assert the open draft holds `count` patches
    pub fn assert_draft_patches(self, file: &str, count: usize) -> Self {
        self.assert(Assertion::DraftPatchCount {
            file: file.to_string(),
            count,
        })
    }

    /// Assert no draft is open
    pub fn assert_no_draft(self, file: &str) -> Self {
        self.assert(Assertion::NoDraft {
            file: file.to_string(),
        })
    }

    /// Assert reconstruction of a labelled generation without one patch
    pub fn assert_reconstructs(self, label: &str, exclude: i64, expected: &str) -> Self {
        self.assert(Assertion::ReconstructsTo {
            label: label.to_string(),
            exclude,
            expected: expected.to_string(),
        })
    }

    /// Same, with the expected text taken from a fixture
    pub fn assert_reconstructs_fixture(self, label: &str, exclude: i64, fixture: &str) -> Self {
        match fixture_text(fixture) {
            Ok(text) => self.assert_reconstructs(label, exclude, &text),
            Err(e) => self.setup_failed(e),
        }
    }

    /// Assert the project's cemetery size
    pub fn assert_coffins(self, count: usize) -> Self {
        self.assert(Assertion::CoffinCount(count))
    }

    fn setup_failed(mut self, error: anyhow::Error) -> Self {
        if self.setup_error.is_none() {
            self.setup_error = Some(format!("{:?}", error));
        }
        self
    }

    // ===== Execution =====

    /// Execute the scenario and return results
    pub fn run(self) -> ScenarioResult {
        if let Some(error) = self.setup_error {
            return ScenarioResult {
                name: self.name,
                success: false,
                steps_executed: 0,
                failure_step: Some(0),
                error: Some(format!("Scenario setup failed: {}", error)),
            };
        }

        let mut runner = match ScenarioRunner::new(&self.project) {
            Ok(r) => r,
            Err(e) => {
                return ScenarioResult {
                    name: self.name.clone(),
                    success: false,
                    steps_executed: 0,
                    failure_step: Some(0),
                    error: Some(format!("Failed to create runner: {}", e)),
                }
            }
        };

        match runner.execute(&self.steps) {
            Ok(()) => ScenarioResult {
                name: self.name,
                success: true,
                steps_executed: self.steps.len(),
                failure_step: None,
                error: None,
            },
            Err(e) => {
                let failure_step = runner.current_step();
                ScenarioResult {
                    name: self.name,
                    success: false,
                    steps_executed: failure_step,
                    failure_step: Some(failure_step),
                    error: Some(format!("{:?}", e)),
                }
            }
        }
    }
}

/// Result of running a scenario
#[derive(Debug)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub steps_executed: usize,
    pub failure_step: Option<usize>,
    pub error: Option<String>,
}

impl ScenarioResult {
    /// Unwrap the result, panicking if it failed
    pub fn unwrap(self) {
        if !self.success {
            panic!(
                "Scenario '{}' failed at step {}: {}",
                self.name,
                self.failure_step.unwrap_or(0),
                self.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }
    }

    /// Expect the result to be successful
    pub fn expect(self, msg: &str) {
        if !self.success {
            panic!(
                "{}: Scenario '{}' failed at step {}: {}",
                msg,
                self.name,
                self.failure_step.unwrap_or(0),
                self.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }
    }
}
