//! Survey-by-survey download of response exports.

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use super::artifact::{ArtifactStatus, ArtifactStore};
use super::canonical::to_canonical_string;
use super::rekey::{rekey_responses, IdentifierMap};
use crate::models::Survey;
use crate::rpc::{ClientError, Endpoint, Session};

/// Per-run synchronization settings.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Participant attribute holding the subject identifier
    pub identifier_attribute: String,
    /// Response completion filter passed to `export_responses`
    pub response_status: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            identifier_attribute: "attribute_1".to_string(),
            response_status: "all".to_string(),
        }
    }
}

/// Result of synchronizing one survey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurveyStatus {
    Written(PathBuf),
    Unchanged(PathBuf),
    Failed(String),
}

/// Report for one survey.
#[derive(Debug, Clone)]
pub struct SurveyReport {
    pub survey: Survey,
    pub status: SurveyStatus,
    /// Responses written under a subject identifier
    pub kept: usize,
    /// Responses dropped because their token was unknown
    pub dropped: usize,
}

/// Report for a whole run.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub surveys: Vec<SurveyReport>,
    /// Survey list entries that could not be decoded
    pub malformed: Vec<String>,
}

impl SyncReport {
    fn count(&self, predicate: impl Fn(&SurveyStatus) -> bool) -> usize {
        self.surveys.iter().filter(|r| predicate(&r.status)).count()
    }

    pub fn written(&self) -> usize {
        self.count(|s| matches!(s, SurveyStatus::Written(_)))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|s| matches!(s, SurveyStatus::Unchanged(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, SurveyStatus::Failed(_)))
    }
}

/// Downloads every survey's responses into an [`ArtifactStore`].
#[derive(Debug, Clone)]
pub struct Synchronizer {
    store: ArtifactStore,
    options: SyncOptions,
}

impl Synchronizer {
    pub fn new(store: ArtifactStore, options: SyncOptions) -> Self {
        Self { store, options }
    }

    pub fn output_dir(&self) -> &Path {
        self.store.output_dir()
    }

    /// Synchronizes all surveys visible to the session.
    ///
    /// A survey that fails is reported and skipped. Errors that make the
    /// session unusable (transport, protocol, state) abort the run.
    pub fn run<E: Endpoint>(&self, session: &mut Session<E>) -> Result<SyncReport, ClientError> {
        let mut report = SyncReport::default();
        let mut surveys = Vec::new();
        for entry in session.survey_entries()? {
            match entry {
                Ok(survey) => surveys.push(survey),
                Err(e) => {
                    error!("Skipping survey entry: {}", e);
                    report.malformed.push(e.to_string());
                }
            }
        }
        info!("{} survey(s) to synchronize", surveys.len());

        for survey in surveys {
            info!("▶ {} ▶ {}", survey.sid, survey.title);
            match self.sync_survey(session, &survey) {
                Ok(survey_report) => report.surveys.push(survey_report),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!("Skipping survey {} ({}): {}", survey.sid, survey.title, e);
                    report.surveys.push(SurveyReport {
                        survey,
                        status: SurveyStatus::Failed(e.to_string()),
                        kept: 0,
                        dropped: 0,
                    });
                }
            }
        }

        Ok(report)
    }

    /// Downloads one survey, re-keys its responses and writes the export if
    /// its content changed.
    pub fn sync_survey<E: Endpoint>(
        &self,
        session: &mut Session<E>,
        survey: &Survey,
    ) -> Result<SurveyReport, ClientError> {
        let attribute = self.options.identifier_attribute.as_str();

        let participants = session.participants(survey.sid, &[attribute])?;
        let ids = IdentifierMap::from_participants(&participants, attribute);

        let document = session.responses(survey.sid, &self.options.response_status)?;
        let rekeyed = rekey_responses(document, &ids);
        if !rekeyed.dropped.is_empty() {
            warn!(
                "Survey {}: dropped {} response(s) without a known token",
                survey.sid,
                rekeyed.dropped.len()
            );
        }

        let text = to_canonical_string(&rekeyed.document)
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        let status = match self.store.write_if_changed(&survey.title, &text)? {
            ArtifactStatus::Written(path) => SurveyStatus::Written(path),
            ArtifactStatus::Unchanged(path) => SurveyStatus::Unchanged(path),
        };

        Ok(SurveyReport {
            survey: survey.clone(),
            status,
            kept: rekeyed.kept,
            dropped: rekeyed.dropped.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::mock::{count_calls, Reply, ScriptedEndpoint};
    use crate::rpc::SessionOptions;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use serde_json::{json, Value};
    use std::fs;
    use tempfile::TempDir;

    fn encode(value: Value) -> Reply {
        Reply::result(json!(BASE64.encode(value.to_string())))
    }

    fn base_endpoint() -> ScriptedEndpoint {
        ScriptedEndpoint::new()
            .reply("get_session_key", Reply::result(json!("k3y")))
            .reply("release_session_key", Reply::result(json!("OK")))
    }

    fn baseline_endpoint() -> ScriptedEndpoint {
        base_endpoint()
            .reply(
                "list_surveys",
                Reply::result(json!([{"sid": 1, "surveyls_title": "T1 - Baseline"}])),
            )
            .reply(
                "list_participants",
                Reply::result(json!([{"tid": 1, "token": "abc", "attribute_1": "PSC001"}])),
            )
            .reply(
                "export_responses",
                encode(json!({"responses": [{"abc": {"q1": "5"}}]})),
            )
    }

    fn open(endpoint: ScriptedEndpoint) -> Session<ScriptedEndpoint> {
        Session::open(endpoint, SessionOptions::default(), "user", "pw").unwrap()
    }

    fn synchronizer(temp: &TempDir) -> Synchronizer {
        Synchronizer::new(
            ArtifactStore::new(temp.path().to_path_buf()),
            SyncOptions::default(),
        )
    }

    #[test]
    fn test_baseline_survey_rekeyed_and_written() {
        let temp = TempDir::new().unwrap();
        let sync = synchronizer(&temp);
        let mut session = open(baseline_endpoint());

        let report = sync.run(&mut session).unwrap();
        assert_eq!(report.written(), 1);

        let path = temp.path().join("T1-Baseline.json");
        assert_eq!(report.surveys[0].status, SurveyStatus::Written(path.clone()));
        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, json!({"responses": [{"PSC001": {"q1": "5"}}]}));
    }

    #[test]
    fn test_second_run_does_not_write() {
        let temp = TempDir::new().unwrap();
        let sync = synchronizer(&temp);
        let path = temp.path().join("T1-Baseline.json");

        let mut session = open(baseline_endpoint());
        sync.run(&mut session).unwrap();
        session.release();
        let modified = fs::metadata(&path).unwrap().modified().unwrap();

        let mut session = open(baseline_endpoint());
        let report = sync.run(&mut session).unwrap();
        assert_eq!(report.written(), 0);
        assert_eq!(report.unchanged(), 1);
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), modified);
    }

    #[test]
    fn test_no_participants_drops_all_responses() {
        let temp = TempDir::new().unwrap();
        let sync = synchronizer(&temp);
        let mut session = open(
            base_endpoint()
                .reply(
                    "list_surveys",
                    Reply::result(json!([{"sid": 1, "surveyls_title": "T1"}])),
                )
                .reply(
                    "list_participants",
                    Reply::result(json!({"status": "No Tokens found"})),
                )
                .reply(
                    "export_responses",
                    encode(json!({"responses": [{"abc": {"q1": "5"}}, {"def": {"q1": "1"}}]})),
                ),
        );

        let report = sync.run(&mut session).unwrap();
        let survey = &report.surveys[0];
        assert_eq!(survey.kept, 0);
        assert_eq!(survey.dropped, 2);
        assert!(matches!(survey.status, SurveyStatus::Written(_)));
        assert_eq!(
            fs::read_to_string(temp.path().join("T1.json")).unwrap(),
            "{\n    \"responses\": []\n}"
        );
    }

    #[test]
    fn test_unknown_token_does_not_block_others() {
        let temp = TempDir::new().unwrap();
        let sync = synchronizer(&temp);
        let mut session = open(
            base_endpoint()
                .reply(
                    "list_surveys",
                    Reply::result(json!([{"sid": 1, "surveyls_title": "T1"}])),
                )
                .reply(
                    "list_participants",
                    Reply::result(json!([{"tid": 1, "token": "abc", "attribute_1": "PSC001"}])),
                )
                .reply(
                    "export_responses",
                    encode(json!({"responses": [{"zzz": {"q1": "1"}}, {"abc": {"q1": "5"}}]})),
                ),
        );

        let report = sync.run(&mut session).unwrap();
        assert_eq!(report.surveys[0].kept, 1);
        assert_eq!(report.surveys[0].dropped, 1);
        let written: Value =
            serde_json::from_str(&fs::read_to_string(temp.path().join("T1.json")).unwrap())
                .unwrap();
        assert_eq!(written, json!({"responses": [{"PSC001": {"q1": "5"}}]}));
    }

    #[test]
    fn test_survey_errors_are_isolated_and_release_once() {
        let temp = TempDir::new().unwrap();
        let sync = synchronizer(&temp);
        let endpoint = base_endpoint()
            .reply(
                "list_surveys",
                Reply::result(json!([
                    {"sid": 1, "surveyls_title": "T1"},
                    {"sid": 2, "surveyls_title": "T2"}
                ])),
            )
            .reply(
                "list_participants",
                Reply::result(json!({"status": "Error: No token table"})),
            );
        let calls = endpoint.calls();
        let mut session = open(endpoint);

        let report = sync.run(&mut session).unwrap();
        assert_eq!(report.failed(), 2);
        assert_eq!(count_calls(&calls, "list_participants"), 2);
        assert_eq!(count_calls(&calls, "export_responses"), 0);

        drop(session);
        assert_eq!(count_calls(&calls, "release_session_key"), 1);
    }

    #[test]
    fn test_malformed_survey_entry_does_not_block_others() {
        let temp = TempDir::new().unwrap();
        let sync = synchronizer(&temp);
        let mut session = open(
            base_endpoint()
                .reply(
                    "list_surveys",
                    Reply::result(json!([
                        {"sid": 1, "surveyls_title": null},
                        {"sid": 2, "surveyls_title": "Good"}
                    ])),
                )
                .reply("list_participants", Reply::result(json!([])))
                .reply("export_responses", encode(json!({"responses": []}))),
        );

        let report = sync.run(&mut session).unwrap();
        assert_eq!(report.malformed.len(), 1);
        assert_eq!(report.surveys.len(), 1);
        assert_eq!(report.surveys[0].survey.sid, 2);
        assert_eq!(report.written(), 1);
        assert!(temp.path().join("Good.json").exists());
    }

    #[test]
    fn test_export_failure_for_every_survey_releases_once() {
        let temp = TempDir::new().unwrap();
        let sync = synchronizer(&temp);
        let endpoint = base_endpoint()
            .reply(
                "list_surveys",
                Reply::result(json!([
                    {"sid": 1, "surveyls_title": "T1"},
                    {"sid": 2, "surveyls_title": "T2"}
                ])),
            )
            .reply("list_participants", Reply::result(json!([])))
            .reply(
                "export_responses",
                Reply::result(json!({"status": "Error: Invalid survey ID"})),
            );
        let calls = endpoint.calls();
        let mut session = open(endpoint);

        let report = sync.run(&mut session).unwrap();
        assert_eq!(report.failed(), 2);
        assert_eq!(count_calls(&calls, "export_responses"), 2);

        drop(session);
        assert_eq!(count_calls(&calls, "release_session_key"), 1);
    }

    #[test]
    fn test_export_errors_are_isolated() {
        let temp = TempDir::new().unwrap();
        let sync = synchronizer(&temp);
        let mut session = open(
            base_endpoint()
                .reply(
                    "list_surveys",
                    Reply::result(json!([
                        {"sid": 1, "surveyls_title": "Broken"},
                        {"sid": 2, "surveyls_title": "Fine"}
                    ])),
                )
                .reply("list_participants", Reply::result(json!([])))
                .reply("export_responses", Reply::result(json!("%%% not base64")))
                .reply("export_responses", encode(json!({"responses": []}))),
        );

        let report = sync.run(&mut session).unwrap();
        assert!(matches!(report.surveys[0].status, SurveyStatus::Failed(_)));
        assert!(matches!(report.surveys[1].status, SurveyStatus::Written(_)));
        assert!(!temp.path().join("Broken.json").exists());
        assert!(temp.path().join("Fine.json").exists());
    }

    #[test]
    fn test_transport_failure_aborts_run_but_releases() {
        let temp = TempDir::new().unwrap();
        let sync = synchronizer(&temp);
        let endpoint = base_endpoint()
            .reply(
                "list_surveys",
                Reply::result(json!([
                    {"sid": 1, "surveyls_title": "T1"},
                    {"sid": 2, "surveyls_title": "T2"}
                ])),
            )
            .reply("list_participants", Reply::Unreachable);
        let calls = endpoint.calls();

        let result = {
            let mut session = open(endpoint);
            sync.run(&mut session)
        };
        assert!(matches!(result, Err(ClientError::Transport(_))));
        assert_eq!(count_calls(&calls, "list_participants"), 1);
        assert_eq!(count_calls(&calls, "release_session_key"), 1);
    }

    #[test]
    fn test_no_response_data_sentinel() {
        let temp = TempDir::new().unwrap();
        let sync = synchronizer(&temp);
        let mut session = open(
            base_endpoint()
                .reply(
                    "list_surveys",
                    Reply::result(json!([{"sid": 1, "surveyls_title": "Empty"}])),
                )
                .reply("list_participants", Reply::result(json!([])))
                .reply(
                    "export_responses",
                    Reply::both(
                        json!({"status": "No Data, could not get max id."}),
                        json!({"code": -32000, "message": "error"}),
                    ),
                ),
        );

        let report = sync.run(&mut session).unwrap();
        assert_eq!(report.written(), 1);
        assert_eq!(
            fs::read_to_string(temp.path().join("Empty.json")).unwrap(),
            "{\n    \"responses\": []\n}"
        );
    }
}
