//! The job application workflow: transition table, routers and assembly.

use crate::config::PipelineConfig;
use crate::engine::{Engine, Next, Transition, END};
use crate::error::WorkflowError;
use crate::failure::{DiagnosticHandler, FailureHandler};
use crate::node::{Node, NodeEnv, NodeId, TaskNode};
use crate::services::Services;
use crate::state::WorkflowState;
use std::sync::Arc;

const COVER_LETTER: &str = "cover_letter";
const DISPATCH: &str = "dispatch";

/// The application workflow.
///
/// ```text
/// resume ──┬── cover_letter ── dispatch ── end
///          └───────────────── dispatch ── end
/// ```
///
/// Any failure routes straight to the end.
pub static TRANSITIONS: &[Transition] = &[
    Transition {
        from: NodeId::Resume,
        router: route_after_resume,
        branches: &[
            (COVER_LETTER, Next::Node(NodeId::CoverLetter)),
            (DISPATCH, Next::Node(NodeId::Dispatch)),
            (END, Next::End),
        ],
    },
    Transition {
        from: NodeId::CoverLetter,
        router: route_after_cover_letter,
        branches: &[(DISPATCH, Next::Node(NodeId::Dispatch)), (END, Next::End)],
    },
    Transition {
        from: NodeId::Dispatch,
        router: route_after_dispatch,
        branches: &[(END, Next::End)],
    },
];

/// Cover letter when requested, otherwise straight to dispatch.
pub fn route_after_resume(state: &WorkflowState) -> &'static str {
    if state.is_failed() {
        return END;
    }
    if state.application().generate_cover_letter {
        COVER_LETTER
    } else {
        DISPATCH
    }
}

/// Dispatch always follows a generated cover letter.
///
/// `send_email` is not consulted here: a run that generated a cover letter
/// still dispatches when `send_email` is false.
pub fn route_after_cover_letter(state: &WorkflowState) -> &'static str {
    if state.is_failed() {
        return END;
    }
    DISPATCH
}

pub fn route_after_dispatch(_state: &WorkflowState) -> &'static str {
    END
}

/// Assemble the application workflow with the default failure handler.
///
/// # Example
///
/// ```rust,no_run
/// use jobflow::{build_workflow, config, Application, Services, WorkflowState};
/// # fn services() -> Services { unimplemented!() }
///
/// let config = config::load_file("jobflow.yaml")?;
/// let engine = build_workflow(&config, services())?;
///
/// let application: Application = serde_yaml::from_str(&std::fs::read_to_string("application.yaml")?)?;
/// let execution = engine.run(WorkflowState::new(application));
/// println!("{}", execution.state.status());
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn build_workflow(config: &PipelineConfig, services: Services) -> Result<Engine, WorkflowError> {
    let mut handler = DiagnosticHandler::new(config.recovery.clone());
    if config.recovery.diagnose {
        handler = handler.with_diagnoser(services.generator.clone());
    }

    build_workflow_with_handler(config, services, Arc::new(handler))
}

/// Assemble the application workflow around a custom failure handler.
pub fn build_workflow_with_handler(
    config: &PipelineConfig,
    services: Services,
    handler: Arc<dyn FailureHandler>,
) -> Result<Engine, WorkflowError> {
    let env = Arc::new(NodeEnv {
        services: services.with_prompts(config.prompts.clone()),
        resume_dir: config.resume_dir.clone(),
        cover_letter_dir: config.cover_letter_dir.clone(),
    });

    let nodes: Vec<Box<dyn Node>> = vec![
        Box::new(TaskNode::resume(env.clone(), handler.clone())),
        Box::new(TaskNode::cover_letter(env.clone(), handler.clone())),
        Box::new(TaskNode::dispatch(env, handler)),
    ];

    Engine::new(NodeId::Resume, nodes, TRANSITIONS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::services::ArtifactKind;
    use crate::state::RunStatus;
    use crate::test_support::{self, FakeMailer, ScriptedGenerator, Workspace};
    use std::path::PathBuf;

    struct Harness {
        workspace: Arc<Workspace>,
        generator: Arc<ScriptedGenerator>,
        mailer: Arc<FakeMailer>,
        engine: Engine,
    }

    fn harness(workspace: Workspace, replies: Vec<Result<String, TaskError>>) -> Harness {
        test_support::init_tracing();
        let workspace = Arc::new(workspace);
        let generator = Arc::new(ScriptedGenerator::new(replies));
        let mailer = Arc::new(FakeMailer::new());
        let config = PipelineConfig {
            resume_dir: PathBuf::from("out/resumes"),
            cover_letter_dir: PathBuf::from("out/letters"),
            ..PipelineConfig::default()
        };
        let services = test_support::services(workspace.clone(), generator.clone(), mailer.clone());
        let engine = build_workflow(&config, services).unwrap();
        Harness {
            workspace,
            generator,
            mailer,
            engine,
        }
    }

    fn all_succeed() -> Vec<Result<String, TaskError>> {
        vec![
            test_support::latex_reply("\\section{Refined}"),
            test_support::latex_reply("Dear Acme"),
            test_support::email_reply(),
        ]
    }

    #[test]
    fn test_table_validates() {
        let h = harness(Workspace::with_resume(), vec![]);
        assert_eq!(h.engine.entry(), NodeId::Resume);
    }

    #[test]
    fn test_without_cover_letter_visits_resume_then_dispatch() {
        let h = harness(Workspace::with_resume(), all_succeed());
        let execution = h
            .engine
            .run(WorkflowState::new(test_support::application(false, true)));

        assert_eq!(execution.visited, vec![NodeId::Resume, NodeId::Dispatch]);
        assert_eq!(execution.state.status(), RunStatus::Completed);
        assert_eq!(execution.state.cover_letter_path(), None);
        assert_eq!(h.mailer.sent()[0].attachments.len(), 1);
    }

    #[test]
    fn test_without_cover_letter_or_email_still_dispatches() {
        let h = harness(Workspace::with_resume(), all_succeed());
        let execution = h
            .engine
            .run(WorkflowState::new(test_support::application(false, false)));

        assert_eq!(execution.visited, vec![NodeId::Resume, NodeId::Dispatch]);
    }

    #[test]
    fn test_full_run_visits_all_nodes() {
        let h = harness(Workspace::with_resume(), all_succeed());
        let execution = h
            .engine
            .run(WorkflowState::new(test_support::application(true, true)));

        assert_eq!(
            execution.visited,
            vec![NodeId::Resume, NodeId::CoverLetter, NodeId::Dispatch]
        );
        let state = &execution.state;
        assert_eq!(state.status(), RunStatus::Completed);
        assert_eq!(state.refined_resume_path(), Some("out/resumes/resume.pdf"));
        assert_eq!(state.cover_letter_path(), Some("out/letters/cover_letter.pdf"));
        assert_eq!(state.delivered_to(), Some("x@y.com"));
        assert_eq!(state.error_message(), None);

        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].attachments,
            vec![
                PathBuf::from("out/resumes/resume.pdf"),
                PathBuf::from("out/letters/cover_letter.pdf")
            ]
        );
        assert_eq!(
            h.workspace.renders(),
            vec![ArtifactKind::Resume, ArtifactKind::CoverLetter]
        );
        // The cover letter was written from the refined resume, not the source.
        assert!(h.generator.prompts()[1].contains("\\section{Refined}"));
    }

    #[test]
    fn test_cover_letter_without_send_email_still_dispatches() {
        let h = harness(Workspace::with_resume(), all_succeed());
        let execution = h
            .engine
            .run(WorkflowState::new(test_support::application(true, false)));

        assert_eq!(
            execution.visited,
            vec![NodeId::Resume, NodeId::CoverLetter, NodeId::Dispatch]
        );
        assert_eq!(execution.state.status(), RunStatus::Completed);
        assert_eq!(h.mailer.sent().len(), 1);
    }

    #[test]
    fn test_missing_source_fails_at_resume() {
        let h = harness(Workspace::new(), all_succeed());
        let execution = h
            .engine
            .run(WorkflowState::new(test_support::application(true, true)));

        assert_eq!(execution.visited, vec![NodeId::Resume]);
        let state = &execution.state;
        assert_eq!(state.status(), RunStatus::Failed);
        assert_eq!(state.error_message(), Some("document not found: r.tex"));
        assert_eq!(state.refined_resume_path(), None);
        assert_eq!(h.generator.calls(), 0);
        // First attempt plus one recovery.
        assert_eq!(h.workspace.extracts(), 2);
        assert!(h.mailer.sent().is_empty());
    }

    #[test]
    fn test_missing_source_without_retry_extracts_once() {
        test_support::init_tracing();
        let workspace = Arc::new(Workspace::new());
        let generator = Arc::new(ScriptedGenerator::new(vec![]));
        let mut config = PipelineConfig::default();
        config.recovery.retry = vec![];
        let services =
            test_support::services(workspace.clone(), generator, Arc::new(FakeMailer::new()));

        let engine = build_workflow(&config, services).unwrap();
        let execution = engine.run(WorkflowState::new(test_support::application(true, true)));

        assert_eq!(execution.visited, vec![NodeId::Resume]);
        assert_eq!(
            execution.state.error_message(),
            Some("document not found: r.tex")
        );
        assert_eq!(workspace.extracts(), 1);
    }

    #[test]
    fn test_cover_letter_failure_stops_before_dispatch() {
        let h = harness(
            Workspace::with_resume(),
            vec![test_support::latex_reply("\\section{Refined}")],
        );
        let execution = h
            .engine
            .run(WorkflowState::new(test_support::application(true, true)));

        assert_eq!(execution.visited, vec![NodeId::Resume, NodeId::CoverLetter]);
        let state = &execution.state;
        assert_eq!(state.status(), RunStatus::Failed);
        assert_eq!(
            state.error_message(),
            Some("text service error: no scripted reply")
        );
        assert_eq!(state.refined_resume_path(), Some("out/resumes/resume.pdf"));
        assert_eq!(state.cover_letter_path(), None);
        assert!(h.mailer.sent().is_empty());
    }

    #[test]
    fn test_dispatch_failure_is_terminal() {
        let h = harness(
            Workspace::with_resume(),
            vec![
                test_support::latex_reply("\\section{Refined}"),
                test_support::email_reply(),
                test_support::email_reply(),
            ],
        );
        h.mailer.fail_deliveries(2);
        let execution = h
            .engine
            .run(WorkflowState::new(test_support::application(false, true)));

        assert_eq!(execution.visited, vec![NodeId::Resume, NodeId::Dispatch]);
        assert_eq!(execution.state.status(), RunStatus::Failed);
        assert!(execution
            .state
            .error_message()
            .unwrap()
            .contains("connection refused"));
        assert_eq!(execution.state.delivered_to(), None);
    }

    #[test]
    fn test_routers_are_idempotent() {
        let mut state = WorkflowState::new(test_support::application(true, false));
        assert_eq!(route_after_resume(&state), route_after_resume(&state));
        assert_eq!(route_after_resume(&state), COVER_LETTER);

        state.fail("boom");
        assert_eq!(route_after_resume(&state), END);
        assert_eq!(route_after_cover_letter(&state), END);
        assert_eq!(route_after_cover_letter(&state), route_after_cover_letter(&state));
        assert_eq!(route_after_dispatch(&state), END);
    }

    #[test]
    fn test_diagnose_config_wires_generator() {
        test_support::init_tracing();
        let workspace = Arc::new(Workspace::new());
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok(
            "The resume path is wrong.".to_string()
        )]));
        let mut config = PipelineConfig::default();
        config.recovery.diagnose = true;
        let services =
            test_support::services(workspace, generator.clone(), Arc::new(FakeMailer::new()));

        let engine = build_workflow(&config, services).unwrap();
        let execution = engine.run(WorkflowState::new(test_support::application(false, true)));

        assert_eq!(execution.state.status(), RunStatus::Failed);
        assert_eq!(generator.calls(), 1);
        assert!(generator.prompts()[0].contains("Error kind: input"));
    }
}
