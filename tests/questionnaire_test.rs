//! End-to-end sessions through the service container.

mod common;

use std::sync::Arc;

use common::{quiet_settings, result, FixedSearch, ScriptedGenerator, VALID_TREE};
use procguide::application::services::{QuestionnaireService, Step, TreeSource};
use procguide::application::{ApplicationError, ErrorCode, ErrorResponse};
use procguide::infrastructure::di::ServiceContainer;
use procguide::infrastructure::external::{NoSearch, UnavailableGenerator};
use procguide::infrastructure::traits::RealFileSystem;

fn container(generator: Arc<ScriptedGenerator>, search: Arc<FixedSearch>) -> ServiceContainer {
    ServiceContainer::with_collaborators(quiet_settings(), Arc::new(RealFileSystem), generator, search)
        .unwrap()
}

fn question_key(step: &Step) -> &str {
    match step {
        Step::Question { key, .. } => key,
        Step::Final { .. } => panic!("expected a question, got {step:?}"),
    }
}

#[test]
fn given_generated_tree_when_answering_then_reaches_procedures() {
    // Arrange
    let search = Arc::new(FixedSearch::new(vec![
        result("Restaurant permit application", "https://www.mhlw.go.jp/permit"),
        result("Blog post", "https://blog.example.com/restaurant"),
    ]));
    let container = container(Arc::new(ScriptedGenerator::replying(&[VALID_TREE])), search);

    // Act
    let mut session = container.questionnaire.start("restaurant business permit").unwrap();
    let first = session.current_step();
    let second = session.answer("Corporation").unwrap();
    let last = session.answer("Yes").unwrap();

    // Assert
    assert_eq!(question_key(&first), "form");
    assert_eq!(question_key(&second), "staff");
    match last {
        Step::Final {
            procedures,
            related_procedures,
            all_procedures,
        } => {
            let ids = |l: &[procguide::domain::Procedure]| {
                l.iter().map(|p| p.procedure_id.clone()).collect::<Vec<_>>()
            };
            assert_eq!(ids(&procedures), vec!["P2", "P3"]);
            assert_eq!(ids(&related_procedures), vec!["P1"]);
            assert_eq!(all_procedures.len(), 3);
        }
        other => panic!("expected final, got {other:?}"),
    }
    assert_eq!(session.source(), &TreeSource::Generated("rich".into()));
    assert_eq!(session.sources()[0].url, "https://www.mhlw.go.jp/permit");
}

#[test]
fn given_option_not_offered_when_answering_then_invalid_answer_with_options() {
    let container = container(
        Arc::new(ScriptedGenerator::replying(&[VALID_TREE])),
        Arc::new(FixedSearch::default()),
    );
    let mut session = container.questionnaire.start("restaurant business permit").unwrap();

    let err = session.answer("Partnership").unwrap_err();

    assert_eq!(err.error_code(), ErrorCode::InvalidAnswer);
    assert_eq!(err.suggestions(), ["Sole proprietor", "Corporation"]);
    assert!(session.answers().is_empty());
}

#[test]
fn given_finished_session_when_answering_then_rejected() {
    let container = container(
        Arc::new(ScriptedGenerator::replying(&[VALID_TREE])),
        Arc::new(FixedSearch::default()),
    );
    let mut session = container.questionnaire.start("restaurant business permit").unwrap();
    assert!(session.answer("Sole proprietor").unwrap().is_final());

    let err = session.answer("Corporation").unwrap_err();

    assert_eq!(err.error_code(), ErrorCode::InvalidAnswer);
}

#[test]
fn given_no_collaborators_when_starting_then_synthetic_tree_and_placeholder_source() {
    let container = ServiceContainer::with_collaborators(
        quiet_settings(),
        Arc::new(RealFileSystem),
        Arc::new(UnavailableGenerator),
        Arc::new(NoSearch),
    )
    .unwrap();

    let mut session = container.questionnaire.start("construction business license").unwrap();

    assert_eq!(session.source(), &TreeSource::Synthetic);
    assert_eq!(session.sources().len(), 1);
    assert!(!session.all_procedures().is_empty());
    let mut step = session.current_step();
    for _ in 0..10 {
        let Step::Question { options, .. } = &step else { break };
        let choice = options[0].clone();
        step = session.answer(&choice).unwrap();
    }
    assert!(step.is_final());
}

#[test]
fn given_same_query_twice_when_starting_then_search_and_generation_cached() {
    let search = Arc::new(FixedSearch::new(vec![result("Permit", "https://a.go.jp")]));
    let generator = Arc::new(ScriptedGenerator::replying(&[VALID_TREE]));
    let container = container(generator.clone(), search.clone());

    container.questionnaire.start("restaurant business permit").unwrap();
    let searches = search.calls();
    let again = container.questionnaire.start("restaurant business permit").unwrap();

    assert!(searches >= 1);
    assert_eq!(search.calls(), searches);
    assert_eq!(generator.calls(), 1);
    assert_eq!(again.source(), &TreeSource::Cache);
}

#[test]
fn given_blank_query_when_validating_then_missing_query_response() {
    let err = QuestionnaireService::validate_query("   ").unwrap_err();

    let response = ErrorResponse::from(&err);
    let wire = serde_json::to_value(&response).unwrap();

    assert_eq!(wire["mode"], "error");
    assert_eq!(wire["errorCode"], "MISSING_QUERY");
}

#[test]
fn given_unrelated_query_when_validating_then_invalid_query_type_with_suggestions() {
    let err = QuestionnaireService::validate_query("weather tomorrow").unwrap_err();

    assert!(matches!(err, ApplicationError::InvalidRequest { .. }));
    assert_eq!(err.error_code(), ErrorCode::InvalidQueryType);
    assert!(!err.suggestions().is_empty());
}

#[test]
fn given_unknown_strategy_in_settings_when_building_then_fails() {
    let mut settings = quiet_settings();
    settings.generator.strategies = vec!["creative".into()];

    let result = ServiceContainer::with_collaborators(
        settings,
        Arc::new(RealFileSystem),
        Arc::new(UnavailableGenerator),
        Arc::new(NoSearch),
    );

    assert!(result.is_err());
}
