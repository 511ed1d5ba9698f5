use std::sync::Arc;

use lms_core::model::{
    Course, CourseId, LearnerId, Lesson, LessonId, Question, QuestionId, Quiz, QuizId,
};
use lms_core::time::fixed_clock;
use services::{
    AttemptHistoryService, DashboardAggregator, ProgressTracker, QuizSessionController,
    SessionState,
};
use storage::repository::InMemoryRepository;

fn seed_content(repo: &InMemoryRepository) {
    let lessons = (1..=4)
        .map(|n| Lesson::new(LessonId::new(n), format!("Lesson {n}"), 15).unwrap())
        .collect();
    let course = Course::new(
        CourseId::new(1),
        "Rust Basics",
        lessons,
        Some(QuizId::new(10)),
    )
    .unwrap();
    repo.insert_course(course).unwrap();

    let questions = (1..=5)
        .map(|n| {
            Question::new(
                QuestionId::new(n),
                format!("Question {n}?"),
                vec!["a".into(), "b".into(), "c".into(), "d".into()],
                1,
            )
            .unwrap()
        })
        .collect();
    let quiz = Quiz::new(
        QuizId::new(10),
        CourseId::new(1),
        "Final Exam",
        questions,
        0,
        60,
    )
    .unwrap();
    repo.insert_quiz(quiz).unwrap();
}

#[tokio::test]
async fn lessons_quiz_and_dashboard_end_to_end() {
    let repo = InMemoryRepository::new();
    seed_content(&repo);
    let learner = LearnerId::new_random();

    // Work through every lesson.
    let tracker = ProgressTracker::new(Arc::new(repo.clone()), Arc::new(repo.clone()));
    for n in 1..=4 {
        tracker
            .mark_complete(learner, CourseId::new(1), LessonId::new(n))
            .await
            .unwrap();
    }
    assert!(
        tracker
            .is_course_complete(learner, CourseId::new(1))
            .await
            .unwrap()
    );

    // First attempt: two of five correct, a fail.
    let ctrl = QuizSessionController::load(
        QuizId::new(10),
        &repo,
        learner,
        Arc::new(repo.clone()),
        fixed_clock(),
    )
    .await
    .unwrap();
    ctrl.start().await.unwrap();
    ctrl.select_answer(QuestionId::new(1), 1).await.unwrap();
    ctrl.select_answer(QuestionId::new(2), 1).await.unwrap();
    ctrl.select_answer(QuestionId::new(3), 0).await.unwrap();
    let first = ctrl.submit().await.unwrap();
    assert_eq!(first.attempt.percentage(), 40);
    assert!(!first.attempt.passed());
    assert_eq!(ctrl.state().await, SessionState::Submitted);

    // Retake in a fresh session: all correct. The first attempt is
    // untouched history.
    let retake = QuizSessionController::load(
        QuizId::new(10),
        &repo,
        learner,
        Arc::new(repo.clone()),
        fixed_clock(),
    )
    .await
    .unwrap();
    retake.start().await.unwrap();
    for n in 1..=5 {
        retake.select_answer(QuestionId::new(n), 1).await.unwrap();
    }
    let second = retake.submit().await.unwrap();
    assert_eq!(second.attempt.percentage(), 100);
    assert!(second.attempt.passed());

    let history = AttemptHistoryService::new(Arc::new(repo.clone()));
    let items = history.list_for_quiz(learner, QuizId::new(10)).await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].percentage, 100);
    assert_eq!(items[1].percentage, 40);

    let dashboard = DashboardAggregator::new(
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
    );
    let summary = dashboard.summarize(learner).await.unwrap();
    assert_eq!(summary.courses_completed, 1);
    assert_eq!(summary.courses_in_progress, 1);
    assert_eq!(summary.lessons_completed, 4);
    assert_eq!(summary.attempts_passed, 1);
    assert!((summary.average_completion_percent - 100.0).abs() < f64::EPSILON);
}
