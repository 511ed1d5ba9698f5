mod attempt;
mod course;
mod ids;
mod progress;
mod quiz;

pub use ids::{CourseId, LearnerId, LessonId, ParseIdError, QuestionId, QuizId};

pub use attempt::{AttemptError, QuizAttempt};
pub use course::{Course, CourseError, Lesson};
pub use progress::{CourseProgress, ProgressRecord};
pub use quiz::{DEFAULT_PASS_THRESHOLD, Question, Quiz, QuizError};
