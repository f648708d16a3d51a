// Creation workflow: intake -> questionnaire -> generation -> result.
// Sessions live in memory only and are gone on restart.

pub mod handlers;
pub mod session;
pub mod store;

use thiserror::Error;
use uuid::Uuid;

use crate::workflow::session::Step;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("session {0} not found")]
    SessionNotFound(Uuid),

    #[error("CV {0} not found")]
    CvNotFound(Uuid),

    #[error("cannot {action} while the workflow is at step '{step}'")]
    WrongStep { action: &'static str, step: Step },
}
