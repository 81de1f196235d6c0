use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("plan has no elements")]
    Empty,

    #[error("plan element {index} breaks the activity/leg alternation")]
    NotAlternating { index: usize },

    #[error("plan ends with a leg; the last element must be an activity")]
    TrailingLeg,
}

pub type PlanResult<T> = Result<T, PlanError>;
