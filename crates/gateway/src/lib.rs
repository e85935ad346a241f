#![forbid(unsafe_code)]

pub mod auth;
pub mod contract;
pub mod error;
pub mod http;

pub use auth::AuthContext;
pub use contract::{
    FlashAnswerRequest, FlashAnswerResponse, FlashJudgement, JudgedAnswer, MarkCardResponse,
    SessionGateway, StartSessionRequest, StartedSession, TestAnswerRequest, TestAnswerResponse,
};
pub use error::ApiError;
pub use http::HttpSessionGateway;
