pub mod auth;

pub use auth::{
    context_middleware, CallerIdentity, MASQUERADE_TOKEN_HEADER, ORG_ID_HEADER, USER_ID_HEADER,
};
