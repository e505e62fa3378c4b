pub mod endpoint_session;
pub mod pacer;
