pub mod boxscore_fetch;
pub mod composite;
pub mod config;
pub mod http_client;
pub mod normalize;
pub mod odds_fetch;
pub mod pipeline;
pub mod predictor;
pub mod record;
pub mod refresh;
pub mod store;
pub mod timeparse;
