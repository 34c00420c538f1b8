mod error;
mod protocol;
mod routes;
mod server;
mod state;

pub use error::ApiError;
pub use protocol::{
    CreateGraphRequest, CreateGraphResponse, NodeEntry, RunGraphRequest, RunGraphResponse,
    RunStateResponse,
};
pub use server::{router, GatewayServer};
pub use state::AppState;
