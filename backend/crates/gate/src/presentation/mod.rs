pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use handlers::GateAppState;
pub use router::{gate_router, gate_router_generic, gate_router_with_state};
