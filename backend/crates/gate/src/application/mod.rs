pub mod admin;
pub mod config;
pub mod logout;
pub mod sweep;
pub mod validate_session;
pub mod verify_password;

pub use admin::{AdminGate, EmergencyLockUseCase};
pub use config::GateConfig;
pub use logout::LogoutUseCase;
pub use sweep::{SweepReport, Sweeper};
pub use validate_session::{SessionInfoOutput, ValidateSessionUseCase};
pub use verify_password::{VerifyPasswordOutput, VerifyPasswordUseCase};
