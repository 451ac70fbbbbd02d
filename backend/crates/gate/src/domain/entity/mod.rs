pub mod attempt_record;
pub mod audit_event;
pub mod session;
