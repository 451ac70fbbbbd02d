pub mod master_secret;
pub mod session_token;
