pub mod analysis_handlers;
pub mod system_handlers;
pub mod upload_handlers;
