mod command_handler;
mod query_handler;

pub use command_handler::MessageCenterCommandHandler;
pub use query_handler::MessageCenterQueryHandler;
