//! One module per subcommand.

mod batch;
mod status;
mod validate;

pub use batch::cmd_batch;
pub use status::cmd_status;
pub use validate::cmd_validate;
