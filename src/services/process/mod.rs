mod dry_run;
mod system;
mod r#trait;

pub use self::r#trait::{create_process_control, split_command_line, ProcessControl, ProcessExit};
